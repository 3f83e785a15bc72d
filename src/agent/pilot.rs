//! PilotAgent：连接数据库控制端点，上线通知，然后响应心跳直到 Quit
//!
//! 单任务、请求-响应：每收到一条消息最多回复一条，再进入下一次接收。

use super::state::{ErrorKind, RunOutcome, SessionState, SessionStats};
use crate::config::AgentConfig;
use crate::endpoint::Endpoint;
use std::future::Future;

use crate::error::{ConnectError, RecvError, SendError};
use crate::protocol::{self, Command, Inbound, Message, Payload};
use crate::transport::{DealerSocket, Transport};

/// 模型侧 pilot agent
pub struct PilotAgent<T: Transport = DealerSocket> {
    config: AgentConfig,
    state: SessionState,
    transport: Option<T>,
    stats: SessionStats,
}

impl<T: Transport> PilotAgent<T> {
    /// 创建未连接的 Agent
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            state: SessionState::Disconnected,
            transport: None,
            stats: SessionStats::default(),
        }
    }

    /// 使用已建立的传输创建 Agent（处于 Connected 状态）
    pub fn with_transport(config: AgentConfig, transport: T) -> Self {
        Self {
            config,
            state: SessionState::Connected,
            transport: Some(transport),
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// 连接 endpoint 并完成握手
    ///
    /// 失败直接返回，不重试。
    pub async fn start(&mut self, endpoint: &Endpoint) -> Result<(), ConnectError> {
        if self.state != SessionState::Disconnected {
            return Err(ConnectError::AlreadyStarted);
        }

        let transport =
            T::connect(endpoint, &self.config.identity, self.config.handshake_timeout).await?;
        tracing::info!("🔌 已连接 {} (identity={})", endpoint, self.config.identity);

        self.transport = Some(transport);
        self.state = SessionState::Connected;
        Ok(())
    }

    /// 发送上线通知 `CConnected`
    pub async fn announce(&mut self) -> Result<(), SendError> {
        if self.state != SessionState::Connected {
            return Err(SendError::InvalidState("announce 只能在 start 之后调用一次"));
        }

        self.send(Payload::connected()).await?;
        tracing::debug!("📣 已发送 Connected");
        self.state = SessionState::Servicing;
        Ok(())
    }

    /// 服务循环，直到 Quit 或传输故障
    pub async fn serve(&mut self) -> RunOutcome {
        if self.state != SessionState::Servicing {
            tracing::warn!("serve() 调用时状态为 {:?}，需要先 start + announce", self.state);
            return RunOutcome::Error(ErrorKind::InvalidState);
        }

        let outcome = loop {
            if let Some(outcome) = self.step().await {
                break outcome;
            }
        };
        self.state = SessionState::Terminated;

        let stats = self.stats;
        match outcome {
            RunOutcome::Quit => tracing::info!(
                "👋 收到 Quit，服务结束: heartbeats={}, unrecognized={}, noops={}, warnings={}",
                stats.heartbeats,
                stats.unrecognized,
                stats.noops,
                stats.decode_warnings
            ),
            RunOutcome::Error(kind) => tracing::warn!(
                "服务循环异常终止 ({}): heartbeats={}",
                kind,
                stats.heartbeats
            ),
        }
        outcome
    }

    /// 接收一条消息并回复；返回 Some 表示终止
    async fn step(&mut self) -> Option<RunOutcome> {
        let Some(transport) = self.transport.as_mut() else {
            return Some(RunOutcome::Error(ErrorKind::InvalidState));
        };

        let frames = match transport.recv().await {
            Ok(Some(frames)) => frames,
            Ok(None) => {
                tracing::warn!("对端关闭连接");
                return Some(RunOutcome::Error(ErrorKind::PeerClosed));
            }
            Err(RecvError::Discarded(warning)) => {
                self.stats.decode_warnings += 1;
                tracing::warn!("忽略畸形消息: {}", warning);
                return None;
            }
            Err(e) => {
                tracing::error!("接收失败，终止服务循环: {}", e);
                return Some(RunOutcome::Error(ErrorKind::Recv));
            }
        };

        let payload = match protocol::decode_frames(&frames) {
            Ok(Inbound::Command(payload)) => payload,
            Ok(Inbound::NoOp) => {
                self.stats.noops += 1;
                tracing::trace!("空 payload，跳过");
                return None;
            }
            Err(warning) => {
                self.stats.decode_warnings += 1;
                tracing::warn!("忽略畸形消息: {}", warning);
                return None;
            }
        };

        match payload.command {
            Command::Quit => {
                tracing::info!("收到 Quit，发送确认");
                if let Err(e) = self.send(Payload::quit_ack()).await {
                    tracing::error!("Quit 确认发送失败: {}", e);
                }
                Some(RunOutcome::Quit)
            }
            command => {
                if command != Command::Heartbeat {
                    self.stats.unrecognized += 1;
                    tracing::warn!(
                        "意外命令 {:?} (tag={:?})，按心跳回复",
                        command.as_str(),
                        payload.tag
                    );
                }

                match self.send(Payload::heartbeat()).await {
                    Ok(()) => {
                        self.stats.heartbeats += 1;
                        None
                    }
                    Err(e) => {
                        tracing::error!("心跳回复发送失败，强制终止: {}", e);
                        Some(RunOutcome::Error(ErrorKind::Send))
                    }
                }
            }
        }
    }

    async fn send(&mut self, payload: Payload) -> Result<(), SendError> {
        let transport = self.transport.as_mut().ok_or(SendError::Closed)?;
        transport.send(Message::new(payload).into_frames()).await
    }

    /// 释放连接
    ///
    /// 可在任何退出路径上调用；重复调用是 no-op，关闭时的错误只记录不返回。
    pub async fn shutdown(&mut self) {
        match self.transport.take() {
            Some(mut transport) => {
                if let Err(e) = transport.close().await {
                    tracing::debug!("关闭连接出错（忽略）: {}", e);
                }
                tracing::info!("🧹 连接已释放");
            }
            None => tracing::debug!("shutdown: 没有需要释放的连接"),
        }
        self.state = SessionState::Terminated;
    }

    /// announce → serve → shutdown
    ///
    /// 无论哪条路径退出都会执行一次 shutdown。
    pub async fn run_session(mut self) -> RunOutcome {
        let outcome = match self.announce().await {
            Ok(()) => self.serve().await,
            Err(e) => {
                tracing::error!("上线通知发送失败: {}", e);
                RunOutcome::Error(ErrorKind::Send)
            }
        };
        self.shutdown().await;
        outcome
    }

    /// announce → serve（可被 `cancel` 打断）→ shutdown
    ///
    /// `cancel` 先完成时返回 None，不发送 Quit 确认。
    pub async fn run_session_until<F>(mut self, cancel: F) -> Option<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        let outcome = match self.announce().await {
            Ok(()) => tokio::select! {
                outcome = self.serve() => Some(outcome),
                _ = cancel => {
                    tracing::info!("收到终止信号，准备退出...");
                    None
                }
            },
            Err(e) => {
                tracing::error!("上线通知发送失败: {}", e);
                Some(RunOutcome::Error(ErrorKind::Send))
            }
        };
        self.shutdown().await;
        outcome
    }

    /// start → announce → serve → shutdown
    pub async fn run(config: AgentConfig) -> Result<RunOutcome, ConnectError> {
        let endpoint = config.endpoint.clone();
        let mut agent = Self::new(config);
        agent.start(&endpoint).await?;
        Ok(agent.run_session().await)
    }
}

impl<T: Transport> Drop for PilotAgent<T> {
    fn drop(&mut self) {
        if self.transport.is_some() {
            tracing::warn!("PilotAgent 未调用 shutdown() 即被释放");
        }
    }
}
