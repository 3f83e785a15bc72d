//! ZMTP DEALER socket
//!
//! 连接流程：
//! 1. 建立 Unix Socket / TCP 连接
//! 2. 交换 64 字节 greeting（NULL 机制）
//! 3. 发送 READY（Socket-Type=DEALER, Identity=<identity>），读取对端 READY
//! 4. 之后按多帧消息收发，PING 自动回复 PONG

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio_util::codec::Framed;

use super::{Transport, WireMessage};
use crate::endpoint::Endpoint;
use crate::error::{ConnectError, DecodeWarning, FrameError, RecvError, SendError};
use crate::zmtp::{
    self, Greeting, Metadata, ZmtpCodec, ZmtpCommand, ZmtpFrame, DEALER, GREETING_LEN, IDENTITY,
    SOCKET_TYPE,
};

/// 单条消息最多缓存的帧数（空分隔帧 + payload）
pub const MAX_MESSAGE_FRAMES: usize = 2;

/// 可作为 DEALER 底层连接的字节流
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> AsyncStream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// 已完成握手的 DEALER 连接
pub struct DealerSocket {
    framed: Framed<Box<dyn AsyncStream>, ZmtpCodec>,
    peer_socket_type: String,
    /// 尚未收齐的多帧消息
    pending: WireMessage,
    /// 超限消息正在被丢弃时，已丢弃的帧数
    discarding: Option<usize>,
}

impl DealerSocket {
    /// 在已建立的字节流上完成 ZMTP 握手
    pub async fn handshake<S>(mut stream: S, identity: &str) -> Result<Self, ConnectError>
    where
        S: AsyncStream + 'static,
    {
        stream
            .write_all(&Greeting::null(false).encode())
            .await
            .map_err(handshake_io)?;

        let mut buf = [0u8; GREETING_LEN];
        stream.read_exact(&mut buf).await.map_err(handshake_io)?;
        let peer = Greeting::decode(&buf)?;
        tracing::debug!("ZMTP greeting 完成: peer={}.{}", peer.major, peer.minor);

        let stream: Box<dyn AsyncStream> = Box::new(stream);
        let mut framed = Framed::new(stream, ZmtpCodec::new());

        let ready = ZmtpCommand::Ready(
            Metadata::new()
                .with(SOCKET_TYPE, DEALER)
                .with(IDENTITY, identity.to_string()),
        );
        framed
            .send(ZmtpFrame::Command(ready.encode()))
            .await
            .map_err(|e| ConnectError::Handshake(format!("发送 READY 失败: {}", e)))?;

        let peer_socket_type = match framed.next().await {
            Some(Ok(ZmtpFrame::Command(body))) => {
                match ZmtpCommand::decode(body).map_err(|e| ConnectError::Handshake(e.to_string()))? {
                    ZmtpCommand::Ready(metadata) => metadata.get_str(SOCKET_TYPE).ok_or_else(|| {
                        ConnectError::Handshake("READY 缺少 Socket-Type".to_string())
                    })?,
                    ZmtpCommand::Error(reason) => return Err(ConnectError::Rejected(reason)),
                    other => {
                        return Err(ConnectError::Handshake(format!(
                            "期望 READY，收到 {}",
                            other.name()
                        )))
                    }
                }
            }
            Some(Ok(ZmtpFrame::Message { .. })) => {
                return Err(ConnectError::Handshake("握手完成前收到消息帧".to_string()))
            }
            Some(Err(e)) => return Err(ConnectError::Handshake(e.to_string())),
            None => return Err(ConnectError::Handshake("对端在握手阶段关闭连接".to_string())),
        };

        if !zmtp::is_dealer_peer(&peer_socket_type) {
            let reason = format!("socket 类型不兼容: {} <-> {}", DEALER, peer_socket_type);
            let _ = framed
                .send(ZmtpFrame::Command(ZmtpCommand::Error(reason.clone()).encode()))
                .await;
            return Err(ConnectError::Handshake(reason));
        }

        Ok(Self {
            framed,
            peer_socket_type,
            pending: Vec::new(),
            discarding: None,
        })
    }

    /// 对端 socket 类型（READY 中声明）
    pub fn peer_socket_type(&self) -> &str {
        &self.peer_socket_type
    }

    async fn open(endpoint: &Endpoint, identity: &str) -> Result<Self, ConnectError> {
        let unreachable = |source: io::Error| ConnectError::Unreachable {
            endpoint: endpoint.to_string(),
            source,
        };

        match endpoint {
            #[cfg(unix)]
            Endpoint::Ipc(path) => {
                let stream = UnixStream::connect(path).await.map_err(unreachable)?;
                Self::handshake(stream, identity).await
            }
            #[cfg(not(unix))]
            Endpoint::Ipc(_) => Err(ConnectError::UnsupportedEndpoint(endpoint.to_string())),
            Endpoint::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(unreachable)?;
                stream.set_nodelay(true).map_err(unreachable)?;
                Self::handshake(stream, identity).await
            }
            Endpoint::Other(raw) => Err(ConnectError::UnsupportedEndpoint(raw.clone())),
        }
    }

    async fn handle_command(&mut self, body: Bytes) -> Result<(), RecvError> {
        match ZmtpCommand::decode(body)? {
            ZmtpCommand::Ping { context, .. } => {
                tracing::trace!("ZMTP PING -> PONG");
                self.framed
                    .send(ZmtpFrame::Command(ZmtpCommand::Pong { context }.encode()))
                    .await?;
            }
            other => tracing::debug!("忽略 ZMTP 命令: {}", other.name()),
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for DealerSocket {
    async fn connect(
        endpoint: &Endpoint,
        identity: &str,
        timeout: Duration,
    ) -> Result<Self, ConnectError> {
        tokio::time::timeout(timeout, Self::open(endpoint, identity))
            .await
            .map_err(|_| ConnectError::Timeout(timeout))?
    }

    async fn send(&mut self, frames: WireMessage) -> Result<(), SendError> {
        let last = frames.len().saturating_sub(1);
        for (i, body) in frames.into_iter().enumerate() {
            let frame = if i < last {
                ZmtpFrame::more(body)
            } else {
                ZmtpFrame::last(body)
            };
            self.framed.feed(frame).await?;
        }
        self.framed.flush().await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<WireMessage>, RecvError> {
        loop {
            let frame = match self.framed.next().await {
                Some(frame) => frame?,
                None => {
                    if !self.pending.is_empty() {
                        tracing::warn!("连接关闭，丢弃不完整消息 ({} 帧)", self.pending.len());
                        self.pending.clear();
                    }
                    self.discarding = None;
                    return Ok(None);
                }
            };

            match frame {
                ZmtpFrame::Message { body, more } => {
                    if let Some(dropped) = self.discarding.as_mut() {
                        *dropped += 1;
                        if !more {
                            let dropped = *dropped;
                            self.discarding = None;
                            return Err(RecvError::Discarded(DecodeWarning::TooManyFrames(dropped)));
                        }
                        continue;
                    }

                    self.pending.push(body);
                    if !more {
                        return Ok(Some(std::mem::take(&mut self.pending)));
                    }
                    if self.pending.len() >= MAX_MESSAGE_FRAMES {
                        // 后续帧只计数不缓存，直到消息结束
                        self.discarding = Some(self.pending.len());
                        self.pending.clear();
                    }
                }
                ZmtpFrame::Command(body) => self.handle_command(body).await?,
            }
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        self.framed.close().await.map_err(|e| match e {
            FrameError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::Other, other),
        })
    }
}

fn handshake_io(e: io::Error) -> ConnectError {
    ConnectError::Handshake(format!("IO 错误: {}", e))
}
