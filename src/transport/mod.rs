//! 传输层
//!
//! Agent 只依赖 [`Transport`]：多帧消息的发送 / 接收 / 关闭。
//! 生产环境使用 [`DealerSocket`]，测试中可替换为脚本化的实现。

mod dealer;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::endpoint::Endpoint;
use crate::error::{ConnectError, RecvError, SendError};

pub use dealer::{AsyncStream, DealerSocket};

/// 一条线上消息（多帧）
pub type WireMessage = Vec<Bytes>;

/// 面向消息的传输
#[async_trait]
pub trait Transport: Send {
    /// 连接对端并完成握手，不做重试
    async fn connect(
        endpoint: &Endpoint,
        identity: &str,
        timeout: Duration,
    ) -> Result<Self, ConnectError>
    where
        Self: Sized;

    /// 原子地发送一条多帧消息
    async fn send(&mut self, frames: WireMessage) -> Result<(), SendError>;

    /// 接收下一条完整消息；`Ok(None)` 表示对端已关闭连接
    async fn recv(&mut self) -> Result<Option<WireMessage>, RecvError>;

    /// 关闭连接
    async fn close(&mut self) -> std::io::Result<()>;
}
