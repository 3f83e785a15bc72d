//! pilot-agent - 模型侧 pilot agent
//!
//! 作为外部 "model" 进程连接到运行中的数据库控制端点（ZeroMQ ROUTER），
//! 上线后响应数据库的心跳 / 退出请求。
//!
//! # 核心功能
//!
//! - **ZMTP 传输**: 原生 ZMTP 3.0 DEALER socket（IPC / TCP）
//! - **控制协议**: `[空分隔帧][tag + 命令]` 两帧消息
//! - **生命周期**: `Disconnected → Connected → Servicing → Terminated`，
//!   任何退出路径都会释放连接
//!
//! # Feature Flags
//!
//! - `cli`: `pilot-agent` 二进制（命令行参数解析）
//!
//! # 示例
//!
//! ```no_run
//! use pilot_agent::{AgentConfig, DealerSocket, PilotAgent, RunOutcome};
//!
//! # async fn demo() -> Result<(), pilot_agent::ConnectError> {
//! let outcome = PilotAgent::<DealerSocket>::run(AgentConfig::default()).await?;
//! assert_eq!(outcome, RunOutcome::Quit);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod zmtp;

// Re-exports
pub use agent::{ErrorKind, PilotAgent, RunOutcome, SessionState, SessionStats};
pub use config::{AgentConfig, MODEL_IDENTITY};
pub use endpoint::Endpoint;
pub use error::{ConnectError, DecodeWarning, Error, RecvError, Result, SendError};
pub use protocol::{Command, Inbound, Message, Payload, TypeTag};
pub use transport::{DealerSocket, Transport};

/// 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
