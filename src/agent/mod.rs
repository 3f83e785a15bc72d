//! Agent 模块 - 模型侧 pilot agent
//!
//! Agent 负责：
//! - 连接数据库控制端点（身份 `model`）
//! - 发送上线通知 `CConnected`
//! - 回复心跳 `PHeartbeat`，收到 `Quit` 时确认并退出
//! - 在所有退出路径上释放连接

mod pilot;
mod state;

pub use pilot::PilotAgent;
pub use state::{ErrorKind, RunOutcome, SessionState, SessionStats};
