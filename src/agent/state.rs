//! 会话状态与运行结果

use std::fmt;

/// 会话生命周期
///
/// `Disconnected → Connected → Servicing → Terminated`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Servicing,
    Terminated,
}

/// 服务循环异常终止的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 接收失败（连接重置、帧解码失败）
    Recv,
    /// 回复发送失败（强制终止）
    Send,
    /// 对端关闭连接
    PeerClosed,
    /// 未按 start → announce → serve 顺序调用
    InvalidState,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Recv => "recv",
            ErrorKind::Send => "send",
            ErrorKind::PeerClosed => "peer-closed",
            ErrorKind::InvalidState => "invalid-state",
        };
        f.write_str(s)
    }
}

/// `serve()` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// 收到 Quit，正常退出
    Quit,
    /// 传输层故障
    Error(ErrorKind),
}

impl RunOutcome {
    pub fn is_quit(&self) -> bool {
        matches!(self, RunOutcome::Quit)
    }
}

/// 会话计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// 已回复的心跳
    pub heartbeats: u64,
    /// 未知命令（同样回复心跳）
    pub unrecognized: u64,
    /// 跳过的空 payload
    pub noops: u64,
    /// 跳过的畸形消息
    pub decode_warnings: u64,
}
