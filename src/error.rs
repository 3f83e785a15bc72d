//! 错误类型定义

use std::time::Duration;

use thiserror::Error;

/// 启动阶段连接错误（致命，不重试）
#[derive(Error, Debug)]
pub enum ConnectError {
    /// 不支持的传输方式（例如 inproc://）
    #[error("不支持的 endpoint: {0}")]
    UnsupportedEndpoint(String),

    /// 无法连接（对端不存在 / 拒绝）
    #[error("连接 {endpoint} 失败: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// ZMTP 握手失败
    #[error("ZMTP 握手失败: {0}")]
    Handshake(String),

    /// 对端在握手阶段发送 ERROR 命令
    #[error("对端拒绝连接: {0}")]
    Rejected(String),

    /// 握手超时
    #[error("握手超时 ({0:?})")]
    Timeout(Duration),

    /// Agent 状态不允许 start
    #[error("Agent 已启动")]
    AlreadyStarted,
}

/// 发送错误
#[derive(Error, Debug)]
pub enum SendError {
    /// 底层 IO 错误
    #[error("发送失败: {0}")]
    Io(#[from] std::io::Error),

    /// 帧编码 / 写出失败
    #[error("发送失败: {0}")]
    Frame(#[from] FrameError),

    /// 连接已经释放
    #[error("连接已关闭")]
    Closed,

    /// 当前状态不允许发送
    #[error("当前状态不允许发送: {0}")]
    InvalidState(&'static str),
}

/// 接收错误（传输层故障，终止服务循环）
#[derive(Error, Debug)]
pub enum RecvError {
    /// 底层 IO 错误（连接重置等）
    #[error("接收失败: {0}")]
    Io(#[from] std::io::Error),

    /// ZMTP 帧无法解析
    #[error("帧解码失败: {0}")]
    Frame(#[from] FrameError),

    /// 畸形消息已在传输层丢弃（不终止循环）
    #[error("丢弃畸形消息: {0}")]
    Discarded(DecodeWarning),
}

/// ZMTP 帧级错误
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("未知的帧标志位: {0:#04x}")]
    InvalidFlags(u8),

    #[error("帧过大: {size} 字节 (上限 {max})")]
    TooLarge { size: u64, max: usize },

    #[error("命令格式错误: {0}")]
    MalformedCommand(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 消息解码告警（跳过并记录，不终止循环）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    /// 空消息（没有任何帧）
    #[error("收到空消息")]
    Empty,

    /// 第一帧不是空分隔帧
    #[error("缺少分隔帧")]
    MissingDelimiter,

    /// 分隔帧之后的帧数不是 1
    #[error("分隔帧后应为 1 个 payload 帧，实际 {0} 个")]
    UnexpectedFrames(usize),

    /// 帧数超过上限，整条消息被丢弃
    #[error("消息帧数超过上限，已丢弃 {0} 帧")]
    TooManyFrames(usize),
}

/// Endpoint 解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("endpoint 为空")]
    Empty,

    #[error("无效的 TCP 地址: {0}")]
    InvalidTcp(String),
}

/// 库错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, Error>;
