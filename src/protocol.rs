//! 控制协议定义
//!
//! 通信方式：ZMTP DEALER socket，每条消息两帧：
//!
//! ```text
//! [ 空分隔帧 ][ payload: <type tag: 1 字节><ASCII 命令> ]
//! ```
//!
//! 例如数据库发来 `["", "CHeartbeat"]`，Agent 回复 `["", "PHeartbeat"]`。

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::DecodeWarning;

/// payload 第一个字节：消息类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// `C`：控制 / 上线通知
    Control,
    /// `P`：ping 类（心跳或 Quit 确认）
    Ping,
    /// 预留的其他 tag（原样保留）
    Reserved(u8),
}

impl TypeTag {
    pub fn as_byte(self) -> u8 {
        match self {
            TypeTag::Control => b'C',
            TypeTag::Ping => b'P',
            TypeTag::Reserved(b) => b,
        }
    }
}

impl From<u8> for TypeTag {
    fn from(b: u8) -> Self {
        match b {
            b'C' => TypeTag::Control,
            b'P' => TypeTag::Ping,
            other => TypeTag::Reserved(other),
        }
    }
}

/// 命令字符串
///
/// 未知命令保存在 `Other` 中，协议是宽松的：未知命令按心跳处理。
/// `Other` 只保存非已知命令的字符串；经 [`Payload::new`] 构造时会被规范化。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    Connected,
    Heartbeat,
    Quit,
    Other(String),
}

/// 已知命令字符串常量
pub mod command {
    pub const CONNECTED: &str = "Connected";
    pub const HEARTBEAT: &str = "Heartbeat";
    pub const QUIT: &str = "Quit";
}

impl Command {
    /// 解析命令（大小写敏感的精确匹配）
    pub fn parse(s: &str) -> Self {
        match s {
            command::CONNECTED => Command::Connected,
            command::HEARTBEAT => Command::Heartbeat,
            command::QUIT => Command::Quit,
            other => Command::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Command::Connected => command::CONNECTED,
            Command::Heartbeat => command::HEARTBEAT,
            Command::Quit => command::QUIT,
            Command::Other(s) => s,
        }
    }
}

/// payload 帧：tag + 命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub tag: TypeTag,
    pub command: Command,
}

impl Payload {
    /// 创建 payload；`Other("Heartbeat")` 之类会规范化为对应的已知命令
    pub fn new(tag: TypeTag, command: Command) -> Self {
        let command = match command {
            Command::Other(s) => Command::parse(&s),
            known => known,
        };
        Self { tag, command }
    }

    /// Agent 上线通知 `CConnected`
    pub fn connected() -> Self {
        Self::new(TypeTag::Control, Command::Connected)
    }

    /// 心跳回复 `PHeartbeat`
    pub fn heartbeat() -> Self {
        Self::new(TypeTag::Ping, Command::Heartbeat)
    }

    /// Quit 确认 `PQuit`
    pub fn quit_ack() -> Self {
        Self::new(TypeTag::Ping, Command::Quit)
    }

    /// 编码为 payload 帧
    pub fn encode(&self) -> Bytes {
        let cmd = self.command.as_str();
        let mut buf = BytesMut::with_capacity(1 + cmd.len());
        buf.put_u8(self.tag.as_byte());
        buf.put_slice(cmd.as_bytes());
        buf.freeze()
    }

    /// 解码 payload 帧
    ///
    /// 空 payload 或只有 tag 没有命令时返回 `None`（no-op）。
    /// 非 UTF-8 字节按 lossy 方式解码，作为未知命令处理。
    pub fn decode(raw: &[u8]) -> Option<Self> {
        let (&tag, rest) = raw.split_first()?;
        if rest.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(rest);
        Some(Self::new(TypeTag::from(tag), Command::parse(&text)))
    }
}

/// 一条线上消息：`[空分隔帧, payload 帧]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub payload: Payload,
}

impl Message {
    pub fn new(payload: Payload) -> Self {
        Self { payload }
    }

    /// 编码为帧序列
    pub fn into_frames(self) -> Vec<Bytes> {
        vec![Bytes::new(), self.payload.encode()]
    }
}

/// 收到的消息解码结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// 空 payload：keep-alive，跳过
    NoOp,
    /// 命令
    Command(Payload),
}

/// 解码收到的帧序列
pub fn decode_frames(frames: &[Bytes]) -> Result<Inbound, DecodeWarning> {
    let (delimiter, rest) = frames.split_first().ok_or(DecodeWarning::Empty)?;
    if !delimiter.is_empty() {
        return Err(DecodeWarning::MissingDelimiter);
    }
    match rest {
        [payload] => Ok(Payload::decode(payload).map_or(Inbound::NoOp, Inbound::Command)),
        other => Err(DecodeWarning::UnexpectedFrames(other.len())),
    }
}
