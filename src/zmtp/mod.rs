//! ZMTP 3.0 线协议（NULL 安全机制）
//!
//! 数据库端是 ZeroMQ ROUTER socket，这里实现 DEALER 一侧需要的部分：
//! greeting、READY 握手、帧编解码、PING/PONG。

mod codec;
mod command;
mod greeting;

pub use codec::{flags, ZmtpCodec, ZmtpFrame, MAX_FRAME_SIZE};
pub use command::{Metadata, ZmtpCommand, IDENTITY, SOCKET_TYPE};
pub use greeting::{Greeting, GREETING_LEN, NULL_MECHANISM};

/// 本端 socket 类型
pub const DEALER: &str = "DEALER";

/// DEALER 可以对接的对端 socket 类型
pub const DEALER_PEERS: &[&str] = &["ROUTER", "DEALER", "REP"];

/// 对端 socket 类型是否能与 DEALER 通信
pub fn is_dealer_peer(socket_type: &str) -> bool {
    DEALER_PEERS.contains(&socket_type)
}
