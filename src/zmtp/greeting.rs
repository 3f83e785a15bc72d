//! ZMTP 3.0 greeting（固定 64 字节）
//!
//! ```text
//! signature  : FF 00 00 00 00 00 00 00 00 7F   (10 字节)
//! version    : major minor                     (2 字节)
//! mechanism  : "NULL" + 补零                   (20 字节)
//! as-server  : 0 / 1                           (1 字节)
//! filler     : 31 字节 0
//! ```

use crate::error::ConnectError;

pub const GREETING_LEN: usize = 64;
pub const MECHANISM_LEN: usize = 20;
pub const NULL_MECHANISM: &str = "NULL";

const VERSION_MAJOR: u8 = 3;
const VERSION_MINOR: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub major: u8,
    pub minor: u8,
    pub mechanism: String,
    pub as_server: bool,
}

impl Greeting {
    /// NULL 安全机制的 greeting
    pub fn null(as_server: bool) -> Self {
        Self {
            major: VERSION_MAJOR,
            minor: VERSION_MINOR,
            mechanism: NULL_MECHANISM.to_string(),
            as_server,
        }
    }

    pub fn encode(&self) -> [u8; GREETING_LEN] {
        let mut buf = [0u8; GREETING_LEN];
        buf[0] = 0xFF;
        buf[9] = 0x7F;
        buf[10] = self.major;
        buf[11] = self.minor;
        let mechanism = self.mechanism.as_bytes();
        let len = mechanism.len().min(MECHANISM_LEN);
        buf[12..12 + len].copy_from_slice(&mechanism[..len]);
        buf[32] = u8::from(self.as_server);
        buf
    }

    /// 解析并校验对端 greeting
    pub fn decode(buf: &[u8; GREETING_LEN]) -> Result<Self, ConnectError> {
        if buf[0] != 0xFF || buf[9] != 0x7F {
            return Err(ConnectError::Handshake("对端不是 ZMTP socket (signature 不匹配)".to_string()));
        }

        let major = buf[10];
        if major < VERSION_MAJOR {
            return Err(ConnectError::Handshake(format!("不支持的 ZMTP 版本: {}.{}", major, buf[11])));
        }

        let mechanism = String::from_utf8_lossy(&buf[12..12 + MECHANISM_LEN])
            .trim_end_matches('\0')
            .to_string();
        if mechanism != NULL_MECHANISM {
            return Err(ConnectError::Handshake(format!("不支持的安全机制: {:?}", mechanism)));
        }

        Ok(Self {
            major,
            minor: buf[11],
            mechanism,
            as_server: buf[32] == 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_layout() {
        let buf = Greeting::null(false).encode();
        assert_eq!(buf.len(), 64);
        assert_eq!(buf[0], 0xFF);
        assert_eq!(&buf[1..9], &[0u8; 8]);
        assert_eq!(buf[9], 0x7F);
        assert_eq!(&buf[10..12], &[3, 0]);
        assert_eq!(&buf[12..16], b"NULL");
        assert_eq!(buf[32], 0);
        assert!(buf[33..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_decode_peer_greeting() {
        // libzmq 4.x 发送 3.1
        let mut buf = Greeting::null(true).encode();
        buf[11] = 1;
        let greeting = Greeting::decode(&buf).unwrap();
        assert_eq!(greeting.major, 3);
        assert_eq!(greeting.minor, 1);
        assert!(greeting.as_server);
    }

    #[test]
    fn test_decode_rejects_bad_signature() {
        let mut buf = Greeting::null(false).encode();
        buf[9] = 0;
        assert!(matches!(Greeting::decode(&buf), Err(ConnectError::Handshake(_))));
    }

    #[test]
    fn test_decode_rejects_old_version() {
        let mut buf = Greeting::null(false).encode();
        buf[10] = 2;
        assert!(matches!(Greeting::decode(&buf), Err(ConnectError::Handshake(_))));
    }

    #[test]
    fn test_decode_rejects_curve() {
        let mut greeting = Greeting::null(false);
        greeting.mechanism = "CURVE".to_string();
        let buf = greeting.encode();
        assert!(matches!(Greeting::decode(&buf), Err(ConnectError::Handshake(_))));
    }
}
