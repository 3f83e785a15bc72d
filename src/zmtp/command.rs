//! ZMTP 命令帧 body
//!
//! body 格式：`<name-size: u8><name><data>`
//!
//! READY 的 data 是一组属性：`<name-size: u8><name><value-size: u32 BE><value>`

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FrameError;

pub const READY: &str = "READY";
pub const ERROR: &str = "ERROR";
pub const PING: &str = "PING";
pub const PONG: &str = "PONG";

/// READY 属性名
pub const SOCKET_TYPE: &str = "Socket-Type";
pub const IDENTITY: &str = "Identity";

/// PING context 上限（ZMTP 3.1）
const MAX_PING_CONTEXT: usize = 16;

/// READY 携带的元数据，属性名大小写不敏感
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    properties: Vec<(String, Bytes)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Bytes>) -> Self {
        self.properties.push((name.to_string(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Bytes> {
        self.properties
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// 以字符串读取属性
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| String::from_utf8_lossy(v).into_owned())
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        for (name, value) in &self.properties {
            buf.put_u8(name.len() as u8);
            buf.put_slice(name.as_bytes());
            buf.put_u32(value.len() as u32);
            buf.put_slice(value);
        }
    }

    fn decode(mut data: Bytes) -> Result<Self, FrameError> {
        let mut properties = Vec::new();
        while data.has_remaining() {
            let name = take_short_string(&mut data, "属性名")?;
            if data.remaining() < 4 {
                return Err(FrameError::MalformedCommand(format!("属性 {} 缺少长度", name)));
            }
            let len = data.get_u32() as usize;
            if data.remaining() < len {
                return Err(FrameError::MalformedCommand(format!("属性 {} 长度越界", name)));
            }
            properties.push((name, data.split_to(len)));
        }
        Ok(Self { properties })
    }
}

/// 已解析的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZmtpCommand {
    Ready(Metadata),
    Error(String),
    Ping { ttl: u16, context: Bytes },
    Pong { context: Bytes },
    Unknown { name: String, data: Bytes },
}

impl ZmtpCommand {
    pub fn name(&self) -> &str {
        match self {
            ZmtpCommand::Ready(_) => READY,
            ZmtpCommand::Error(_) => ERROR,
            ZmtpCommand::Ping { .. } => PING,
            ZmtpCommand::Pong { .. } => PONG,
            ZmtpCommand::Unknown { name, .. } => name,
        }
    }

    pub fn encode(&self) -> Bytes {
        let name = self.name();
        let mut buf = BytesMut::new();
        buf.put_u8(name.len() as u8);
        buf.put_slice(name.as_bytes());
        match self {
            ZmtpCommand::Ready(metadata) => metadata.encode_into(&mut buf),
            ZmtpCommand::Error(reason) => {
                let reason = &reason.as_bytes()[..reason.len().min(u8::MAX as usize)];
                buf.put_u8(reason.len() as u8);
                buf.put_slice(reason);
            }
            ZmtpCommand::Ping { ttl, context } => {
                buf.put_u16(*ttl);
                buf.put_slice(context);
            }
            ZmtpCommand::Pong { context } => buf.put_slice(context),
            ZmtpCommand::Unknown { data, .. } => buf.put_slice(data),
        }
        buf.freeze()
    }

    pub fn decode(mut body: Bytes) -> Result<Self, FrameError> {
        let name = take_short_string(&mut body, "命令名")?;
        match name.as_str() {
            READY => Ok(ZmtpCommand::Ready(Metadata::decode(body)?)),
            ERROR => {
                let reason = take_short_string(&mut body, "ERROR reason")?;
                Ok(ZmtpCommand::Error(reason))
            }
            PING => {
                if body.remaining() < 2 {
                    return Err(FrameError::MalformedCommand("PING 缺少 TTL".to_string()));
                }
                let ttl = body.get_u16();
                let context = body.split_to(body.len().min(MAX_PING_CONTEXT));
                Ok(ZmtpCommand::Ping { ttl, context })
            }
            PONG => Ok(ZmtpCommand::Pong { context: body }),
            _ => Ok(ZmtpCommand::Unknown { name, data: body }),
        }
    }
}

fn take_short_string(data: &mut Bytes, what: &str) -> Result<String, FrameError> {
    if !data.has_remaining() {
        return Err(FrameError::MalformedCommand(format!("{} 缺失", what)));
    }
    let len = data.get_u8() as usize;
    if data.remaining() < len {
        return Err(FrameError::MalformedCommand(format!("{} 长度越界", what)));
    }
    Ok(String::from_utf8_lossy(&data.split_to(len)).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_wire_format() {
        let ready = ZmtpCommand::Ready(
            Metadata::new()
                .with(SOCKET_TYPE, "DEALER")
                .with(IDENTITY, "model"),
        );
        let body = ready.encode();

        let mut expected = Vec::new();
        expected.extend_from_slice(b"\x05READY");
        expected.extend_from_slice(b"\x0bSocket-Type\x00\x00\x00\x06DEALER");
        expected.extend_from_slice(b"\x08Identity\x00\x00\x00\x05model");
        assert_eq!(&body[..], &expected[..]);

        match ZmtpCommand::decode(body).unwrap() {
            ZmtpCommand::Ready(metadata) => {
                // 属性名大小写不敏感
                assert_eq!(metadata.get_str("socket-type").as_deref(), Some("DEALER"));
                assert_eq!(metadata.get_str(IDENTITY).as_deref(), Some("model"));
            }
            other => panic!("Expected READY, got {:?}", other),
        }
    }

    #[test]
    fn test_error_command() {
        let body = ZmtpCommand::Error("Invalid socket type".to_string()).encode();
        assert_eq!(
            ZmtpCommand::decode(body).unwrap(),
            ZmtpCommand::Error("Invalid socket type".to_string())
        );
    }

    #[test]
    fn test_ping_context() {
        let body = Bytes::from_static(b"\x04PING\x00\x0aabc");
        assert_eq!(
            ZmtpCommand::decode(body).unwrap(),
            ZmtpCommand::Ping {
                ttl: 10,
                context: Bytes::from_static(b"abc"),
            }
        );
    }

    #[test]
    fn test_truncated_property() {
        let body = Bytes::from_static(b"\x05READY\x0bSocket-Type\x00\x00\x00\x09DEA");
        assert!(matches!(
            ZmtpCommand::decode(body),
            Err(FrameError::MalformedCommand(_))
        ));
    }

    #[test]
    fn test_unknown_command_passthrough() {
        let body = Bytes::from_static(b"\x09SUBSCRIBEtopic");
        match ZmtpCommand::decode(body).unwrap() {
            ZmtpCommand::Unknown { name, data } => {
                assert_eq!(name, "SUBSCRIBE");
                assert_eq!(&data[..], b"topic");
            }
            other => panic!("Expected Unknown, got {:?}", other),
        }
    }
}
