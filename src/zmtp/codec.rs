//! ZMTP 帧编解码
//!
//! ```text
//! +-------+----------------------------+---------+
//! | flags | size (1 字节 / 8 字节 BE)  | body    |
//! +-------+----------------------------+---------+
//! ```
//!
//! flags: bit0 = MORE, bit1 = LONG, bit2 = COMMAND，其余位必须为 0。

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FrameError;

/// 单帧上限 16 MiB
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

pub mod flags {
    pub const MORE: u8 = 0x01;
    pub const LONG: u8 = 0x02;
    pub const COMMAND: u8 = 0x04;
    pub const ALL: u8 = MORE | LONG | COMMAND;
}

/// 线上的一帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZmtpFrame {
    /// 消息帧；`more` 表示后面还有同一条消息的帧
    Message { body: Bytes, more: bool },
    /// 命令帧（READY / PING / ERROR …）
    Command(Bytes),
}

impl ZmtpFrame {
    pub fn last(body: Bytes) -> Self {
        ZmtpFrame::Message { body, more: false }
    }

    pub fn more(body: Bytes) -> Self {
        ZmtpFrame::Message { body, more: true }
    }
}

#[derive(Debug, Clone)]
pub struct ZmtpCodec {
    max_frame_size: usize,
}

impl ZmtpCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for ZmtpCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ZmtpCodec {
    type Item = ZmtpFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ZmtpFrame>, FrameError> {
        let Some(&flag_byte) = src.first() else {
            return Ok(None);
        };
        if flag_byte & !flags::ALL != 0 {
            return Err(FrameError::InvalidFlags(flag_byte));
        }

        let long = flag_byte & flags::LONG != 0;
        let header_len = if long { 9 } else { 2 };
        if src.len() < header_len {
            return Ok(None);
        }

        let size = if long {
            let mut header = &src[1..9];
            header.get_u64()
        } else {
            u64::from(src[1])
        };
        if size > self.max_frame_size as u64 {
            return Err(FrameError::TooLarge {
                size,
                max: self.max_frame_size,
            });
        }

        let size = size as usize;
        if src.len() < header_len + size {
            src.reserve(header_len + size - src.len());
            return Ok(None);
        }

        src.advance(header_len);
        let body = src.split_to(size).freeze();

        if flag_byte & flags::COMMAND != 0 {
            if flag_byte & flags::MORE != 0 {
                return Err(FrameError::MalformedCommand("命令帧不能带 MORE 标志".to_string()));
            }
            return Ok(Some(ZmtpFrame::Command(body)));
        }

        Ok(Some(ZmtpFrame::Message {
            body,
            more: flag_byte & flags::MORE != 0,
        }))
    }
}

impl Encoder<ZmtpFrame> for ZmtpCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: ZmtpFrame, dst: &mut BytesMut) -> Result<(), FrameError> {
        let (mut flag_byte, body) = match frame {
            ZmtpFrame::Message { body, more } => (if more { flags::MORE } else { 0 }, body),
            ZmtpFrame::Command(body) => (flags::COMMAND, body),
        };

        if body.len() > self.max_frame_size {
            return Err(FrameError::TooLarge {
                size: body.len() as u64,
                max: self.max_frame_size,
            });
        }

        if body.len() > u8::MAX as usize {
            flag_byte |= flags::LONG;
            dst.reserve(9 + body.len());
            dst.put_u8(flag_byte);
            dst.put_u64(body.len() as u64);
        } else {
            dst.reserve(2 + body.len());
            dst.put_u8(flag_byte);
            dst.put_u8(body.len() as u8);
        }
        dst.put_slice(&body);
        Ok(())
    }
}
