//! Endpoint 解析
//!
//! 支持的格式：
//! - `ipc:///tmp/noisepage-ipc0` 或裸路径 `/tmp/noisepage-ipc0` → Unix Socket
//! - `tcp://127.0.0.1:15645` → TCP
//!
//! `inproc://` 只在数据库进程内部有意义，这里解析出来但连接时拒绝。

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::EndpointError;

/// 对端控制地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// 本地 Unix Socket
    Ipc(PathBuf),
    /// TCP host:port
    Tcp { host: String, port: u16 },
    /// 其他 scheme（保留原文，连接时报错）
    Other(String),
}

impl Endpoint {
    /// 创建 IPC endpoint
    pub fn ipc<P: Into<PathBuf>>(path: P) -> Self {
        Endpoint::Ipc(path.into())
    }

    /// 创建 TCP endpoint
    pub fn tcp(host: &str, port: u16) -> Self {
        Endpoint::Tcp {
            host: host.to_string(),
            port,
        }
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EndpointError::Empty);
        }

        if let Some(path) = s.strip_prefix("ipc://") {
            if path.is_empty() {
                return Err(EndpointError::Empty);
            }
            return Ok(Endpoint::Ipc(PathBuf::from(path)));
        }

        if let Some(addr) = s.strip_prefix("tcp://") {
            let (host, port) = addr
                .rsplit_once(':')
                .ok_or_else(|| EndpointError::InvalidTcp(addr.to_string()))?;
            let host = host.trim_start_matches('[').trim_end_matches(']');
            if host.is_empty() {
                return Err(EndpointError::InvalidTcp(addr.to_string()));
            }
            let port: u16 = port
                .parse()
                .map_err(|_| EndpointError::InvalidTcp(addr.to_string()))?;
            return Ok(Endpoint::tcp(host, port));
        }

        if s.contains("://") {
            return Ok(Endpoint::Other(s.to_string()));
        }

        // 启动器直接传入 IPC 路径
        Ok(Endpoint::Ipc(PathBuf::from(s)))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Ipc(path) => write!(f, "ipc://{}", path.display()),
            Endpoint::Tcp { host, port } if host.contains(':') => write!(f, "tcp://[{}]:{}", host, port),
            Endpoint::Tcp { host, port } => write!(f, "tcp://{}:{}", host, port),
            Endpoint::Other(raw) => f.write_str(raw),
        }
    }
}
