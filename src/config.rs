//! Agent 配置

use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};

/// Agent 身份（数据库按此路由回复）
pub const MODEL_IDENTITY: &str = "model";

/// 数据库默认 IPC 地址
pub const DEFAULT_IPC_PATH: &str = "/tmp/noisepage-ipc0";

/// 数据库默认 TCP 地址
pub const DEFAULT_TCP_HOST: &str = "127.0.0.1";
pub const DEFAULT_TCP_PORT: u16 = 15645;

/// 默认握手超时（毫秒）
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 5000;

/// 环境变量
pub const ENV_ENDPOINT: &str = "PILOT_ENDPOINT";
pub const ENV_HANDSHAKE_TIMEOUT_MS: &str = "PILOT_HANDSHAKE_TIMEOUT_MS";

/// Agent 配置
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// 数据库控制地址
    pub endpoint: Endpoint,
    /// 身份
    pub identity: String,
    /// 连接 + ZMTP 握手超时
    pub handshake_timeout: Duration,
}

impl AgentConfig {
    /// 使用指定 endpoint，其余取默认值
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            identity: MODEL_IDENTITY.to_string(),
            handshake_timeout: Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS),
        }
    }

    /// 设置握手超时
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// 数据库默认 TCP 地址
    pub fn default_tcp_endpoint() -> Endpoint {
        Endpoint::tcp(DEFAULT_TCP_HOST, DEFAULT_TCP_PORT)
    }

    /// 从环境变量创建配置
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意 key/value 来源创建配置
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_ENDPOINT) {
            config.endpoint = raw
                .parse()
                .map_err(|e| Error::Config(format!("{}={:?}: {}", ENV_ENDPOINT, raw, e)))?;
        }

        if let Some(raw) = lookup(ENV_HANDSHAKE_TIMEOUT_MS) {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{}={:?}: 不是有效的毫秒数", ENV_HANDSHAKE_TIMEOUT_MS, raw))
            })?;
            config.handshake_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new(Endpoint::ipc(DEFAULT_IPC_PATH))
    }
}
