//! pilot-agent - 模型侧 pilot agent
//!
//! 由数据库启动器拉起：`pilot-agent /tmp/noisepage-ipc0`
//!
//! 负责：
//! - 连接数据库控制端点并上线
//! - 响应心跳，收到 Quit 后退出
//! - 收到 SIGINT / SIGTERM 时释放连接并退出

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use pilot_agent::config::{
    DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_IPC_PATH, ENV_ENDPOINT, ENV_HANDSHAKE_TIMEOUT_MS,
};
use pilot_agent::{AgentConfig, DealerSocket, Endpoint, PilotAgent};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 连接失败的退出码
const EXIT_CONNECT_FAILED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "pilot-agent", version, about = "Attach to the database control endpoint as the model pilot")]
struct Args {
    /// 数据库控制地址（ipc://path、tcp://host:port 或裸路径）
    #[arg(env = ENV_ENDPOINT, default_value = DEFAULT_IPC_PATH)]
    endpoint: Endpoint,

    /// 连接 + 握手超时（毫秒）
    #[arg(long, env = ENV_HANDSHAKE_TIMEOUT_MS, default_value_t = DEFAULT_HANDSHAKE_TIMEOUT_MS)]
    handshake_timeout_ms: u64,
}

/// 命令行参数优先于环境变量（由 clap 解析），两者都缺省时用默认值
fn config_from_args(args: Args) -> AgentConfig {
    AgentConfig::new(args.endpoint)
        .with_handshake_timeout(Duration::from_millis(args.handshake_timeout_ms))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pilot_agent=info")))
        .init();

    tracing::info!("🚀 pilot-agent v{}", pilot_agent::VERSION);

    let config = config_from_args(Args::parse());
    let endpoint = config.endpoint.clone();
    let mut agent = PilotAgent::<DealerSocket>::new(config);

    if let Err(e) = agent.start(&endpoint).await {
        tracing::error!("❌ 无法连接数据库: {}", e);
        return Ok(ExitCode::from(EXIT_CONNECT_FAILED));
    }

    let outcome = agent.run_session_until(shutdown_signal()).await;
    tracing::info!("👋 pilot-agent exiting");

    // 信号退出与 Quit 一样视为正常结束
    Ok(match outcome {
        Some(outcome) if !outcome.is_quit() => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

/// 等待 SIGINT / SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Failed to register SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
