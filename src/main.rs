//! askrelay - Gemini 问答 Webhook 中继
//!
//! 接收带手机号和问题的 webhook，调用 Gemini 生成答案，
//! 再通过 WhatsApp 网关发送答案，或追加到本地日志文件。
//!
//! # 命令行接口
//!
//! - `serve`: 启动 webhook 服务器
//! - `test`: 向本地服务器发送测试请求

mod commands;
mod config;
mod gateway;
mod providers;
mod sinks;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{Config, SinkKind};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// askrelay CLI
#[derive(Parser)]
#[command(name = "askrelay")]
#[command(about = "Gemini question-answering webhook relay", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// 可用的命令
#[derive(Subcommand)]
enum Commands {
    /// 启动 webhook 服务器
    Serve {
        /// 答案投递方式（覆盖 ASKRELAY_SINK）
        #[arg(short, long, value_enum)]
        sink: Option<SinkKind>,
    },
    /// 向本地服务器发送测试请求
    Test {
        /// 接收答案的手机号
        #[arg(short, long)]
        phone: String,
        /// 要提问的问题
        #[arg(short, long, default_value = "What is 2+2?")]
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件（如果存在）
    if let Ok(dotenv_path) = std::env::var("ASKRELAY_ENV_FILE") {
        dotenvy::from_path(&dotenv_path).ok();
    } else {
        dotenvy::dotenv().ok();
    }

    // 初始化日志系统，ASKRELAY_LOG_JSON=1 时输出 JSON
    let json_logs = std::env::var("ASKRELAY_LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "askrelay=info,tower_http=info".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true)))
        .with((!json_logs).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
        }))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Serve { sink } => commands::serve_command(config, sink).await,
        Commands::Test { phone, question } => {
            commands::test_command(config, phone, question).await
        }
    }
}
