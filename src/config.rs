//! 应用配置模块
//!
//! 负责从环境变量加载应用配置，包括：
//! - 服务器监听地址和端口
//! - Gemini 与 WhatsApp 接口地址和凭据
//! - Relay sink 选择及日志文件路径

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Gemini generateContent 默认地址
pub const DEFAULT_GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

/// 文件 sink 默认路径（相对于工作目录）
pub const DEFAULT_LOG_FILE: &str = "answers.log";

/// Relay sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// 通过 WhatsApp 网关发送答案
    Whatsapp,
    /// 将答案追加到本地文件
    File,
}

impl std::str::FromStr for SinkKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whatsapp" => Ok(SinkKind::Whatsapp),
            "file" => Ok(SinkKind::File),
            other => anyhow::bail!("Unknown sink kind: {other}"),
        }
    }
}

/// 应用配置
///
/// 启动时构造一次，之后只读，通过引用传入各组件
#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器监听地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
    /// 使用的 relay sink
    pub sink: SinkKind,
    /// 文件 sink 的追加路径
    pub log_file: PathBuf,
    /// 是否禁用 TLS 验证（用于调试 mitmproxy 等场景）
    pub disable_tls_verify: bool,
    pub gemini_api_url: String,
    pub gemini_api_key: String,
    pub whatsapp_api_url: String,
    pub whatsapp_app_key: String,
    pub whatsapp_auth_key: String,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// # 环境变量
    ///
    /// - `ASKRELAY_HOST`: 服务器监听地址（默认: "0.0.0.0"）
    /// - `ASKRELAY_PORT`: 服务器监听端口（默认: 3000）
    /// - `ASKRELAY_SINK`: `whatsapp` 或 `file`（默认: whatsapp）
    /// - `ASKRELAY_LOG_FILE`: 文件 sink 路径（默认: "answers.log"）
    /// - `ASKRELAY_DISABLE_TLS_VERIFY`: "1" 或 "true" 时禁用 TLS 验证
    /// - `GEMINI_API_KEY`, `GEMINI_API_URL`
    /// - `WHATSAPP_API_URL`, `WHATSAPP_API_KEY`, `WHATSAPP_AUTH_KEY`
    ///
    /// 凭据不做校验，缺失时为空字符串。
    ///
    /// # 错误
    ///
    /// - 如果 `ASKRELAY_PORT` 不是有效的端口号
    /// - 如果 `ASKRELAY_SINK` 不是已知的 sink 类型
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 使用给定的查找函数构造配置
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var_or("ASKRELAY_HOST", "0.0.0.0");

        let port = var_or("ASKRELAY_PORT", "3000")
            .parse()
            .context("ASKRELAY_PORT must be a valid port number")?;

        let sink = var_or("ASKRELAY_SINK", "whatsapp")
            .parse()
            .context("ASKRELAY_SINK must be either 'whatsapp' or 'file'")?;

        let disable_tls_verify = lookup("ASKRELAY_DISABLE_TLS_VERIFY")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            sink,
            log_file: PathBuf::from(var_or("ASKRELAY_LOG_FILE", DEFAULT_LOG_FILE)),
            disable_tls_verify,
            gemini_api_url: var_or("GEMINI_API_URL", DEFAULT_GEMINI_API_URL),
            gemini_api_key: var_or("GEMINI_API_KEY", ""),
            whatsapp_api_url: var_or("WHATSAPP_API_URL", ""),
            whatsapp_app_key: var_or("WHATSAPP_API_KEY", ""),
            whatsapp_auth_key: var_or("WHATSAPP_AUTH_KEY", ""),
        })
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}
