use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use std::time::Duration;

/// 出站请求超时（秒）
const HTTP_TIMEOUT_SECS: u64 = 30;

/// 构建出站 HTTP 客户端（Gemini 与 WhatsApp 共用）
///
/// `disable_tls_verify` 仅用于调试 mitmproxy 等场景
pub fn build_http_client(disable_tls_verify: bool) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(concat!("askrelay/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10);

    if disable_tls_verify {
        tracing::warn!("TLS certificate verification is DISABLED - for debugging only!");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().context("Failed to create HTTP client")
}

/// 获取当前 UTC 时间的 ISO-8601 表示
///
/// 毫秒精度，以 `Z` 结尾，例如 `2024-05-01T12:00:00.123Z`
#[inline]
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
