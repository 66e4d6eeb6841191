//! WhatsApp 网关 Sink
//!
//! 以 form-urlencoded 方式把答案 POST 到消息网关

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};

use super::{AnswerRecord, RelaySink};
use crate::config::{Config, SinkKind};

/// 网关表单字段
#[derive(Debug, Serialize)]
struct SendMessageForm<'a> {
    to: &'a str,
    message: &'a str,
    appkey: &'a str,
    authkey: &'a str,
    sandbox: &'static str,
}

pub struct WhatsAppSink {
    client: Client,
    api_url: String,
    app_key: String,
    auth_key: String,
}

impl WhatsAppSink {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.whatsapp_api_url.clone(),
            app_key: config.whatsapp_app_key.clone(),
            auth_key: config.whatsapp_auth_key.clone(),
        }
    }

    /// 发送一条消息，返回网关响应体
    pub async fn send_message(&self, phone: &str, message: &str) -> Result<Value> {
        let form = SendMessageForm {
            to: phone,
            message,
            appkey: &self.app_key,
            authkey: &self.auth_key,
            sandbox: "false",
        };

        let response = self
            .client
            .post(&self.api_url)
            .form(&form)
            .send()
            .await
            .context("Failed to send request to WhatsApp API")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read WhatsApp API response")?;

        if !status.is_success() {
            bail!("WhatsApp API error {}: {}", status, body);
        }

        // 网关偶尔返回纯文本，原样透传
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

#[async_trait]
impl RelaySink for WhatsAppSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Whatsapp
    }

    async fn relay(&self, record: &AnswerRecord) -> Result<Option<Value>> {
        let response = self.send_message(&record.phone, &record.answer).await?;
        tracing::info!(to = %record.phone, "WhatsApp API response: {}", response);
        Ok(Some(response))
    }

    fn absorbed_failure(&self) -> Option<Value> {
        Some(json!({ "status": "error", "message": "Failed to send message" }))
    }
}
