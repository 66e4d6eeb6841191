//! Gemini 补全客户端
//!
//! 发送单轮 prompt 到 generateContent 接口，提取第一个候选答案的文本

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;

/// 响应中没有候选文本时返回的答案
pub const NO_RESPONSE_ANSWER: &str = "No response from Gemini.";

/// 网络或接口错误时返回的答案
pub const ERROR_ANSWER: &str = "Sorry, an error occurred!";

/// 一次补全调用的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Answer(String),
    /// 响应中缺少 `candidates[0].content.parts[0].text`
    Empty,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// 候选答案文本在响应中的位置
const FIRST_TEXT_POINTER: &str = "/candidates/0/content/parts/0/text";

/// 从响应体中提取第一个候选答案的文本
///
/// 任何不符合预期的结构（包括非 JSON 响应体）都视为没有答案
fn first_text(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer(FIRST_TEXT_POINTER)
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub struct GeminiClient {
    client: Client,
    url: String,
}

impl GeminiClient {
    pub fn new(client: Client, config: &Config) -> Self {
        let separator = if config.gemini_api_url.contains('?') { '&' } else { '?' };
        let url = format!(
            "{}{}key={}",
            config.gemini_api_url,
            separator,
            urlencoding::encode(&config.gemini_api_key)
        );
        Self { client, url }
    }

    /// 调用补全接口，失败时返回错误
    pub async fn try_completion(&self, prompt: &str) -> Result<Completion> {
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        tracing::debug!(prompt_len = prompt.len(), "Sending request to Gemini API");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, error_body);
        }

        let body = response
            .text()
            .await
            .context("Failed to read Gemini API response")?;

        Ok(first_text(&body)
            .map(Completion::Answer)
            .unwrap_or(Completion::Empty))
    }

    /// 获取问题的答案
    ///
    /// 永远返回字符串：缺少候选文本时为 [`NO_RESPONSE_ANSWER`]，
    /// 调用失败时为 [`ERROR_ANSWER`]。调用方无法区分这两种情况。
    pub async fn get_completion(&self, prompt: &str) -> String {
        match self.try_completion(prompt).await {
            Ok(Completion::Answer(text)) => text,
            Ok(Completion::Empty) => {
                tracing::warn!("Gemini response contained no candidate text");
                NO_RESPONSE_ANSWER.to_string()
            }
            Err(e) => {
                tracing::error!("Error fetching from Gemini API: {:#}", e);
                ERROR_ANSWER.to_string()
            }
        }
    }
}
