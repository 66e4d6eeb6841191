//! Relay sink 抽象层
//!
//! 答案生成后的去处：WhatsApp 网关或本地追加日志。
//! 启动时根据配置选择一种，webhook 处理器只依赖 [`RelaySink`] trait。

pub mod file;
pub mod whatsapp;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{Config, SinkKind};

pub use file::FileSink;
pub use whatsapp::WhatsAppSink;

/// 一次问答的完整记录
#[derive(Debug, Clone, Serialize)]
pub struct AnswerRecord {
    pub phone: String,
    pub question: String,
    pub answer: String,
    /// ISO-8601 UTC 时间戳
    pub timestamp: String,
    #[serde(rename = "relayResult", skip_serializing_if = "Option::is_none")]
    pub relay_result: Option<Value>,
}

impl AnswerRecord {
    pub fn new(phone: String, question: String, answer: String) -> Self {
        Self {
            phone,
            question,
            answer,
            timestamp: crate::utils::iso_timestamp(),
            relay_result: None,
        }
    }
}

/// Relay Sink Trait - 答案投递目标的统一接口
#[async_trait]
pub trait RelaySink: Send + Sync {
    /// Sink 名称（用于日志和健康检查）
    fn kind(&self) -> SinkKind;

    /// 投递一条记录
    ///
    /// 成功时返回需要回传给调用方的结果（没有则为 `None`）
    async fn relay(&self, record: &AnswerRecord) -> Result<Option<Value>>;

    /// 投递失败时的替代结果
    ///
    /// 返回 `Some` 表示失败被吸收，替代值作为结果回传；
    /// 返回 `None` 表示失败需要作为服务端错误暴露给调用方
    fn absorbed_failure(&self) -> Option<Value> {
        None
    }
}

/// 根据配置创建 Sink
pub fn create_sink(config: &Config, client: Client) -> Arc<dyn RelaySink> {
    match config.sink {
        SinkKind::Whatsapp => Arc::new(WhatsAppSink::new(client, config)),
        SinkKind::File => Arc::new(FileSink::new(config.log_file())),
    }
}
