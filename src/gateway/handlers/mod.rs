//! HTTP 请求处理器

pub mod health;
pub mod webhook;

pub use health::handle_health;
pub use webhook::handle_webhook;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// 缺少必填字段时的固定错误信息
pub const MISSING_FIELDS_MESSAGE: &str = "Phone and Question are required!";

/// Sink 失败且未被吸收时的固定错误信息
pub const SINK_FAILED_MESSAGE: &str = "Failed to save response";

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Webhook 处理失败的终止状态
#[derive(Debug)]
pub enum WebhookError {
    /// 缺少 phone 或 question
    MissingFields,
    /// Sink 投递失败且需要暴露给调用方
    Sink(anyhow::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            WebhookError::MissingFields => {
                (StatusCode::BAD_REQUEST, MISSING_FIELDS_MESSAGE.to_string())
            }
            WebhookError::Sink(err) => {
                tracing::error!("Relay sink failed: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    SINK_FAILED_MESSAGE.to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
