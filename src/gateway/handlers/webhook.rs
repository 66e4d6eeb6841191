//! Webhook 处理器
//!
//! 校验 → Gemini 补全 → Relay sink → 汇总响应

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::Value;

use crate::gateway::{handlers::WebhookError, state::AppState};
use crate::sinks::AnswerRecord;

/// 入站请求体
///
/// 请求体按 JSON 宽松解析：缺少 Content-Type、空请求体或无法解析时视为空对象
#[derive(Debug, Default)]
pub struct WebhookRequest {
    phone: Option<Value>,
    question: Option<Value>,
}

impl WebhookRequest {
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(mut fields)) => Self {
                phone: fields.remove("phone"),
                question: fields.remove("question"),
            },
            _ => Self::default(),
        }
    }

    /// 两个字段都必须存在且为真值
    fn into_fields(self) -> Result<(String, String), WebhookError> {
        match (field_text(self.phone), field_text(self.question)) {
            (Some(phone), Some(question)) => Ok((phone, question)),
            _ => Err(WebhookError::MissingFields),
        }
    }
}

/// 把字段转成文本；`null`、`false`、`0` 和空字符串视为缺失
fn field_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// 成功响应
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    phone: String,
    question: String,
    answer: String,
    #[serde(rename = "whatsappResponse", skip_serializing_if = "Option::is_none")]
    whatsapp_response: Option<Value>,
}

impl From<AnswerRecord> for WebhookResponse {
    fn from(record: AnswerRecord) -> Self {
        Self {
            phone: record.phone,
            question: record.question,
            answer: record.answer,
            whatsapp_response: record.relay_result,
        }
    }
}

/// POST /webhook 处理器
pub async fn handle_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookError> {
    let request = WebhookRequest::from_body(&body);

    tracing::info!(?request, "Received webhook");

    let (phone, question) = request.into_fields()?;

    let answer = state.gemini().get_completion(&question).await;
    let mut record = AnswerRecord::new(phone, question, answer);

    let sink = state.sink();
    record.relay_result = match sink.relay(&record).await {
        Ok(result) => result,
        Err(err) => match sink.absorbed_failure() {
            Some(substitute) => {
                tracing::error!(sink = ?sink.kind(), "Relay failed: {:#}", err);
                Some(substitute)
            }
            None => return Err(WebhookError::Sink(err)),
        },
    };

    Ok(Json(record.into()))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use reqwest::Client;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::{Config, SinkKind};
    use crate::gateway::{build_router, AppState};
    use crate::providers::gemini::{ERROR_ANSWER, GeminiClient};
    use crate::sinks::create_sink;

    const GEMINI_PATH: &str = "/v1beta/models/gemini-pro:generateContent";
    const WHATSAPP_PATH: &str = "/api/create-message";

    fn router(server: &MockServer, sink: SinkKind, log_file: &Path) -> Router {
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.sink = sink;
        config.log_file = log_file.to_path_buf();
        config.gemini_api_url = format!("{}{}", server.uri(), GEMINI_PATH);
        config.gemini_api_key = "test-key".to_string();
        config.whatsapp_api_url = format!("{}{}", server.uri(), WHATSAPP_PATH);

        let gemini = GeminiClient::new(Client::new(), &config);
        let sink = create_sink(&config, Client::new());
        build_router(AppState::new(gemini, sink))
    }

    async fn mount_gemini(server: &MockServer, answer: &str, calls: u64) {
        Mock::given(method("POST"))
            .and(path(GEMINI_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": answer }] } }]
            })))
            .expect(calls)
            .mount(server)
            .await;
    }

    async fn post_webhook(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_fields_return_400_without_outbound_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        for body in [
            r#"{"question":"What is 2+2?"}"#,
            r#"{"phone":"15551234567"}"#,
            r#"{}"#,
            r#"{"phone":"","question":"What is 2+2?"}"#,
            r#"{"phone":"15551234567","question":null}"#,
            r#"{"phone":0,"question":"What is 2+2?"}"#,
            r#"{"phone":"15551234567","question":false}"#,
            r#"[]"#,
            "{not json",
        ] {
            let app = router(&server, SinkKind::Whatsapp, &dir.path().join("a.log"));
            let (status, json) = post_webhook(app, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json, json!({ "error": "Phone and Question are required!" }));
        }
    }

    #[tokio::test]
    async fn empty_body_without_content_type_returns_fixed_400() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let app = router(&server, SinkKind::Whatsapp, &dir.path().join("a.log"));

        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, json!({ "error": "Phone and Question are required!" }));
    }

    #[tokio::test]
    async fn numeric_phone_is_relayed_as_text() {
        let server = MockServer::start().await;
        mount_gemini(&server, "4", 1).await;
        Mock::given(method("POST"))
            .and(path(WHATSAPP_PATH))
            .and(body_string_contains("to=15551234567"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let app = router(&server, SinkKind::Whatsapp, &dir.path().join("a.log"));

        let (status, json) =
            post_webhook(app, r#"{"phone":15551234567,"question":"What is 2+2?"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["phone"], "15551234567");
        assert_eq!(json["answer"], "4");
    }

    #[tokio::test]
    async fn relays_answer_to_whatsapp() {
        let server = MockServer::start().await;
        mount_gemini(&server, "4", 1).await;
        Mock::given(method("POST"))
            .and(path(WHATSAPP_PATH))
            .and(body_string_contains("to=15551234567"))
            .and(body_string_contains("message=4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message_status": "Success" })))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let app = router(&server, SinkKind::Whatsapp, &dir.path().join("a.log"));

        let (status, json) =
            post_webhook(app, r#"{"phone":"15551234567","question":"What is 2+2?"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({
                "phone": "15551234567",
                "question": "What is 2+2?",
                "answer": "4",
                "whatsappResponse": { "message_status": "Success" }
            })
        );

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url.path(), GEMINI_PATH);
        assert_eq!(requests[1].url.path(), WHATSAPP_PATH);
    }

    #[tokio::test]
    async fn whatsapp_failure_is_absorbed() {
        let server = MockServer::start().await;
        mount_gemini(&server, "4", 1).await;
        Mock::given(method("POST"))
            .and(path(WHATSAPP_PATH))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let app = router(&server, SinkKind::Whatsapp, &dir.path().join("a.log"));

        let (status, json) =
            post_webhook(app, r#"{"phone":"15551234567","question":"What is 2+2?"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["answer"], "4");
        assert_eq!(
            json["whatsappResponse"],
            json!({ "status": "error", "message": "Failed to send message" })
        );
    }

    #[tokio::test]
    async fn completion_failure_still_relays_error_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GEMINI_PATH))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(WHATSAPP_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let app = router(&server, SinkKind::Whatsapp, &dir.path().join("a.log"));

        let (status, json) = post_webhook(app, r#"{"phone":"1","question":"hello"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["answer"], ERROR_ANSWER);
    }

    #[tokio::test]
    async fn file_sink_appends_one_block() {
        let server = MockServer::start().await;
        mount_gemini(&server, "4", 1).await;
        let dir = tempfile::tempdir().unwrap();
        let log_file = dir.path().join("answers.log");
        let app = router(&server, SinkKind::File, &log_file);

        let (status, json) =
            post_webhook(app, r#"{"phone":"15551234567","question":"What is 2+2?"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({ "phone": "15551234567", "question": "What is 2+2?", "answer": "4" })
        );

        let content = std::fs::read_to_string(&log_file).unwrap();
        assert!(content.ends_with("\n\n"));
        assert_eq!(content.matches("\n\n").count(), 1);
        assert!(content.contains(r#""phone": "15551234567""#));
        assert!(content.contains(r#""question": "What is 2+2?""#));
        assert!(content.contains(r#""answer": "4""#));

        let block: serde_json::Value = serde_json::from_str(content.trim_end()).unwrap();
        let ts = block["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[tokio::test]
    async fn file_sink_failure_returns_500() {
        let server = MockServer::start().await;
        mount_gemini(&server, "4", 1).await;
        let dir = tempfile::tempdir().unwrap();
        let app = router(
            &server,
            SinkKind::File,
            &dir.path().join("no-such-dir").join("answers.log"),
        );

        let (status, json) =
            post_webhook(app, r#"{"phone":"15551234567","question":"What is 2+2?"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({ "error": "Failed to save response" }));
    }

    #[tokio::test]
    async fn health_reports_sink() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let app = router(&server, SinkKind::File, &dir.path().join("a.log"));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["sink"], "file");
    }
}
