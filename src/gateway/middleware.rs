//! Gateway 中间件

use axum::{extract::Request, middleware::Next, response::Response};
use http::HeaderValue;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::Instrument;

/// 回传给调用方的请求编号 header
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 进程内递增的请求编号
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// 请求日志中间件
///
/// 每个请求一个 span，结束时按状态码选择日志级别，并在响应头中带上请求编号
pub async fn request_logger(request: Request, next: Next) -> Response {
    let id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
    let span = tracing::info_span!(
        "req",
        id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        let started = std::time::Instant::now();
        let mut response = next.run(request).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status = response.status();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), latency_ms, "done");
        } else if status.is_client_error() {
            tracing::warn!(status = status.as_u16(), latency_ms, "done");
        } else {
            tracing::info!(status = status.as_u16(), latency_ms, "done");
        }

        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, HeaderValue::from(id));
        response
    }
    .instrument(span)
    .await
}
