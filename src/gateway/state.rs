//! Gateway 应用状态

use std::sync::Arc;

use crate::providers::GeminiClient;
use crate::sinks::RelaySink;

/// Gateway 应用状态
///
/// 请求之间没有共享的可变状态
#[derive(Clone)]
pub struct AppState {
    gemini: Arc<GeminiClient>,
    sink: Arc<dyn RelaySink>,
}

impl AppState {
    pub fn new(gemini: GeminiClient, sink: Arc<dyn RelaySink>) -> Self {
        Self {
            gemini: Arc::new(gemini),
            sink,
        }
    }

    pub fn gemini(&self) -> &GeminiClient {
        &self.gemini
    }

    pub fn sink(&self) -> &dyn RelaySink {
        self.sink.as_ref()
    }
}
