//! 补全 Provider
//!
//! 当前只有 Gemini generateContent 一种实现

pub mod gemini;

pub use gemini::GeminiClient;
