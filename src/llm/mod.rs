//! Generation backends for WellBot.
//!
//! Supports:
//! - **Gemini**: `generateContent` REST API
//! - **OpenAI**: chat completions REST API
//!
//! Both are plain reqwest JSON clients behind the single-method
//! `TextGenerator` trait, so the pipeline can be tested against a mock and
//! providers can be swapped without touching pipeline logic.

mod gemini;
mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LlmError;

/// Supported generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
    OpenAi,
}

/// Configuration for creating a generation provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Single-call generation capability: one prompt in, one text out.
///
/// No multi-turn state, no streaming. Retry policy, if any, belongs to the
/// provider client — callers attempt exactly one call per message.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier, for logging and diagnostics.
    fn model_name(&self) -> &str;

    /// Send one prompt and return the generated text verbatim.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Create a generation provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>, LlmError> {
    match config.backend {
        LlmBackend::Gemini => {
            let client = GeminiClient::new(config)?;
            tracing::info!("Using Gemini (model: {})", config.model);
            Ok(Arc::new(client))
        }
        LlmBackend::OpenAi => {
            let client = OpenAiClient::new(config)?;
            tracing::info!("Using OpenAI (model: {})", config.model);
            Ok(Arc::new(client))
        }
    }
}
