//! Gemini generation client — reqwest JSON calls to the generateContent API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::error::LlmError;
use crate::llm::{LlmConfig, TextGenerator};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// HTTP-level timeout. The pipeline applies its own (shorter, configurable)
/// deadline on top of this; this one only bounds a fully wedged connection.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Gemini REST client.
pub struct GeminiClient {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: "gemini".to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Override the API base URL (e.g. a proxy or a local stub).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        provider: "gemini".to_string(),
                        timeout: HTTP_TIMEOUT,
                    }
                } else {
                    LlmError::RequestFailed {
                        provider: "gemini".to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::AuthFailed {
                provider: "gemini".to_string(),
            });
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited {
                provider: "gemini".to_string(),
                retry_after: None,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                provider: "gemini".to_string(),
                reason: format!("{status}: {body}"),
            });
        }

        let body: Value = response.json().await.map_err(|e| LlmError::InvalidResponse {
            provider: "gemini".to_string(),
            reason: e.to_string(),
        })?;
        extract_text(&body)
    }
}

/// Pull the generated text out of a generateContent response body.
fn extract_text(body: &Value) -> Result<String, LlmError> {
    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: "gemini".to_string(),
            reason: "no candidates in response".to_string(),
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        return Err(LlmError::InvalidResponse {
            provider: "gemini".to_string(),
            reason: "empty candidate text".to_string(),
        });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_text_from_single_part() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello from Gemini." }] }
            }]
        });
        assert_eq!(extract_text(&body).unwrap(), "Hello from Gemini.");
    }

    #[test]
    fn extract_text_joins_multiple_parts() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "One. " }, { "text": "Two." }] }
            }]
        });
        assert_eq!(extract_text(&body).unwrap(), "One. Two.");
    }

    #[test]
    fn extract_text_missing_candidates_is_invalid() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = extract_text(&body).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[test]
    fn extract_text_empty_parts_is_invalid() {
        let body = json!({
            "candidates": [{ "content": { "parts": [] } }]
        });
        assert!(extract_text(&body).is_err());
    }
}
