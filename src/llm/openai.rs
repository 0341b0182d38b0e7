//! OpenAI generation client — reqwest JSON calls to the chat completions API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::error::LlmError;
use crate::llm::{LlmConfig, TextGenerator};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenAI chat completions client.
pub struct OpenAiClient {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: OPENAI_BASE_URL.to_string(),
        })
    }

    /// Override the API base URL (e.g. a proxy or a local stub).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        provider: "openai".to_string(),
                        timeout: HTTP_TIMEOUT,
                    }
                } else {
                    LlmError::RequestFailed {
                        provider: "openai".to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(LlmError::AuthFailed {
                provider: "openai".to_string(),
            });
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited {
                provider: "openai".to_string(),
                retry_after: None,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("{status}: {body}"),
            });
        }

        let body: Value = response.json().await.map_err(|e| LlmError::InvalidResponse {
            provider: "openai".to_string(),
            reason: e.to_string(),
        })?;
        extract_text(&body)
    }
}

/// Pull the generated text out of a chat completions response body.
fn extract_text(body: &Value) -> Result<String, LlmError> {
    match body["choices"][0]["message"]["content"].as_str() {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        Some(_) => Err(LlmError::InvalidResponse {
            provider: "openai".to_string(),
            reason: "empty completion text".to_string(),
        }),
        None => Err(LlmError::InvalidResponse {
            provider: "openai".to_string(),
            reason: "no choices in response".to_string(),
        }),
    }
}
