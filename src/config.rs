//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::LlmBackend;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DB_PATH: &str = "./data/wellbot.db";
const DEFAULT_RULES_PATH: &str = "./wellness_rules.json";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Default deadline for a single generation call, in seconds. One slow
/// upstream call must not stall a chat request for longer than this.
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 10;

/// Bot configuration, sourced from environment variables.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Which generation backend to use.
    pub backend: LlmBackend,
    /// Generation API key. Sourced from the environment, never from code.
    pub api_key: SecretString,
    /// Model identifier for the chosen backend.
    pub model: String,
    /// HTTP listen port.
    pub port: u16,
    /// Path to the chat history database file.
    pub db_path: String,
    /// Path to the rule-definition JSON file.
    pub rules_path: String,
    /// Deadline for a single generation call.
    pub generation_timeout: Duration,
}

impl BotConfig {
    /// Read configuration from the environment.
    ///
    /// `WELLBOT_LLM_BACKEND` selects `gemini` (default) or `openai`; the
    /// matching `GEMINI_API_KEY` / `OPENAI_API_KEY` is required. Everything
    /// else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = match std::env::var("WELLBOT_LLM_BACKEND").as_deref() {
            Ok("openai") => LlmBackend::OpenAi,
            Ok("gemini") | Err(_) => LlmBackend::Gemini,
            Ok(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "WELLBOT_LLM_BACKEND".to_string(),
                    message: format!("unknown backend '{other}' (expected 'gemini' or 'openai')"),
                });
            }
        };

        let (key_var, default_model) = match backend {
            LlmBackend::Gemini => ("GEMINI_API_KEY", DEFAULT_GEMINI_MODEL),
            LlmBackend::OpenAi => ("OPENAI_API_KEY", DEFAULT_OPENAI_MODEL),
        };

        let api_key = std::env::var(key_var)
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingEnvVar(key_var.to_string()))?;

        let model =
            std::env::var("WELLBOT_MODEL").unwrap_or_else(|_| default_model.to_string());

        let port = match std::env::var("WELLBOT_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "WELLBOT_PORT".to_string(),
                message: format!("'{raw}' is not a valid port"),
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let generation_timeout = match std::env::var("WELLBOT_GENERATION_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "WELLBOT_GENERATION_TIMEOUT_SECS".to_string(),
                    message: format!("'{raw}' is not a valid number of seconds"),
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS),
        };

        Ok(Self {
            backend,
            api_key,
            model,
            port,
            db_path: std::env::var("WELLBOT_DB_PATH")
                .unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
            rules_path: std::env::var("WELLBOT_RULES_PATH")
                .unwrap_or_else(|_| DEFAULT_RULES_PATH.to_string()),
            generation_timeout,
        })
    }
}
