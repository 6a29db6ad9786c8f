//! Configuration for the LLM provider

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default OpenAI-compatible endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Upper bound on request attempts
pub const MAX_RETRIES: u32 = 10;

/// Configuration for an OpenAI-compatible provider
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model name (e.g., "gpt-4o-mini", "deepseek-chat")
    pub model: String,

    /// API key; required
    pub api_key: String,

    /// API base URL, without the `/chat/completions` suffix
    pub base_url: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Attempts per call before giving up
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("model", &self.model)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl LlmConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("OPENAI_API_KEY is required".to_string());
        }

        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }

        if self.base_url.trim().is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be between 0.0 and 2.0".to_string());
        }

        if self.max_retries == 0 || self.max_retries > MAX_RETRIES {
            return Err(format!("max_retries must be between 1 and {}", MAX_RETRIES));
        }

        Ok(())
    }

    /// Whether the model rejects the `response_format` request field
    pub fn lacks_json_mode(&self) -> bool {
        self.model.to_lowercase().contains("deepseek")
    }
}
