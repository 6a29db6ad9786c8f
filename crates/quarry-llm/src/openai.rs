//! OpenAI-compatible Provider Implementation
//!
//! Talks to any endpoint that implements the `/chat/completions` API
//! (OpenAI, DeepSeek, local gateways).
//!
//! # Features
//!
//! - Async HTTP communication with a sync `LlmProvider` wrapper
//! - JSON mode for structured calls, skipped for models that reject it
//! - Retry logic with exponential backoff
//! - Timeout handling
//!
//! # Examples
//!
//! ```no_run
//! use quarry_llm::{LlmConfig, OpenAiProvider};
//!
//! let config = LlmConfig {
//!     api_key: "sk-...".to_string(),
//!     ..Default::default()
//! };
//! let provider = OpenAiProvider::new(config).unwrap();
//! ```

use crate::{LlmConfig, LlmError};
use quarry_domain::traits::LlmProvider as LlmProviderTrait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_BACKOFF_SECS: u64 = 30;

/// Provider for OpenAI-compatible chat completion APIs
pub struct OpenAiProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Chat completion response body (fields we read)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a new provider from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        if config.lacks_json_mode() {
            warn!(
                "Model '{}' does not support JSON response format; structured calls rely on the prompt alone",
                config.model
            );
        }

        Ok(Self { config, client })
    }

    /// Get the provider configuration
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Plain text completion
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = self.build_request(prompt, None);
        self.send(&request).await
    }

    /// Completion constrained to a JSON object matching `schema`
    pub async fn complete_structured(&self, prompt: &str, schema: &str) -> Result<String, LlmError> {
        let request = self.build_request(prompt, Some(schema));
        self.send(&request).await
    }

    fn build_request<'a>(&'a self, prompt: &'a str, schema: Option<&'a str>) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(schema) = schema {
            messages.push(Message {
                role: "system",
                content: schema,
            });
        }
        messages.push(Message {
            role: "user",
            content: prompt,
        });

        let response_format = match schema {
            Some(_) if !self.config.lacks_json_mode() => Some(ResponseFormat {
                kind: "json_object",
            }),
            _ => None,
        };

        ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            response_format,
        }
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.config.max_retries {
            match self
                .client
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(request)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response.json::<ChatResponse>().await.map_err(|e| {
                            LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                        })?;
                        let content = body
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|choice| choice.message.content)
                            .ok_or_else(|| {
                                LlmError::InvalidResponse("Response has no choices".to_string())
                            })?;
                        debug!("Completion from '{}': {} chars", self.config.model, content.len());
                        return Ok(content);
                    } else if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(LlmError::ModelNotAvailable(self.config.model.clone()));
                    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(LlmError::RateLimitExceeded);
                    } else {
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        last_error = Some(LlmError::Communication(format!(
                            "HTTP {}: {}",
                            status, error_text
                        )));
                    }
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.config.max_retries {
                let delay = backoff_delay(attempts);
                warn!(
                    "LLM request attempt {}/{} failed; retrying in {:?}",
                    attempts, self.config.max_retries, delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

/// Exponential backoff before retry `attempt` (1-based): 1s, 2s, 4s, capped
fn backoff_delay(attempt: u32) -> Duration {
    let secs = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_secs(secs.min(MAX_BACKOFF_SECS))
}

impl LlmProviderTrait for OpenAiProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        block_on(self.complete(prompt))?
    }

    fn generate_structured(&self, prompt: &str, schema: &str) -> Result<String, Self::Error> {
        block_on(self.complete_structured(prompt, schema))?
    }
}

/// Drive a future from synchronous code
///
/// Inside a runtime this must be called from a blocking-pool thread
/// (`spawn_blocking`); outside one a throwaway current-thread runtime is used.
fn block_on<F: Future>(future: F) -> Result<F::Output, LlmError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Ok(handle.block_on(future)),
        Err(_) => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map(|runtime| runtime.block_on(future))
            .map_err(|e| LlmError::Other(format!("Failed to start runtime: {}", e))),
    }
}
