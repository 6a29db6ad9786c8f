//! Configuration for the agent invoker and the Steel session client

use quarry_domain::DEFAULT_SOURCE_URL;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Steel cloud REST endpoint, used when no custom base URL is configured
pub const STEEL_CLOUD_API: &str = "https://api.steel.dev";

/// Steel cloud DevTools endpoint
pub const STEEL_CLOUD_CONNECT: &str = "wss://connect.steel.dev";

/// Configuration for one agent round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Page the question is submitted to
    pub start_url: String,

    /// Query parameter that carries the question
    pub query_param: String,

    /// Rendered page text beyond this many characters is dropped from the prompt
    pub max_page_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_SOURCE_URL.to_string(),
            query_param: "q".to_string(),
            max_page_chars: 60_000,
        }
    }
}

impl AgentConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        reqwest::Url::parse(&self.start_url)
            .map_err(|e| format!("start_url is not a valid URL: {}", e))?;

        if self.query_param.trim().is_empty() {
            return Err("query_param must not be empty".to_string());
        }

        if self.max_page_chars == 0 {
            return Err("max_page_chars must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

/// Steel browser service configuration
///
/// With only an API key the Steel cloud is used. With a base URL the
/// self-hosted instance at that address is used (the key, if any, is still
/// sent).
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Steel API key
    pub api_key: Option<String>,

    /// Self-hosted Steel base URL
    pub base_url: Option<String>,

    /// Timeout for each Steel API call in seconds
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for BrowserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserConfig")
            .field("api_key", &self.api_key().map(|_| "<redacted>"))
            .field("base_url", &self.base_url())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl BrowserConfig {
    /// The API key, if set and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// The custom base URL, if set and non-blank
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    /// REST endpoint for API calls
    pub fn api_base(&self) -> &str {
        self.base_url()
            .unwrap_or(STEEL_CLOUD_API)
            .trim_end_matches('/')
    }

    /// Whether the Steel cloud (as opposed to a self-hosted instance) is used
    pub fn is_cloud(&self) -> bool {
        self.api_key().is_some() && self.base_url().is_none()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key().is_none() && self.base_url().is_none() {
            return Err("either STEEL_API_KEY or STEEL_BASE_URL must be configured".to_string());
        }

        if let Some(base_url) = self.base_url() {
            reqwest::Url::parse(base_url)
                .map_err(|e| format!("STEEL_BASE_URL is not a valid URL: {}", e))?;
        }

        if self.timeout_secs == Some(0) {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        Ok(())
    }
}
