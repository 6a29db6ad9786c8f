//! Configuration for the Normalizer

use quarry_domain::DEFAULT_SOURCE_URL;
use serde::{Deserialize, Serialize};

/// Configuration for the Normalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Source URL recorded when the agent output names none
    pub default_url: String,

    /// Whether `Attachment: <path>.json` references are loaded from disk
    pub follow_attachments: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            default_url: DEFAULT_SOURCE_URL.to_string(),
            follow_attachments: true,
        }
    }
}

impl NormalizerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_url.trim().is_empty() {
            return Err("default_url must not be empty".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }
}
