//! Configuration loading for the server.
//!
//! Settings come from an optional TOML file, then environment variables
//! (including a `.env` file, if present) override individual keys.

use quarry_agent::{AgentConfig, BrowserConfig};
use quarry_llm::LlmConfig;
use quarry_normalizer::NormalizerConfig;
use quarry_tasks::TaskManagerConfig;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A value is present but unusable
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),
}

/// Full server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub bind_address: String,

    /// Bind port (e.g., 8080)
    pub bind_port: u16,

    /// Task manager settings
    pub tasks: TaskManagerConfig,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Steel browser service settings
    pub browser: BrowserConfig,

    /// Agent round-trip settings
    pub agent: AgentConfig,

    /// Normalizer settings
    pub normalizer: NormalizerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            bind_port: 8080,
            tasks: TaskManagerConfig::default(),
            llm: LlmConfig::default(),
            browser: BrowserConfig::default(),
            agent: AgentConfig::default(),
            normalizer: NormalizerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load the effective configuration for the binary
    ///
    /// Reads `.env` if present, then the optional TOML file, then applies
    /// process environment overrides and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        // A missing .env file is the normal case.
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment variables
    ///
    /// `lookup` maps a variable name to its value; blank values are ignored.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = var("HOST") {
            self.bind_address = host;
        }
        if let Some(port) = var("PORT") {
            self.bind_port = parse_var("PORT", &port)?;
        }
        if let Some(max) = var("MAX_CONCURRENT_TASKS") {
            self.tasks.max_concurrent_tasks = parse_var("MAX_CONCURRENT_TASKS", &max)?;
        }
        if let Some(secs) = var("EXTRACTION_TIMEOUT_SECS") {
            self.tasks.extraction_timeout_secs = Some(parse_var("EXTRACTION_TIMEOUT_SECS", &secs)?);
        }
        if let Some(model) = var("MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(base_url) = var("OPENAI_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(key) = var("STEEL_API_KEY") {
            self.browser.api_key = Some(key);
        }
        if let Some(base_url) = var("STEEL_BASE_URL") {
            self.browser.base_url = Some(base_url);
        }

        Ok(())
    }

    /// Check every section; errors are fatal at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField("OPENAI_API_KEY".to_string()));
        }
        if self.browser.api_key().is_none() && self.browser.base_url().is_none() {
            return Err(ConfigError::MissingField(
                "STEEL_API_KEY or STEEL_BASE_URL".to_string(),
            ));
        }

        self.tasks.validate().map_err(ConfigError::InvalidValue)?;
        self.llm.validate().map_err(ConfigError::InvalidValue)?;
        self.browser.validate().map_err(ConfigError::InvalidValue)?;
        self.agent.validate().map_err(ConfigError::InvalidValue)?;
        self.normalizer.validate().map_err(ConfigError::InvalidValue)?;
        Ok(())
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{} has an invalid value: {}", key, value)))
}
