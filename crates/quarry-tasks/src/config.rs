//! Configuration for the task manager

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the task manager
///
/// # Examples
///
/// ```
/// use quarry_tasks::TaskManagerConfig;
///
/// let config = TaskManagerConfig::default();
/// assert_eq!(config.max_concurrent_tasks, 5);
/// assert!(config.extraction_timeout().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskManagerConfig {
    /// Upper bound on extractions running at once
    /// Default: 5
    pub max_concurrent_tasks: usize,

    /// Deadline for one extraction in seconds
    /// Default: unset (no deadline)
    ///
    /// A timed-out task fails and frees its slot at once, but the blocking
    /// invocation cannot be interrupted and keeps its browser session until
    /// it returns. With a deadline set, more than `max_concurrent_tasks`
    /// sessions can therefore be open for a while.
    pub extraction_timeout_secs: Option<u64>,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 5,
            extraction_timeout_secs: None,
        }
    }
}

impl TaskManagerConfig {
    /// Get the extraction deadline as a Duration
    pub fn extraction_timeout(&self) -> Option<Duration> {
        self.extraction_timeout_secs.map(Duration::from_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_tasks == 0 {
            return Err("max_concurrent_tasks must be greater than 0".to_string());
        }
        if self.extraction_timeout_secs == Some(0) {
            return Err("extraction_timeout_secs must be greater than 0 when set".to_string());
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
