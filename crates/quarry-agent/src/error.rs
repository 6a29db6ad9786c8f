//! Error types for the agent invoker

use thiserror::Error;

/// Errors that can occur during one agent round trip
#[derive(Error, Debug)]
pub enum AgentError {
    /// Browser session could not be opened or used
    #[error("Session error: {0}")]
    Session(String),

    /// Target page could not be rendered
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
