//! Error types for the task manager

use quarry_domain::{TaskId, TransitionError};
use thiserror::Error;

/// Errors that can occur while managing tasks
#[derive(Error, Debug)]
pub enum TaskError {
    /// No task with this id exists
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    /// The requested status change is not allowed
    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    /// The invoker failed or panicked
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// The invoker did not finish before the deadline
    #[error("Extraction failed: timed out after {0}s")]
    Timeout(u64),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
