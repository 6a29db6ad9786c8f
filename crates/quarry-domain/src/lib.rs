//! Quarry Domain Layer
//!
//! Core types shared by every Quarry crate: extraction tasks and their
//! lifecycle, the structured extraction record, the shapes an agent may
//! return, and the trait boundaries to the external collaborators.
//!
//! ## Key Concepts
//!
//! - **Task**: one tracked extraction request with a lifecycle state
//! - **ExtractionResult**: the always well-formed structured record
//! - **AgentOutput**: raw, possibly unstructured output of one agent run
//! - **Collaborators**: browser sessions, LLMs and the extraction invoker,
//!   expressed as traits and implemented by infrastructure crates
//!
//! ## Architecture
//!
//! This crate holds no I/O. Serialization derives are the only
//! infrastructure concern allowed in, because every record crosses the
//! HTTP boundary unchanged.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agent;
pub mod extraction;
pub mod task;
pub mod traits;

// Re-exports for convenience
pub use agent::{AgentHistory, AgentOutput, AgentStep, FinalResult};
pub use extraction::{ContentSection, ExtractionResult, RelatedPost, DEFAULT_SOURCE_URL};
pub use task::{Task, TaskId, TaskStatus, TransitionError, PROGRESS_KEY};
pub use traits::BrowserSession;
