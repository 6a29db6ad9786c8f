//! Quarry Agent
//!
//! The extraction invoker: for each question it opens a remote browser
//! session, renders the Reddit Answers page, and asks an LLM to turn the
//! page into a JSON record.
//!
//! # Architecture
//!
//! ```text
//! question → SessionProvider::open → fetch(start_url?q=question)
//!          → PromptBuilder → LlmProvider::generate_structured
//!          → AgentOutput::WithHistory
//! ```
//!
//! The browser side is abstracted behind `SessionProvider` (implemented here
//! by `SteelClient`) and the model behind `LlmProvider`, so the invoker can
//! be driven entirely by test doubles.

#![warn(missing_docs)]

pub mod config;
mod error;
mod invoker;
pub mod prompt;
pub mod steel;


pub use config::{AgentConfig, BrowserConfig};
pub use error::AgentError;
pub use invoker::AgentInvoker;
pub use prompt::PromptBuilder;
pub use steel::SteelClient;
