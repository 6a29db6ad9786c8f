//! Quarry Normalizer
//!
//! Recovers a well-formed [`ExtractionResult`] from raw agent output.
//!
//! # Overview
//!
//! Agent output has no format guarantee. The model may answer with a JSON
//! object, bury the object inside prose or a fenced code block, leave it in
//! an earlier step of its history, or point at a JSON attachment on disk.
//! The normalizer tries each of these in a fixed order and, when nothing
//! usable turns up, falls back to an empty record rather than failing.
//!
//! # Pipeline
//!
//! ```text
//! AgentOutput → strategy (final result → history → plain text)
//!             → JSON recovery (```json fence → any fence → brace scan → attachment)
//!             → field coercion → ExtractionResult
//! ```
//!
//! # Example Usage
//!
//! ```
//! use quarry_domain::AgentOutput;
//! use quarry_normalizer::{Normalizer, NormalizerConfig};
//!
//! let normalizer = Normalizer::new(NormalizerConfig::default());
//! let output = AgentOutput::from(
//!     "Done! ```json\n{\"url\": \"https://www.reddit.com/answers/abc\", \"sections\": []}\n```",
//! );
//!
//! let result = normalizer.normalize(&output, "how many planets?");
//! assert_eq!(result.url, "https://www.reddit.com/answers/abc");
//! assert_eq!(result.question, "how many planets?");
//! ```
//!
//! [`ExtractionResult`]: quarry_domain::ExtractionResult

#![warn(missing_docs)]

mod coerce;
mod config;
mod normalizer;
mod recovery;


pub use coerce::normalize_fields;
pub use config::NormalizerConfig;
pub use normalizer::Normalizer;
pub use recovery::{balanced_object_at, JsonRecovery, RecoveryStrategy};
