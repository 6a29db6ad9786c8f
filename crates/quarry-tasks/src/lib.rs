//! Quarry Task Manager
//!
//! Tracks extraction tasks through their lifecycle and runs them with a hard
//! bound on how many execute at once.
//!
//! # Architecture
//!
//! ```text
//! create ─► registry (Pending)
//! submit ─► unbounded queue ─► dispatcher ─► semaphore permit
//!                                         └► spawn execute(task, permit)
//!                                              ├► Running
//!                                              ├► spawn_blocking(invoke + normalize)
//!                                              └► Completed | Failed, then permit drops
//! ```
//!
//! The registry is the only owner of task state. Every mutation is a single
//! write-locked read-check-write through the domain's transition methods, so
//! a task can never be observed half-updated.

#![warn(missing_docs)]

mod config;
mod error;
mod manager;
mod registry;
mod stats;
mod worker;

pub use config::TaskManagerConfig;
pub use error::TaskError;
pub use manager::TaskManager;
pub use registry::TaskRegistry;
pub use stats::TaskStatistics;
pub use worker::STARTING_PROGRESS;
