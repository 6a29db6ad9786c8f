//! Task module - one tracked extraction request and its lifecycle

use crate::extraction::ExtractionResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata key holding the human-readable progress note
pub const PROGRESS_KEY: &str = "progress";

/// Unique identifier for a task based on a random UUID (v4)
///
/// Random rather than time-ordered so that callers cannot guess the
/// identifiers of other callers' tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(uuid::Uuid);

impl TaskId {
    /// Generate a fresh random TaskId
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_domain::TaskId;
    ///
    /// let a = TaskId::new();
    /// let b = TaskId::new();
    /// assert_ne!(a, b);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse a TaskId from its hyphenated string form
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_domain::TaskId;
    ///
    /// let id = TaskId::new();
    /// let parsed = TaskId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid task id: {}", e))
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

/// Execution status of a task
///
/// Legal transitions:
/// - Pending → Running → Completed | Failed
/// - Pending → Cancelled
///
/// Completed, Failed and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created and waiting for a concurrency slot
    Pending,
    /// Extraction in flight
    Running,
    /// Extraction succeeded, result attached
    Completed,
    /// Extraction failed, error attached
    Failed,
    /// Cancelled before execution started
    Cancelled,
}

impl TaskStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::Running,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a status from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(TaskStatus::Pending),
            "running" => Some(TaskStatus::Running),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Pending, TaskStatus::Cancelled)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid task status: {}", s))
    }
}

/// Rejected status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    /// Status the task was in
    pub from: TaskStatus,
    /// Status that was requested
    pub to: TaskStatus,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for TransitionError {}

/// One extraction request tracked by the task manager
///
/// Fields are read-only from outside this crate; every status change goes
/// through a transition method that checks the state machine and keeps
/// `result` and `error` consistent with the status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    task_id: TaskId,
    status: TaskStatus,
    question: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    result: Option<ExtractionResult>,
    error: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl Task {
    /// Create a new pending task for the given question
    pub fn new(task_id: TaskId, question: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            status: TaskStatus::Pending,
            question: question.into(),
            created_at: now,
            updated_at: now,
            result: None,
            error: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Task identifier
    pub fn id(&self) -> TaskId {
        self.task_id
    }

    /// Current status
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// The question this task extracts answers for
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Timestamp of the last transition
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Extraction result, present only when Completed
    pub fn result(&self) -> Option<&ExtractionResult> {
        self.result.as_ref()
    }

    /// Error message, present only when Failed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Auxiliary metadata
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Current progress note, if any
    pub fn progress(&self) -> Option<&str> {
        self.metadata.get(PROGRESS_KEY).map(String::as_str)
    }

    /// Pending → Running, recording a progress note
    pub fn start(&mut self, progress: impl Into<String>) -> Result<(), TransitionError> {
        self.advance(TaskStatus::Running)?;
        self.metadata.insert(PROGRESS_KEY.to_string(), progress.into());
        Ok(())
    }

    /// Running → Completed with the extraction result attached
    pub fn complete(&mut self, result: ExtractionResult) -> Result<(), TransitionError> {
        self.advance(TaskStatus::Completed)?;
        self.result = Some(result);
        Ok(())
    }

    /// Running → Failed with a human-readable error attached
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.advance(TaskStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Pending → Cancelled
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        self.advance(TaskStatus::Cancelled)
    }

    fn advance(&mut self, to: TaskStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        // Wall clock may step backwards; updated_at never precedes created_at.
        self.updated_at = Utc::now().max(self.created_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> ExtractionResult {
        ExtractionResult::empty("https://www.reddit.com/answers/", "q")
    }

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new(TaskId::new(), "what is X?");
        assert_eq!(task.status(), TaskStatus::Pending);
        assert_eq!(task.question(), "what is X?");
        assert!(task.result().is_none());
        assert!(task.error().is_none());
        assert_eq!(task.created_at(), task.updated_at());
    }

    #[test]
    fn test_success_path() {
        let mut task = Task::new(TaskId::new(), "q");
        task.start("Starting extraction...").unwrap();
        assert_eq!(task.status(), TaskStatus::Running);
        assert_eq!(task.progress(), Some("Starting extraction..."));

        task.complete(sample_result()).unwrap();
        assert_eq!(task.status(), TaskStatus::Completed);
        assert!(task.result().is_some());
        assert!(task.error().is_none());
        assert!(task.updated_at() >= task.created_at());
    }

    #[test]
    fn test_failure_path() {
        let mut task = Task::new(TaskId::new(), "q");
        task.start("Starting extraction...").unwrap();
        task.fail("Extraction failed: boom").unwrap();
        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.error(), Some("Extraction failed: boom"));
        assert!(task.result().is_none());
    }

    #[test]
    fn test_cancel_only_from_pending() {
        let mut task = Task::new(TaskId::new(), "q");
        task.cancel().unwrap();
        assert_eq!(task.status(), TaskStatus::Cancelled);

        let err = task.cancel().unwrap_err();
        assert_eq!(err.from, TaskStatus::Cancelled);
        assert_eq!(err.to, TaskStatus::Cancelled);

        let mut running = Task::new(TaskId::new(), "q");
        running.start("go").unwrap();
        assert!(running.cancel().is_err());
        assert_eq!(running.status(), TaskStatus::Running);
    }

    #[test]
    fn test_cannot_complete_without_running() {
        let mut task = Task::new(TaskId::new(), "q");
        assert!(task.complete(sample_result()).is_err());
        assert!(task.fail("nope").is_err());
        assert_eq!(task.status(), TaskStatus::Pending);
        assert!(task.result().is_none());
        assert!(task.error().is_none());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut task = Task::new(TaskId::new(), "q");
        task.start("go").unwrap();
        task.complete(sample_result()).unwrap();

        assert!(task.fail("late").is_err());
        assert!(task.start("again").is_err());
        assert!(task.cancel().is_err());
        assert_eq!(task.status(), TaskStatus::Completed);
        assert!(task.error().is_none());
    }

    #[test]
    fn test_status_parse_and_display() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
            assert_eq!(status.to_string(), status.as_str());
        }
        assert_eq!(TaskStatus::parse("RUNNING"), Some(TaskStatus::Running));
        assert!("bogus".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&TaskStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }

    #[test]
    fn test_task_id_invalid_string() {
        assert!(TaskId::from_string("not-a-uuid").is_err());
        assert!(TaskId::from_string("").is_err());
    }

    #[test]
    fn test_task_serializes_flat_record() {
        let task = Task::new(TaskId::new(), "q");
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["task_id"], serde_json::json!(task.id().to_string()));
        assert_eq!(value["status"], "pending");
        assert!(value["result"].is_null());
        assert!(value["error"].is_null());
    }
}
