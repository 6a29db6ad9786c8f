//! In-memory task registry
//!
//! The single owner of every `Task`. Callers only ever see clones; all
//! mutation goes through [`TaskRegistry::update`], which holds the write lock
//! for the whole read-check-write.

use crate::{TaskError, TaskStatistics};
use quarry_domain::{Task, TaskId, TaskStatus, TransitionError};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct Entry {
    /// Insertion order, used to break creation-time ties
    seq: u64,
    task: Task,
}

#[derive(Debug, Default)]
struct Entries {
    by_id: HashMap<TaskId, Entry>,
    next_seq: u64,
}

/// Registry of all tasks for the process lifetime
#[derive(Debug, Default)]
pub struct TaskRegistry {
    entries: RwLock<Entries>,
}

impl TaskRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task; an existing task with the same id is left untouched
    pub fn insert(&self, task: Task) -> bool {
        let mut entries = self.write();
        let task_id = task.id();
        if entries.by_id.contains_key(&task_id) {
            return false;
        }

        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.by_id.insert(task_id, Entry { seq, task });
        true
    }

    /// Snapshot of one task
    pub fn get(&self, task_id: TaskId) -> Option<Task> {
        self.read().by_id.get(&task_id).map(|e| e.task.clone())
    }

    /// Current status of one task
    pub fn status(&self, task_id: TaskId) -> Option<TaskStatus> {
        self.read().by_id.get(&task_id).map(|e| e.task.status())
    }

    /// Newest-first snapshot, optionally filtered by status
    pub fn list(&self, status: Option<TaskStatus>, limit: usize) -> Vec<Task> {
        let entries = self.read();
        let mut matching: Vec<&Entry> = entries
            .by_id
            .values()
            .filter(|e| status.is_none_or(|s| e.task.status() == s))
            .collect();

        matching.sort_by(|a, b| {
            b.task
                .created_at()
                .cmp(&a.task.created_at())
                .then(b.seq.cmp(&a.seq))
        });

        matching
            .into_iter()
            .take(limit)
            .map(|e| e.task.clone())
            .collect()
    }

    /// Apply `change` to a task under the write lock
    ///
    /// A failed transition leaves the task untouched; `Task`'s transition
    /// methods check before they write.
    pub fn update<T>(
        &self,
        task_id: TaskId,
        change: impl FnOnce(&mut Task) -> Result<T, TransitionError>,
    ) -> Result<T, TaskError> {
        let mut entries = self.write();
        let entry = entries
            .by_id
            .get_mut(&task_id)
            .ok_or(TaskError::NotFound(task_id))?;
        Ok(change(&mut entry.task)?)
    }

    /// Count of tasks per status
    pub fn statistics(&self) -> TaskStatistics {
        self.read().by_id.values().map(|e| e.task.status()).collect()
    }

    /// Number of tasks ever created
    pub fn len(&self) -> usize {
        self.read().by_id.len()
    }

    /// Whether no task was ever created
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave a Task half-written, so a
    // poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
