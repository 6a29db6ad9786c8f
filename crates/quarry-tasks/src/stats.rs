//! Task statistics

use quarry_domain::TaskStatus;
use serde::{Deserialize, Serialize};

/// Count of tasks per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatistics {
    /// All tasks ever created
    pub total: usize,
    /// Waiting for a slot
    pub pending: usize,
    /// In flight
    pub running: usize,
    /// Finished with a result
    pub completed: usize,
    /// Finished with an error
    pub failed: usize,
    /// Cancelled before running
    pub cancelled: usize,
}

impl TaskStatistics {
    /// Create empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one task in the given status
    pub fn record(&mut self, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::Running => self.running += 1,
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Failed => self.failed += 1,
            TaskStatus::Cancelled => self.cancelled += 1,
        }
    }

    /// Count for one status
    pub fn count(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::Running => self.running,
            TaskStatus::Completed => self.completed,
            TaskStatus::Failed => self.failed,
            TaskStatus::Cancelled => self.cancelled,
        }
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} tasks: {} pending, {} running, {} completed, {} failed, {} cancelled",
            self.total, self.pending, self.running, self.completed, self.failed, self.cancelled
        )
    }
}

impl FromIterator<TaskStatus> for TaskStatistics {
    fn from_iter<T: IntoIterator<Item = TaskStatus>>(iter: T) -> Self {
        let mut stats = Self::new();
        for status in iter {
            stats.record(status);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_sum_to_total() {
        let stats: TaskStatistics = [
            TaskStatus::Completed,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Pending,
        ]
        .into_iter()
        .collect();

        assert_eq!(stats.total, 4);
        assert_eq!(stats.count(TaskStatus::Completed), 2);
        let sum: usize = TaskStatus::ALL.iter().map(|s| stats.count(*s)).sum();
        assert_eq!(sum, stats.total);
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(TaskStatistics::new()).unwrap();
        for key in ["total", "pending", "running", "completed", "failed", "cancelled"] {
            assert_eq!(value[key], serde_json::json!(0), "missing {}", key);
        }
    }

    #[test]
    fn test_summary() {
        let stats: TaskStatistics = [TaskStatus::Running].into_iter().collect();
        assert_eq!(
            stats.summary(),
            "1 tasks: 0 pending, 1 running, 0 completed, 0 failed, 0 cancelled"
        );
    }
}
