//! Task manager: the public face of the registry, queue and limiter

use crate::worker::{run_dispatcher, Executor};
use crate::{TaskError, TaskManagerConfig, TaskStatistics};
use quarry_domain::traits::ExtractionInvoker;
use quarry_domain::{ExtractionResult, Task, TaskId, TaskStatus};
use quarry_normalizer::Normalizer;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{info, warn};

/// Bounded-concurrency manager for extraction tasks
///
/// Cloning is cheap; clones share the same registry, queue and limiter.
/// The background dispatcher stops once the last clone is dropped.
///
/// # Examples
///
/// ```
/// use quarry_domain::traits::ExtractionInvoker;
/// use quarry_domain::AgentOutput;
/// use quarry_normalizer::Normalizer;
/// use quarry_tasks::{TaskManager, TaskManagerConfig};
///
/// struct Echo;
///
/// impl ExtractionInvoker for Echo {
///     type Error = String;
///
///     fn invoke(&self, question: &str) -> Result<AgentOutput, String> {
///         Ok(AgentOutput::from(format!("{{\"question\": \"{}\"}}", question)))
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let manager = TaskManager::new(Echo, Normalizer::default(), TaskManagerConfig::default()).unwrap();
/// let task_id = manager.create("how many planets?");
/// manager.submit(task_id);
/// assert!(manager.get(task_id).is_some());
/// # }
/// ```
pub struct TaskManager<I> {
    executor: Arc<Executor<I>>,
    queue: UnboundedSender<TaskId>,
    config: TaskManagerConfig,
}

impl<I> Clone for TaskManager<I> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            queue: self.queue.clone(),
            config: self.config.clone(),
        }
    }
}

impl<I> TaskManager<I>
where
    I: ExtractionInvoker + Send + Sync + 'static,
    I::Error: Display,
{
    /// Create a manager and start its dispatcher
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Config` if the configuration is invalid or no
    /// Tokio runtime is running
    pub fn new(
        invoker: I,
        normalizer: Normalizer,
        config: TaskManagerConfig,
    ) -> Result<Self, TaskError> {
        config.validate().map_err(TaskError::Config)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            TaskError::Config("TaskManager must be created inside a Tokio runtime".to_string())
        })?;

        let executor = Arc::new(Executor::new(
            invoker,
            normalizer,
            config.max_concurrent_tasks,
            config.extraction_timeout(),
        ));
        let (queue, receiver) = mpsc::unbounded_channel();
        runtime.spawn(run_dispatcher(Arc::clone(&executor), receiver));

        info!(
            "TaskManager initialized with max {} concurrent tasks",
            config.max_concurrent_tasks
        );

        Ok(Self {
            executor,
            queue,
            config,
        })
    }

    /// Create a pending task and return its id
    pub fn create(&self, question: impl Into<String>) -> TaskId {
        let task = Task::new(TaskId::new(), question);
        let task_id = task.id();
        info!("Created task {} for question: {}", task_id, task.question());
        self.executor.registry.insert(task);
        task_id
    }

    /// Queue a task for execution without waiting for it
    ///
    /// Unknown ids are logged and ignored.
    pub fn submit(&self, task_id: TaskId) {
        if self.executor.registry.status(task_id).is_none() {
            warn!("Task {} not found; not submitting", task_id);
            return;
        }

        match self.queue.send(task_id) {
            Ok(()) => info!("Task {} submitted for execution", task_id),
            Err(_) => warn!("Task dispatcher is not running; task {} stays pending", task_id),
        }
    }

    /// Snapshot of one task
    pub fn get(&self, task_id: TaskId) -> Option<Task> {
        self.executor.registry.get(task_id)
    }

    /// Newest-first snapshot of up to `limit` tasks, optionally filtered by status
    pub fn list(&self, status: Option<TaskStatus>, limit: usize) -> Vec<Task> {
        self.executor.registry.list(status, limit)
    }

    /// Cancel a pending task
    ///
    /// Returns true only if the task existed and was `Pending`.
    pub fn cancel(&self, task_id: TaskId) -> bool {
        let cancelled = self.executor.registry.update(task_id, |task| {
            if task.status() != TaskStatus::Pending {
                return Ok(Some(task.status()));
            }
            task.cancel()?;
            Ok(None)
        });

        match cancelled {
            Ok(None) => {
                info!("Task {} cancelled", task_id);
                true
            }
            Ok(Some(status)) => {
                warn!("Cannot cancel task {} with status {}", task_id, status);
                false
            }
            Err(e) => {
                warn!("Cannot cancel task {}: {}", task_id, e);
                false
            }
        }
    }

    /// Count of tasks per status
    pub fn statistics(&self) -> TaskStatistics {
        self.executor.registry.statistics()
    }

    /// Configured concurrency bound
    pub fn max_concurrent_tasks(&self) -> usize {
        self.config.max_concurrent_tasks
    }

    /// Get the manager configuration
    pub fn config(&self) -> &TaskManagerConfig {
        &self.config
    }

    /// Run one extraction inline, outside the task registry
    ///
    /// Waits for a concurrency slot like any queued task. Invocation
    /// failures are returned instead of recorded.
    pub async fn extract_now(&self, question: &str) -> Result<ExtractionResult, TaskError> {
        let _permit = Arc::clone(&self.executor.limiter)
            .acquire_owned()
            .await
            .map_err(|_| TaskError::Extraction("concurrency limiter closed".to_string()))?;

        info!("Running synchronous extraction for question: {}", question);
        self.executor.extract(question).await
    }
}
