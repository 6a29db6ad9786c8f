//! Background dispatch and execution of queued tasks

use crate::registry::TaskRegistry;
use crate::TaskError;
use quarry_domain::traits::ExtractionInvoker;
use quarry_domain::{ExtractionResult, TaskId, TaskStatus};
use quarry_normalizer::Normalizer;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

/// Progress note recorded when a task starts running
pub const STARTING_PROGRESS: &str = "Starting extraction...";

/// Everything an execution needs, shared by the dispatcher and the manager
pub(crate) struct Executor<I> {
    pub(crate) registry: TaskRegistry,
    pub(crate) limiter: Arc<Semaphore>,
    invoker: Arc<I>,
    normalizer: Normalizer,
    timeout: Option<Duration>,
}

impl<I> Executor<I>
where
    I: ExtractionInvoker + Send + Sync + 'static,
    I::Error: Display,
{
    pub(crate) fn new(
        invoker: I,
        normalizer: Normalizer,
        max_concurrent_tasks: usize,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            registry: TaskRegistry::new(),
            limiter: Arc::new(Semaphore::new(max_concurrent_tasks)),
            invoker: Arc::new(invoker),
            normalizer,
            timeout,
        }
    }

    /// Run one queued task while holding `permit`
    ///
    /// Never fails: every outcome is written to the registry. The terminal
    /// status is recorded before the permit is released.
    pub(crate) async fn execute(&self, task_id: TaskId, permit: OwnedSemaphorePermit) {
        let started = self.registry.update(task_id, |task| {
            if task.status() != TaskStatus::Pending {
                return Ok(None);
            }
            task.start(STARTING_PROGRESS)?;
            Ok(Some(task.question().to_string()))
        });

        let question = match started {
            Ok(Some(question)) => question,
            Ok(None) => {
                debug!("Task {} is no longer pending; skipping", task_id);
                return;
            }
            Err(e) => {
                error!("Task {} could not be started: {}", task_id, e);
                return;
            }
        };

        info!("Executing task {}", task_id);

        let recorded = match self.extract(&question).await {
            Ok(result) => self
                .registry
                .update(task_id, |task| task.complete(result))
                .map(|_| info!("Task {} completed successfully", task_id)),
            Err(e) => {
                let message = e.to_string();
                error!("Task {} failed: {}", task_id, message);
                self.registry.update(task_id, |task| task.fail(message))
            }
        };

        if let Err(e) = recorded {
            error!("Task {} outcome could not be recorded: {}", task_id, e);
        }

        drop(permit);
    }

    /// Invoke and normalize on the blocking pool, honoring the deadline
    pub(crate) async fn extract(&self, question: &str) -> Result<ExtractionResult, TaskError> {
        let invoker = Arc::clone(&self.invoker);
        let normalizer = self.normalizer.clone();
        let question = question.to_string();

        let handle = tokio::task::spawn_blocking(move || {
            invoker
                .invoke(&question)
                .map(|output| normalizer.normalize(&output, &question))
                .map_err(|e| e.to_string())
        });

        let joined = match self.timeout {
            // Dropping the handle detaches the blocking call; its output is discarded.
            Some(limit) => tokio::time::timeout(limit, handle).await.map_err(|_| {
                warn!(
                    "Extraction abandoned after {}s; the blocking call keeps running outside the concurrency limit",
                    limit.as_secs()
                );
                TaskError::Timeout(limit.as_secs())
            })?,
            None => handle.await,
        };

        match joined {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(cause)) => Err(TaskError::Extraction(cause)),
            Err(e) if e.is_panic() => Err(TaskError::Extraction("invoker panicked".to_string())),
            Err(e) => Err(TaskError::Extraction(e.to_string())),
        }
    }
}

/// Drain the submission queue, one concurrency slot per execution
///
/// Runs until every sender is dropped.
pub(crate) async fn run_dispatcher<I>(executor: Arc<Executor<I>>, mut queue: UnboundedReceiver<TaskId>)
where
    I: ExtractionInvoker + Send + Sync + 'static,
    I::Error: Display,
{
    info!(
        "Task dispatcher started (max concurrent: {})",
        executor.limiter.available_permits()
    );

    while let Some(task_id) = queue.recv().await {
        if executor.registry.status(task_id) != Some(TaskStatus::Pending) {
            debug!("Task {} is no longer pending; not scheduling", task_id);
            continue;
        }

        let permit = match Arc::clone(&executor.limiter).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Concurrency limiter closed; dispatcher stopping");
                break;
            }
        };

        let executor = Arc::clone(&executor);
        tokio::spawn(async move {
            executor.execute(task_id, permit).await;
        });
    }

    info!(
        "Task dispatcher stopped. Final statistics: {}",
        executor.registry.statistics().summary()
    );
}
