//! Integration tests for the TaskManager

use quarry_domain::traits::ExtractionInvoker;
use quarry_domain::{AgentOutput, Task, TaskId, TaskStatus, DEFAULT_SOURCE_URL};
use quarry_normalizer::Normalizer;
use quarry_tasks::{TaskError, TaskManager, TaskManagerConfig, STARTING_PROGRESS};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Invoker whose behavior is chosen by the question text
///
/// - `fail:...` returns an error
/// - `panic:...` panics
/// - `stuck:...` sleeps for two seconds, then succeeds
/// - anything else succeeds with a fenced JSON answer
#[derive(Clone, Default)]
struct ScriptedInvoker {
    calls: Arc<AtomicUsize>,
}

impl ScriptedInvoker {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ExtractionInvoker for ScriptedInvoker {
    type Error = String;

    fn invoke(&self, question: &str) -> Result<AgentOutput, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if question.starts_with("fail:") {
            return Err("browser session refused".to_string());
        }
        if question.starts_with("panic:") {
            panic!("agent crashed");
        }
        if question.starts_with("stuck:") {
            std::thread::sleep(Duration::from_secs(2));
        }

        Ok(AgentOutput::from(format!(
            "Done.\n```json\n{{\"url\": \"https://www.reddit.com/answers/{}\", \"sections\": [{{\"heading\": \"h\", \"content\": [\"c\"]}}]}}\n```",
            question.len()
        )))
    }
}

#[derive(Default)]
struct GateState {
    open: bool,
    in_flight: usize,
    max_in_flight: usize,
}

/// Invoker that blocks every call until the gate opens
#[derive(Clone, Default)]
struct GatedInvoker {
    state: Arc<(Mutex<GateState>, Condvar)>,
}

impl GatedInvoker {
    fn open(&self) {
        let (lock, condvar) = &*self.state;
        lock.lock().unwrap().open = true;
        condvar.notify_all();
    }

    fn in_flight(&self) -> usize {
        self.state.0.lock().unwrap().in_flight
    }

    fn max_in_flight(&self) -> usize {
        self.state.0.lock().unwrap().max_in_flight
    }
}

impl ExtractionInvoker for GatedInvoker {
    type Error = String;

    fn invoke(&self, question: &str) -> Result<AgentOutput, Self::Error> {
        let (lock, condvar) = &*self.state;
        let mut state = lock.lock().unwrap();
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);

        while !state.open {
            state = condvar.wait(state).unwrap();
        }

        state.in_flight -= 1;
        Ok(AgentOutput::from(format!("{{\"question\": \"{}\"}}", question)))
    }
}

fn manager<I>(invoker: I, max_concurrent_tasks: usize) -> TaskManager<I>
where
    I: ExtractionInvoker + Send + Sync + 'static,
    I::Error: std::fmt::Display,
{
    let config = TaskManagerConfig {
        max_concurrent_tasks,
        ..Default::default()
    };
    TaskManager::new(invoker, Normalizer::default(), config).unwrap()
}

async fn wait_until<I>(manager: &TaskManager<I>, task_id: TaskId, done: impl Fn(&Task) -> bool) -> Task
where
    I: ExtractionInvoker + Send + Sync + 'static,
    I::Error: std::fmt::Display,
{
    for _ in 0..500 {
        let task = manager.get(task_id).unwrap();
        if done(&task) {
            return task;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {} never reached the expected state", task_id);
}

async fn wait_terminal<I>(manager: &TaskManager<I>, task_id: TaskId) -> Task
where
    I: ExtractionInvoker + Send + Sync + 'static,
    I::Error: std::fmt::Display,
{
    wait_until(manager, task_id, |t| t.status().is_terminal()).await
}

#[tokio::test]
async fn test_create_returns_pending_task() {
    let manager = manager(ScriptedInvoker::default(), 5);

    let task_id = manager.create("what is X?");
    let task = manager.get(task_id).unwrap();

    assert_eq!(task.id(), task_id);
    assert_eq!(task.status(), TaskStatus::Pending);
    assert_eq!(task.question(), "what is X?");
    assert!(task.result().is_none());
    assert!(task.error().is_none());
    assert!(task.updated_at() >= task.created_at());
}

#[tokio::test]
async fn test_get_unknown_task() {
    let manager = manager(ScriptedInvoker::default(), 5);
    assert!(manager.get(TaskId::new()).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_submitted_task_completes_with_normalized_result() {
    let manager = manager(ScriptedInvoker::default(), 5);

    let task_id = manager.create("abc");
    manager.submit(task_id);
    let task = wait_terminal(&manager, task_id).await;

    assert_eq!(task.status(), TaskStatus::Completed);
    assert!(task.error().is_none());
    assert_eq!(task.progress(), Some(STARTING_PROGRESS));

    let result = task.result().unwrap();
    assert_eq!(result.url, "https://www.reddit.com/answers/3");
    assert_eq!(result.question, "abc");
    assert_eq!(result.sections.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_invoker_fails_task_and_frees_slot() {
    let invoker = ScriptedInvoker::default();
    let manager = manager(invoker.clone(), 1);

    let failing = manager.create("fail: please");
    manager.submit(failing);
    let task = wait_terminal(&manager, failing).await;

    assert_eq!(task.status(), TaskStatus::Failed);
    assert!(task.result().is_none());
    assert_eq!(
        task.error(),
        Some("Extraction failed: browser session refused")
    );

    let next = manager.create("next");
    manager.submit(next);
    assert_eq!(wait_terminal(&manager, next).await.status(), TaskStatus::Completed);
    assert_eq!(invoker.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_invoker_fails_task_and_frees_slot() {
    let manager = manager(ScriptedInvoker::default(), 1);

    let crashing = manager.create("panic: now");
    manager.submit(crashing);
    let task = wait_terminal(&manager, crashing).await;

    assert_eq!(task.status(), TaskStatus::Failed);
    assert!(task.error().unwrap().contains("panicked"));

    let next = manager.create("next");
    manager.submit(next);
    assert_eq!(wait_terminal(&manager, next).await.status(), TaskStatus::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_semantics() {
    let manager = manager(ScriptedInvoker::default(), 5);

    let task_id = manager.create("q");
    assert!(manager.cancel(task_id));
    assert!(!manager.cancel(task_id));
    assert!(!manager.cancel(TaskId::new()));
    assert_eq!(manager.get(task_id).unwrap().status(), TaskStatus::Cancelled);

    let done = manager.create("done");
    manager.submit(done);
    wait_terminal(&manager, done).await;
    assert!(!manager.cancel(done));
    assert_eq!(manager.get(done).unwrap().status(), TaskStatus::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_queued_task_never_runs() {
    let invoker = GatedInvoker::default();
    let manager = manager(invoker.clone(), 1);

    let first = manager.create("first");
    manager.submit(first);
    wait_until(&manager, first, |t| t.status() == TaskStatus::Running).await;

    let queued = manager.create("queued");
    manager.submit(queued);
    assert!(manager.cancel(queued));

    invoker.open();
    assert_eq!(wait_terminal(&manager, first).await.status(), TaskStatus::Completed);

    // Give the dispatcher a chance to pick up the cancelled id.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let task = manager.get(queued).unwrap();
    assert_eq!(task.status(), TaskStatus::Cancelled);
    assert!(task.progress().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_running_never_exceeds_limit() {
    let invoker = GatedInvoker::default();
    let manager = manager(invoker.clone(), 2);

    let ids: Vec<TaskId> = (0..6)
        .map(|i| {
            let task_id = manager.create(format!("question {}", i));
            manager.submit(task_id);
            task_id
        })
        .collect();

    for _ in 0..500 {
        if invoker.in_flight() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    for _ in 0..20 {
        let stats = manager.statistics();
        assert!(stats.running <= 2, "running = {}", stats.running);
        assert!(manager.list(Some(TaskStatus::Running), 100).len() <= 2);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(manager.statistics().running, 2);
    assert_eq!(manager.statistics().pending, 4);

    invoker.open();
    for task_id in ids {
        assert_eq!(wait_terminal(&manager, task_id).await.status(), TaskStatus::Completed);
    }
    assert!(invoker.max_in_flight() <= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_list_completed_limit_one_returns_newest() {
    let manager = manager(ScriptedInvoker::default(), 5);

    let mut completed = Vec::new();
    for question in ["one", "two", "three"] {
        let task_id = manager.create(question);
        manager.submit(task_id);
        wait_terminal(&manager, task_id).await;
        completed.push(task_id);
    }
    manager.create("still pending");

    let listed = manager.list(Some(TaskStatus::Completed), 1);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id(), completed[2]);

    let all = manager.list(None, 100);
    assert_eq!(all.len(), 4);
    assert_eq!(all[0].status(), TaskStatus::Pending);
    assert!(all.windows(2).all(|w| w[0].created_at() >= w[1].created_at()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_statistics_scenario() {
    let manager = manager(ScriptedInvoker::default(), 5);

    let ok = manager.create("ok");
    let failing = manager.create("fail: x");
    manager.create("left pending");

    manager.submit(ok);
    manager.submit(failing);
    wait_terminal(&manager, ok).await;
    wait_terminal(&manager, failing).await;

    let stats = manager.statistics();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.running, 0);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.cancelled, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deadline_fails_stuck_task_and_next_runs() {
    let config = TaskManagerConfig {
        max_concurrent_tasks: 1,
        extraction_timeout_secs: Some(1),
    };
    let manager = TaskManager::new(ScriptedInvoker::default(), Normalizer::default(), config).unwrap();

    let stuck = manager.create("stuck: forever");
    let next = manager.create("next");
    manager.submit(stuck);
    manager.submit(next);

    let task = wait_terminal(&manager, stuck).await;
    assert_eq!(task.status(), TaskStatus::Failed);
    assert_eq!(task.error(), Some("Extraction failed: timed out after 1s"));

    assert_eq!(wait_terminal(&manager, next).await.status(), TaskStatus::Completed);
}

#[tokio::test]
async fn test_submit_unknown_task_is_ignored() {
    let manager = manager(ScriptedInvoker::default(), 5);
    manager.submit(TaskId::new());
    assert_eq!(manager.statistics().total, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_extract_now() {
    let manager = manager(ScriptedInvoker::default(), 2);

    let result = manager.extract_now("abcd").await.unwrap();
    assert_eq!(result.url, "https://www.reddit.com/answers/4");
    assert_eq!(result.question, "abcd");

    let err = manager.extract_now("fail: sync").await.unwrap_err();
    assert!(matches!(err, TaskError::Extraction(ref m) if m == "browser session refused"));

    // The synchronous path never touches the registry.
    assert_eq!(manager.statistics().total, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unrecoverable_output_completes_with_empty_record() {
    struct Rambling;

    impl ExtractionInvoker for Rambling {
        type Error = String;

        fn invoke(&self, _question: &str) -> Result<AgentOutput, Self::Error> {
            Ok(AgentOutput::from("I could not find the answers page."))
        }
    }

    let manager = manager(Rambling, 1);
    let task_id = manager.create("q");
    manager.submit(task_id);

    let task = wait_terminal(&manager, task_id).await;
    assert_eq!(task.status(), TaskStatus::Completed);
    let result = task.result().unwrap();
    assert_eq!(result.url, DEFAULT_SOURCE_URL);
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_clones_share_state() {
    let manager = manager(ScriptedInvoker::default(), 3);
    let clone = manager.clone();

    let task_id = manager.create("shared");
    assert!(clone.get(task_id).is_some());
    assert_eq!(clone.max_concurrent_tasks(), 3);
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let config = TaskManagerConfig {
        max_concurrent_tasks: 0,
        ..Default::default()
    };
    let result = TaskManager::new(ScriptedInvoker::default(), Normalizer::default(), config);
    assert!(matches!(result, Err(TaskError::Config(_))));
}

#[test]
fn test_new_outside_runtime_is_config_error() {
    let result = TaskManager::new(
        ScriptedInvoker::default(),
        Normalizer::default(),
        TaskManagerConfig::default(),
    );
    assert!(matches!(result, Err(TaskError::Config(_))));
}
