//! HTTP request handlers for the extraction API.
//!
//! Asynchronous task endpoints, the blocking extraction endpoint, and
//! service information, using axum.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use quarry_domain::traits::ExtractionInvoker;
use quarry_domain::{ExtractionResult, Task, TaskId, TaskStatus};
use quarry_tasks::{TaskManager, TaskStatistics};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Display;
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

/// Service name reported by `/health`
pub const SERVICE_NAME: &str = "quarry";

/// Default page size for task listing
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Largest page size for task listing
pub const MAX_LIST_LIMIT: usize = 1000;

/// Shared application state
pub struct AppState<I> {
    /// Task manager shared by every request
    pub tasks: TaskManager<I>,
}

impl<I> Clone for AppState<I> {
    fn clone(&self) -> Self {
        Self {
            tasks: self.tasks.clone(),
        }
    }
}

/// Extraction request body
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Question to search for answers
    pub question: String,
}

/// Response after creating a task
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskCreateResponse {
    /// Id to poll
    pub task_id: TaskId,
    /// Always `pending`
    pub status: TaskStatus,
    /// Human-readable confirmation
    pub message: String,
}

/// Status and result of one task
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    /// Task id
    pub task_id: TaskId,
    /// Current status
    pub status: TaskStatus,
    /// Progress note, if any
    pub progress: Option<String>,
    /// Result, when completed
    pub result: Option<ExtractionResult>,
    /// Error, when failed
    pub error: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last transition timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskStatusResponse {
    fn from(task: Task) -> Self {
        Self {
            task_id: task.id(),
            status: task.status(),
            progress: task.progress().map(str::to_string),
            result: task.result().cloned(),
            error: task.error().map(str::to_string),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// Response after cancelling a task
#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    /// Human-readable confirmation
    pub message: String,
    /// Cancelled task id
    pub task_id: TaskId,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests
    pub status: String,
    /// Service name
    pub service: String,
    /// Crate version
    pub version: String,
}

/// Statistics response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Count of tasks per status
    pub statistics: TaskStatistics,
    /// Configured concurrency bound
    pub max_concurrent_tasks: usize,
}

/// Query parameters for task listing
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Status filter
    pub status: Option<String>,
    /// Page size
    pub limit: Option<i64>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or invalid request
    #[error("{0}")]
    InvalidRequest(String),
    /// Unknown task
    #[error("Task not found")]
    NotFound,
    /// Task is past the point where it can be cancelled
    #[error("Cannot cancel task with status: {0}")]
    NotCancellable(TaskStatus),
    /// Synchronous extraction failed
    #[error("Extraction failed")]
    ExtractionFailed,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::InvalidRequest(_) | AppError::NotCancellable(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::ExtractionFailed => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

fn question_from(
    payload: Result<Json<ExtractionRequest>, JsonRejection>,
) -> Result<String, AppError> {
    let Json(request) = payload?;
    if request.question.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "question must not be empty".to_string(),
        ));
    }
    Ok(request.question)
}

fn parse_task_id(raw: &str) -> Result<TaskId, AppError> {
    TaskId::from_string(raw).map_err(|_| AppError::NotFound)
}

/// POST /api/v1/extract - Create and submit an extraction task
async fn create_task<I>(
    State(state): State<AppState<I>>,
    payload: Result<Json<ExtractionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskCreateResponse>), AppError>
where
    I: ExtractionInvoker + Send + Sync + 'static,
    I::Error: Display,
{
    let question = question_from(payload)?;

    let task_id = state.tasks.create(question);
    state.tasks.submit(task_id);

    Ok((
        StatusCode::ACCEPTED,
        Json(TaskCreateResponse {
            task_id,
            status: TaskStatus::Pending,
            message: "Task created and submitted for processing".to_string(),
        }),
    ))
}

/// GET /api/v1/tasks/:task_id - Status and result of one task
async fn get_task<I>(
    State(state): State<AppState<I>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusResponse>, AppError>
where
    I: ExtractionInvoker + Send + Sync + 'static,
    I::Error: Display,
{
    let task_id = parse_task_id(&task_id)?;
    let task = state.tasks.get(task_id).ok_or(AppError::NotFound)?;
    Ok(Json(task.into()))
}

/// GET /api/v1/tasks - Newest-first task listing
async fn list_tasks<I>(
    State(state): State<AppState<I>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Task>>, AppError>
where
    I: ExtractionInvoker + Send + Sync + 'static,
    I::Error: Display,
{
    let Query(query) = query?;

    let status = match query.status.as_deref() {
        Some(raw) => Some(
            TaskStatus::parse(raw)
                .ok_or_else(|| AppError::InvalidRequest(format!("Invalid status: {}", raw)))?,
        ),
        None => None,
    };

    let limit = match query.limit {
        None => DEFAULT_LIST_LIMIT,
        Some(n) if (1..=MAX_LIST_LIMIT as i64).contains(&n) => n as usize,
        Some(n) => {
            return Err(AppError::InvalidRequest(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LIST_LIMIT, n
            )))
        }
    };

    Ok(Json(state.tasks.list(status, limit)))
}

/// DELETE /api/v1/tasks/:task_id - Cancel a pending task
async fn cancel_task<I>(
    State(state): State<AppState<I>>,
    Path(task_id): Path<String>,
) -> Result<Json<CancelResponse>, AppError>
where
    I: ExtractionInvoker + Send + Sync + 'static,
    I::Error: Display,
{
    let task_id = parse_task_id(&task_id)?;
    let task = state.tasks.get(task_id).ok_or(AppError::NotFound)?;
    if task.status() != TaskStatus::Pending {
        return Err(AppError::NotCancellable(task.status()));
    }

    if !state.tasks.cancel(task_id) {
        // Started between the check and the cancel.
        let status = state
            .tasks
            .get(task_id)
            .map(|t| t.status())
            .unwrap_or(TaskStatus::Running);
        return Err(AppError::NotCancellable(status));
    }

    Ok(Json(CancelResponse {
        message: "Task cancelled successfully".to_string(),
        task_id,
    }))
}

/// POST /api/v1/extract/sync - Blocking extraction
async fn extract_sync<I>(
    State(state): State<AppState<I>>,
    payload: Result<Json<ExtractionRequest>, JsonRejection>,
) -> Result<Json<ExtractionResult>, AppError>
where
    I: ExtractionInvoker + Send + Sync + 'static,
    I::Error: Display,
{
    let question = question_from(payload)?;

    match state.tasks.extract_now(&question).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            error!("Synchronous extraction failed: {}", e);
            Err(AppError::ExtractionFailed)
        }
    }
}

/// GET /health - Liveness check
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/v1/stats - Task statistics
async fn statistics<I>(State(state): State<AppState<I>>) -> Json<StatsResponse>
where
    I: ExtractionInvoker + Send + Sync + 'static,
    I::Error: Display,
{
    Json(StatsResponse {
        statistics: state.tasks.statistics(),
        max_concurrent_tasks: state.tasks.max_concurrent_tasks(),
    })
}

/// GET / - Service information
async fn root() -> Json<Value> {
    Json(json!({
        "service": "Quarry content extraction service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Structured answers extraction through a remote browser and an LLM agent",
        "endpoints": {
            "health": "/health",
            "async_extract": "/api/v1/extract",
            "sync_extract": "/api/v1/extract/sync",
            "task_status": "/api/v1/tasks/{task_id}",
            "list_tasks": "/api/v1/tasks",
            "statistics": "/api/v1/stats"
        }
    }))
}

async fn not_found() -> AppError {
    warn!("Request for unknown route");
    AppError::NotFound
}

/// Create the axum router with all routes
pub fn create_router<I>(state: AppState<I>) -> Router
where
    I: ExtractionInvoker + Send + Sync + 'static,
    I::Error: Display,
{
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/v1/stats", get(statistics::<I>))
        .route("/api/v1/extract", post(create_task::<I>))
        .route("/api/v1/extract/sync", post(extract_sync::<I>))
        .route("/api/v1/tasks", get(list_tasks::<I>))
        .route(
            "/api/v1/tasks/:task_id",
            get(get_task::<I>).delete(cancel_task::<I>),
        )
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
