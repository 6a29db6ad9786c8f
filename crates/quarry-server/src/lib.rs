//! Quarry Server
//!
//! HTTP front end for question-driven extraction. Wires the Steel browser
//! client, the OpenAI-compatible LLM provider, the agent invoker and the
//! normalizer into a bounded task manager, and exposes it over axum.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use config::{ConfigError, ServerConfig};
use handlers::{create_router, AppState};
use quarry_agent::{AgentInvoker, SteelClient};
use quarry_llm::OpenAiProvider;
use quarry_normalizer::Normalizer;
use quarry_tasks::TaskManager;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),

    /// A collaborator could not be constructed
    #[error("Startup failed: {0}")]
    Startup(String),
}

/// Install the global tracing subscriber
///
/// Level defaults to `info`; `RUST_LOG` overrides it.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Ignore a second install, e.g. when embedded in tests.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Start the HTTP server
///
/// Builds every collaborator from the validated configuration and serves
/// until Ctrl-C.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    info!("Starting Quarry server");
    info!("Bind address: {}", config.bind_addr());
    info!("Model: {} at {}", config.llm.model, config.llm.base_url);
    info!("OpenAI API key configured: {}", !config.llm.api_key.is_empty());
    info!(
        "Steel browser: {} (API key configured: {})",
        config.browser.api_base(),
        config.browser.api_key().is_some()
    );
    info!("Max concurrent tasks: {}", config.tasks.max_concurrent_tasks);
    match config.tasks.extraction_timeout_secs {
        Some(secs) => info!("Extraction timeout: {} seconds", secs),
        None => warn!("No extraction timeout configured; a hung agent holds its slot"),
    }

    let sessions = SteelClient::new(config.browser.clone())
        .map_err(|e| ServerError::Startup(e.to_string()))?;
    let llm = OpenAiProvider::new(config.llm.clone())
        .map_err(|e| ServerError::Startup(e.to_string()))?;
    let invoker = AgentInvoker::new(sessions, llm, config.agent.clone())
        .map_err(|e| ServerError::Startup(e.to_string()))?;
    let normalizer = Normalizer::new(config.normalizer.clone());

    let tasks = TaskManager::new(invoker, normalizer, config.tasks.clone())
        .map_err(|e| ServerError::Startup(e.to_string()))?;

    let app = create_router(AppState { tasks });

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Quarry listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    info!("Quarry server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
