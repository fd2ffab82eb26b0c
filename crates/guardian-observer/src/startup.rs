//! Observer server startup helper for embedding in the engine binary.
//!
//! [`spawn_observer`] binds the listener eagerly, so an address that is
//! invalid or in use fails startup, then serves on a background Tokio task.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError, bind, start_server};
use crate::state::AppState;

/// Errors that can occur when spawning the Observer server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind and spawn the Observer HTTP server on a background task.
///
/// The server stops accepting connections when `shutdown` resolves and
/// the task finishes once in-flight requests complete. Open `WebSocket`
/// connections close when their observer channel closes.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the listener cannot bind.
pub async fn spawn_observer<F>(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<JoinHandle<()>, StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = bind(config).await?;

    let handle = tokio::spawn(async move {
        if let Err(e) = start_server(listener, state, shutdown).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(port = config.port, "Observer server spawned on background task");

    Ok(handle)
}
