//! Portal server lifecycle: starts/stops the axum HTTP server that serves
//! `portal_router()`.
//!
//! bind → spawn background task → return handle with shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::api::router::portal_router;
use crate::core_state::CoreState;

// ═══════════════════════════════════════════════════════════
// Public types
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind portal server on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Failed to get server address: {0}")]
    LocalAddr(std::io::Error),
}

/// Metadata of a running portal server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSession {
    pub session_id: String,
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

/// Handle to a running portal server.
pub struct PortalServer {
    pub session: PortalSession,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl PortalServer {
    /// Signal graceful shutdown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Portal server shutdown signal sent");
        }
    }

    /// Wait for the server task to finish in-flight requests and exit.
    pub async fn stopped(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Portal server task failed: {e}");
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

/// Bind `addr` (port 0 picks an ephemeral port), build the portal router
/// and spawn the axum server in a background tokio task.
pub async fn start_portal_server(
    core: Arc<CoreState>,
    addr: SocketAddr,
) -> Result<PortalServer, ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

    let app = portal_router(core);

    let session = PortalSession {
        session_id: Uuid::new_v4().to_string(),
        server_addr: addr.to_string(),
        port: addr.port(),
        started_at: chrono::Utc::now().to_rfc3339(),
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Portal server received shutdown signal");
        };

        tracing::info!(%addr, "Portal server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Portal server error: {e}");
        }

        tracing::info!("Portal server stopped");
    });

    Ok(PortalServer {
        session,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortalConfig;
    use crate::inference::ModelManager;

    fn test_core() -> (Arc<CoreState>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let core = CoreState::new(
            PortalConfig::rooted_at(tmp.path()),
            Arc::new(ModelManager::heuristic_only()),
        );
        core.initialize().unwrap();
        (Arc::new(core), tmp)
    }

    fn loopback() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let (core, _tmp) = test_core();
        let mut server = start_portal_server(core, loopback())
            .await
            .expect("server should start");

        assert!(!server.session.session_id.is_empty());
        assert!(server.session.port > 0);

        let url = format!("http://127.0.0.1:{}/health", server.session.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");

        server.shutdown();
        server.stopped().await;
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (core, _tmp) = test_core();
        let mut server = start_portal_server(core, loopback()).await.unwrap();

        let url = format!("http://127.0.0.1:{}/nope", server.session.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        server.shutdown();
    }

    #[tokio::test]
    async fn shutdown_twice_is_harmless() {
        let (core, _tmp) = test_core();
        let mut server = start_portal_server(core, loopback()).await.unwrap();

        assert!(!server.session.started_at.is_empty());
        assert!(server.session.server_addr.contains(':'));

        server.shutdown();
        server.shutdown();
        server.stopped().await;
        server.stopped().await;
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let (core, _tmp) = test_core();
        let mut first = start_portal_server(core.clone(), loopback()).await.unwrap();
        let taken: SocketAddr = first.session.server_addr.parse().unwrap();

        let err = start_portal_server(core, taken).await.err().unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));

        first.shutdown();
    }
}
