//! API server lifecycle: bind, spawn `axum::serve` in the background, and
//! return a handle whose shutdown channel triggers a graceful stop.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::api_router;
use crate::core_state::CoreState;

// ═══════════════════════════════════════════════════════════
// Public types
// ═══════════════════════════════════════════════════════════

/// Metadata for a running server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerSession {
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: SocketAddr, reason: String },
    #[error("Failed to get server address: {0}")]
    LocalAddr(String),
}

/// Handle to a running API server.
pub struct ApiServer {
    pub session: ServerSession,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ApiServer {
    /// Signal a graceful shutdown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait for the serve task to finish (after `shutdown`, or on error).
    pub async fn wait(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("API server task failed: {e}");
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

/// Bind `ip:port` (port 0 picks an ephemeral port), build the router and
/// spawn the server in a background tokio task.
pub async fn start_api_server(
    core: Arc<CoreState>,
    ip: IpAddr,
    port: u16,
) -> Result<ApiServer, ServerError> {
    let bind_addr = SocketAddr::new(ip, port);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| ServerError::Bind {
            addr: bind_addr,
            reason: e.to_string(),
        })?;

    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::LocalAddr(e.to_string()))?;

    let app = api_router(core);

    let session = ServerSession {
        server_addr: addr.to_string(),
        port: addr.port(),
        started_at: chrono::Utc::now().to_rfc3339(),
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
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
    use std::net::Ipv4Addr;

    use super::*;
    use crate::advisory::MockCompletionClient;
    use crate::core_state::test_state;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn start_and_stop_server() {
        let (core, _dir) = test_state(Arc::new(MockCompletionClient::failing()));
        let mut server = start_api_server(core, LOCALHOST, 0)
            .await
            .expect("server should start");
        assert!(server.session.port > 0);

        let url = format!("http://127.0.0.1:{}/api/health", server.session.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        server.shutdown();
        server.wait().await;
    }

    #[tokio::test]
    async fn protected_route_rejects_anonymous_over_http() {
        let (core, _dir) = test_state(Arc::new(MockCompletionClient::failing()));
        let mut server = start_api_server(core, LOCALHOST, 0).await.unwrap();
        let port = server.session.port;

        let url = format!("http://127.0.0.1:{port}/api/appointments/my-appointments");
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/nonexistent"))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        server.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let (core, _dir) = test_state(Arc::new(MockCompletionClient::failing()));
        let mut server = start_api_server(core, LOCALHOST, 0).await.unwrap();
        server.shutdown();
        server.shutdown(); // Second call should be safe
        server.wait().await;
    }

    #[tokio::test]
    async fn port_in_use_is_bind_error() {
        let (core, _dir) = test_state(Arc::new(MockCompletionClient::failing()));
        let mut first = start_api_server(core.clone(), LOCALHOST, 0).await.unwrap();
        let taken = first.session.port;
        let second = start_api_server(core, LOCALHOST, taken).await;
        assert!(matches!(second, Err(ServerError::Bind { .. })));
        first.shutdown();
    }
}
