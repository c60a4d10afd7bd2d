//! HTTP query endpoint.
//!
//! `GET /metrics` accepts `from`, `to` (unix seconds) and `limit` and answers
//! with a JSON array (range and limit modes) or a single snapshot object.
//! `GET /health` reports liveness and the number of retained snapshots.

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::store::SnapshotStore;

pub use handlers::{health, metrics};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SnapshotStore>,
    started: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        AppState {
            store,
            started: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub snapshots: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .with_state(state)
}

pub struct MetricsServer {
    listener: TcpListener,
    state: AppState,
}

impl MetricsServer {
    /// Binds the listener. Port 0 lets the OS choose; see [`Self::local_addr`].
    pub async fn bind(addr: SocketAddr, state: AppState) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(MetricsServer { listener, state })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until `cancel` fires, then drains in-flight requests.
    pub async fn serve(self, cancel: CancellationToken) -> std::io::Result<()> {
        let addr = self.local_addr()?;
        info!("serving metrics on http://{}", addr);
        let result = axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(cancel.cancelled_owned())
            .await;
        match &result {
            Ok(()) => info!("metrics server on {} stopped", addr),
            Err(e) => error!("metrics server failed, {}", e),
        }
        result
    }
}
