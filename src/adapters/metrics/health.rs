//! Health Check Server - Liveness, Readiness and Metrics
//!
//! Exposes /live, /ready and /metrics via axum 0.7. Readiness only
//! requires one feed session to be running: the dashboard is useful
//! in degraded mode.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use super::prometheus::FeedMetrics;
use crate::adapters::feeds::task_supervisor::FeedHealth;

/// Shared state behind the probes.
#[derive(Clone)]
pub struct HealthState {
    pub feeds: Vec<Arc<FeedHealth>>,
    pub metrics: Arc<FeedMetrics>,
}

impl HealthState {
    /// Ready when at least one feed has a running session.
    pub fn is_ready(&self) -> bool {
        self.feeds.iter().any(|f| f.is_active())
    }
}

/// Axum-based health and metrics HTTP server.
pub struct HealthServer {
    state: HealthState,
    bind_address: String,
}

impl HealthServer {
    pub fn new(state: HealthState, bind_address: String) -> Self {
        Self {
            state,
            bind_address,
        }
    }

    pub fn router(state: HealthState) -> Router {
        Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .route("/metrics", get(Self::metrics))
            .with_state(state)
    }

    /// Serve until shutdown is signalled.
    #[instrument(skip(self, shutdown_rx), fields(address = %self.bind_address))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Self::router(self.state);
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;

        info!("Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    async fn readiness(State(state): State<HealthState>) -> impl IntoResponse {
        if state.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }

    async fn metrics(State(state): State<HealthState>) -> impl IntoResponse {
        match state.metrics.encode() {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => {
                warn!(error = %e, "Failed to encode metrics");
                (StatusCode::INTERNAL_SERVER_ERROR, String::new())
            }
        }
    }
}
