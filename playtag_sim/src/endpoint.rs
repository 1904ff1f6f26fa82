//! HTTP exposition of the Prometheus registry.
//!
//! - `GET /metrics`: text exposition format
//! - `GET /health`: liveness probe

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use playtag_core::PrometheusSink;
use playtag_env::ShutdownListener;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("failed to bind metrics endpoint on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("metrics endpoint failed: {0}")]
    Serve(#[from] std::io::Error),
}

/// Builds the router serving `sink`.
pub fn router(sink: Arc<PrometheusSink>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .with_state(sink)
}

async fn metrics(State(sink): State<Arc<PrometheusSink>>) -> Response {
    match sink.encode_text() {
        Ok(body) => ([(header::CONTENT_TYPE, sink.content_type())], body).into_response(),
        Err(e) => {
            warn!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Binds `addr`. Binding happens before any agent starts so a busy port
/// aborts startup.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, EndpointError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| EndpointError::Bind { addr, source })
}

/// Serves until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    sink: Arc<PrometheusSink>,
    mut shutdown: ShutdownListener,
) -> Result<(), EndpointError> {
    if let Ok(addr) = listener.local_addr() {
        info!("Serving metrics on http://{}/metrics", addr);
    }

    axum::serve(listener, router(sink))
        .with_graceful_shutdown(async move { shutdown.triggered().await })
        .await?;
    Ok(())
}
