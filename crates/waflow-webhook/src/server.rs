// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. The surface is
//! deliberately small: the verification handshake, the event receiver, and
//! an unauthenticated health endpoint for process supervision.

use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};
use tower_http::trace::TraceLayer;
use waflow_config::ServerConfig;
use waflow_core::WaflowError;
use waflow_ingest::{IngestionEngine, TenantDirectory};

use crate::handlers;

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub engine: Arc<IngestionEngine>,
    /// Used directly by the verification handshake (no engine involved).
    pub directory: Arc<TenantDirectory>,
    pub health: HealthState,
}

/// Build the webhook router. Split out of [`start_server`] so tests can
/// drive it without binding a socket.
pub fn build_router(state: WebhookState) -> Router {
    Router::new()
        .route(
            "/webhook",
            get(handlers::verify_webhook).post(handlers::receive_webhook),
        )
        .route("/health", get(handlers::get_health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the webhook HTTP server.
///
/// Binds to the configured host:port and serves:
/// - GET /webhook (platform verification handshake)
/// - POST /webhook (event receiver)
/// - GET /health (unauthenticated, for supervision)
pub async fn start_server(config: &ServerConfig, state: WebhookState) -> Result<(), WaflowError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener =
        tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| WaflowError::Webhook {
                message: format!("failed to bind webhook server to {addr}: {e}"),
                source: Some(Box::new(e)),
            })?;

    tracing::info!("Webhook server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| WaflowError::Webhook {
            message: format!("webhook server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
