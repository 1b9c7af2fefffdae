// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the webhook surface.
//!
//! The event receiver acknowledges before processing: the platform retries
//! (and eventually disables) webhooks that respond slowly, so the raw body
//! is handed to the engine on a spawned task and 200 goes back immediately.
//! Idempotent ingestion makes the resulting at-least-once delivery safe.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use waflow_ingest::{SIGNATURE_HEADER, TenantKey};

use crate::server::WebhookState;

/// Body returned for every POST acknowledgment.
const ACK_BODY: &str = "EVENT_RECEIVED";

/// Query parameters of the platform's verification handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode", default)]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge", default)]
    pub challenge: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /webhook
///
/// Platform verification handshake: echo the challenge when the verify
/// token belongs to an active tenant and the mode is `subscribe`.
pub async fn verify_webhook(
    State(state): State<WebhookState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let (Some(mode), Some(token), Some(challenge)) =
        (params.mode, params.verify_token, params.challenge)
    else {
        return (StatusCode::BAD_REQUEST, "missing hub.* parameters").into_response();
    };

    if mode != "subscribe" {
        return (StatusCode::FORBIDDEN, "unsupported hub.mode").into_response();
    }

    match state.directory.resolve(TenantKey::VerifyToken(&token)).await {
        Ok(Some(tenant)) => {
            tracing::info!(tenant_id = %tenant.id, "webhook verification handshake succeeded");
            // The challenge must be echoed verbatim as plain text.
            (StatusCode::OK, challenge).into_response()
        }
        Ok(None) => {
            tracing::warn!("webhook verification with unknown verify token");
            (StatusCode::FORBIDDEN, "verify token mismatch").into_response()
        }
        Err(error) => {
            tracing::error!(%error, "tenant lookup failed during verification");
            (StatusCode::INTERNAL_SERVER_ERROR, "lookup failed").into_response()
        }
    }
}

/// POST /webhook
///
/// Accepts the raw event payload and acknowledges immediately. Processing
/// happens off the request path; all failures past this point are logged,
/// never surfaced to the platform.
pub async fn receive_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let engine = state.engine.clone();
    tokio::spawn(async move {
        if let Err(error) = engine.ingest(&body, signature.as_deref()).await {
            tracing::error!(%error, "webhook ingestion failed");
        }
    });

    (StatusCode::OK, ACK_BODY)
}

/// GET /health
pub async fn get_health(State(state): State<WebhookState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}
