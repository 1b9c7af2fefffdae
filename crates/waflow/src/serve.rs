// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `waflow serve` command implementation.
//!
//! Wires storage, the tenant directory, the ingestion engine, and the
//! webhook HTTP surface together, then runs until interrupted.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use waflow_config::WaflowConfig;
use waflow_core::WaflowError;
use waflow_ingest::{ChannelNotifier, IngestionEngine, Notification, TenantDirectory};
use waflow_storage::Database;
use waflow_webhook::{HealthState, WebhookState, start_server};

/// Runs the `waflow serve` command.
pub async fn run_serve(config: WaflowConfig) -> Result<(), WaflowError> {
    init_tracing(&config.log.level);

    info!("starting waflow serve");

    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;

    let directory = Arc::new(TenantDirectory::new(
        db.clone(),
        Duration::from_secs(config.ingest.tenant_cache_ttl_secs),
    ));

    let (notifier, notifications) = ChannelNotifier::new();
    let engine = Arc::new(IngestionEngine::new(
        db.clone(),
        directory.clone(),
        Arc::new(notifier),
        config.ingest.missing_signature_policy,
        Duration::from_secs(config.ingest.op_timeout_secs),
    ));

    // Notification consumer. Downstream delivery (push, websocket, queue)
    // hangs off this task; the built-in consumer logs the fan-out.
    let consumer = tokio::spawn(consume_notifications(notifications));

    let state = WebhookState {
        engine,
        directory,
        health: HealthState {
            start_time: std::time::Instant::now(),
        },
    };

    tokio::select! {
        result = start_server(&config.server, state) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    consumer.abort();
    db.close().await?;
    info!("waflow stopped");
    Ok(())
}

async fn consume_notifications(
    mut notifications: tokio::sync::mpsc::UnboundedReceiver<Notification>,
) {
    while let Some(notification) = notifications.recv().await {
        debug!(
            tenant_id = %notification.tenant_id,
            kind = notification.kind,
            "event notification"
        );
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("waflow={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
