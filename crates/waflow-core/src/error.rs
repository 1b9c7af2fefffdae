// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Waflow ingestion engine.

use thiserror::Error;

/// The primary error type used across all Waflow crates.
///
/// Benign ingestion outcomes (duplicates, stale status updates, missing
/// reaction targets) are NOT errors -- they are expressed as outcome enums
/// on the individual store operations. This type covers genuine failures.
#[derive(Debug, Error)]
pub enum WaflowError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A webhook payload was structurally invalid or missing required fields.
    ///
    /// Malformed payloads abort only the sub-event that carried them; sibling
    /// events in the same request continue processing.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Webhook surface errors (bind failure, serve failure).
    #[error("webhook error: {message}")]
    Webhook {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    ///
    /// Every store and notifier call carries a bounded timeout; a timeout is
    /// recoverable and scoped to the single event that hit it.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
