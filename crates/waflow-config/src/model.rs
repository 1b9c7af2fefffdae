// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Waflow ingestion engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, producing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Waflow configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WaflowConfig {
    /// Webhook HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Ingestion pipeline settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Webhook HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8443
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode (recommended).
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "waflow.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Policy for webhook requests that carry no signature header at all.
///
/// The platform is inconsistent here, so the choice is configurable:
/// `allow` treats a missing header as `Skipped` (best-effort operation),
/// `reject` treats it as a signature failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSignaturePolicy {
    Allow,
    Reject,
}

/// Ingestion pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Tenant directory cache time-to-live in seconds.
    ///
    /// A credential rotation becomes visible after at most one TTL.
    #[serde(default = "default_tenant_cache_ttl_secs")]
    pub tenant_cache_ttl_secs: u64,

    /// Bounded timeout for each store operation, in seconds.
    #[serde(default = "default_op_timeout_secs")]
    pub op_timeout_secs: u64,

    /// What to do with requests that have no signature header.
    #[serde(default = "default_missing_signature_policy")]
    pub missing_signature_policy: MissingSignaturePolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            tenant_cache_ttl_secs: default_tenant_cache_ttl_secs(),
            op_timeout_secs: default_op_timeout_secs(),
            missing_signature_policy: default_missing_signature_policy(),
        }
    }
}

fn default_tenant_cache_ttl_secs() -> u64 {
    300
}

fn default_op_timeout_secs() -> u64 {
    5
}

fn default_missing_signature_policy() -> MissingSignaturePolicy {
    MissingSignaturePolicy::Allow
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
