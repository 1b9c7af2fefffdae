// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading and validation.

use waflow_config::model::MissingSignaturePolicy;
use waflow_config::{ConfigError, load_and_validate_str};

#[test]
fn full_config_round_trip() {
    let config = load_and_validate_str(
        r#"
        [server]
        host = "0.0.0.0"
        port = 8080

        [storage]
        database_path = "/var/lib/waflow/waflow.db"
        wal_mode = true

        [ingest]
        tenant_cache_ttl_secs = 120
        op_timeout_secs = 10
        missing_signature_policy = "reject"

        [log]
        level = "debug"
        "#,
    )
    .unwrap();

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.storage.database_path, "/var/lib/waflow/waflow.db");
    assert_eq!(config.ingest.tenant_cache_ttl_secs, 120);
    assert_eq!(
        config.ingest.missing_signature_policy,
        MissingSignaturePolicy::Reject
    );
    assert_eq!(config.log.level, "debug");
}

#[test]
fn typo_in_key_produces_suggestion() {
    let errors = load_and_validate_str(
        r#"
        [storage]
        databse_path = "waflow.db"
        "#,
    )
    .unwrap_err();

    let has_suggestion = errors.iter().any(|e| match e {
        ConfigError::UnknownKey { suggestion, .. } => {
            suggestion.as_deref() == Some("database_path")
        }
        _ => false,
    });
    assert!(has_suggestion, "expected a `database_path` suggestion");
}

#[test]
fn invalid_policy_value_is_rejected() {
    let result = load_and_validate_str(
        r#"
        [ingest]
        missing_signature_policy = "maybe"
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn semantic_validation_runs_after_deserialization() {
    let errors = load_and_validate_str(
        r#"
        [ingest]
        op_timeout_secs = 0
        "#,
    )
    .unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| e.to_string().contains("op_timeout_secs"))
    );
}
