// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end ingestion testing.
//!
//! `TestHarness` assembles a complete ingestion stack with a temp SQLite
//! database, seeded tenants, and a capturing notifier. `ingest_signed()`
//! drives the full pipeline the way a webhook request would.

use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use waflow_config::MissingSignaturePolicy;
use waflow_core::types::{Tenant, TenantStatus};
use waflow_core::WaflowError;
use waflow_ingest::{IngestReport, IngestionEngine, TenantDirectory};
use waflow_storage::queries::tenants::upsert_tenant;
use waflow_storage::Database;

use crate::capture::CaptureNotifier;

/// A tenant seeded into the harness database.
#[derive(Debug, Clone)]
pub struct SeedTenant {
    pub id: String,
    pub phone_number_id: String,
    pub account_id: String,
    pub verify_token: String,
    pub app_secret: Option<String>,
}

impl SeedTenant {
    /// Conventionally named tenant: `phone-<id>`, `acct-<id>`, `tok-<id>`.
    pub fn new(id: &str, app_secret: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            phone_number_id: format!("phone-{id}"),
            account_id: format!("acct-{id}"),
            verify_token: format!("tok-{id}"),
            app_secret: app_secret.map(str::to_string),
        }
    }
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    tenants: Vec<SeedTenant>,
    policy: MissingSignaturePolicy,
    op_timeout: Duration,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            tenants: Vec::new(),
            policy: MissingSignaturePolicy::Allow,
            op_timeout: Duration::from_secs(5),
        }
    }

    /// Seed a tenant before the engine is built.
    pub fn with_tenant(mut self, tenant: SeedTenant) -> Self {
        self.tenants.push(tenant);
        self
    }

    /// Set the missing-signature policy (default: allow).
    pub fn with_policy(mut self, policy: MissingSignaturePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the per-event operation timeout.
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Build the harness, creating the temp database and the engine.
    pub async fn build(self) -> Result<TestHarness, WaflowError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| WaflowError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;

        for seed in &self.tenants {
            upsert_tenant(
                &db,
                &Tenant {
                    id: seed.id.clone(),
                    display_name: format!("Tenant {}", seed.id),
                    phone_number_id: seed.phone_number_id.clone(),
                    account_id: seed.account_id.clone(),
                    verify_token: seed.verify_token.clone(),
                    app_secret: seed.app_secret.clone(),
                    status: TenantStatus::Active,
                },
            )
            .await?;
        }

        let directory = Arc::new(TenantDirectory::new(db.clone(), Duration::from_secs(300)));
        let notifier = Arc::new(CaptureNotifier::new());
        let engine = IngestionEngine::new(
            db.clone(),
            directory.clone(),
            notifier.clone(),
            self.policy,
            self.op_timeout,
        );

        Ok(TestHarness {
            db,
            engine,
            directory,
            notifier,
            _temp_dir: temp_dir,
        })
    }
}

/// A fully assembled ingestion stack backed by a temp database.
pub struct TestHarness {
    pub db: Database,
    pub engine: IngestionEngine,
    pub directory: Arc<TenantDirectory>,
    pub notifier: Arc<CaptureNotifier>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Ingest a body signed with `secret`, as the platform would send it.
    pub async fn ingest_signed(
        &self,
        body: &[u8],
        secret: &str,
    ) -> Result<IngestReport, WaflowError> {
        let signature = sign_body(secret, body);
        self.engine.ingest(body, Some(&signature)).await
    }

    /// Ingest a body with no signature header.
    pub async fn ingest_unsigned(&self, body: &[u8]) -> Result<IngestReport, WaflowError> {
        self.engine.ingest(body, None).await
    }
}

/// Compute the `sha256=<hex>` signature header value for a body.
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("hmac accepts any key length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
