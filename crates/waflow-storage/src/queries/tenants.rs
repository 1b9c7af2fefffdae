// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant CRUD and lookup operations.
//!
//! Tenants resolve by any of three independent keys (phone-number id,
//! account id, verify token). Only `active` tenants resolve; suspended and
//! deleted tenants behave as not found.

use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use waflow_core::{Tenant, TenantStatus, WaflowError};

use crate::database::Database;
use crate::queries::enum_col;

/// Insert a tenant, or update its mutable fields if the id already exists.
///
/// This is the external administration path; ingestion never writes tenants.
pub async fn upsert_tenant(db: &Database, tenant: &Tenant) -> Result<(), WaflowError> {
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO tenants
                     (id, display_name, phone_number_id, account_id, verify_token,
                      app_secret, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                 ON CONFLICT (id) DO UPDATE SET
                     display_name = excluded.display_name,
                     phone_number_id = excluded.phone_number_id,
                     account_id = excluded.account_id,
                     verify_token = excluded.verify_token,
                     app_secret = excluded.app_secret,
                     status = excluded.status,
                     updated_at = excluded.updated_at",
                params![
                    tenant.id,
                    tenant.display_name,
                    tenant.phone_number_id,
                    tenant.account_id,
                    tenant.verify_token,
                    tenant.app_secret,
                    tenant.status.to_string(),
                    now,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find an active tenant by its phone-number id.
pub async fn find_active_by_phone_number_id(
    db: &Database,
    phone_number_id: &str,
) -> Result<Option<Tenant>, WaflowError> {
    find_active_by(db, "phone_number_id", phone_number_id).await
}

/// Find an active tenant by its business account id.
pub async fn find_active_by_account_id(
    db: &Database,
    account_id: &str,
) -> Result<Option<Tenant>, WaflowError> {
    find_active_by(db, "account_id", account_id).await
}

/// Find an active tenant by its webhook verify token.
pub async fn find_active_by_verify_token(
    db: &Database,
    verify_token: &str,
) -> Result<Option<Tenant>, WaflowError> {
    find_active_by(db, "verify_token", verify_token).await
}

/// List all tenants regardless of status (administration/CLI use).
pub async fn list_tenants(db: &Database) -> Result<Vec<Tenant>, WaflowError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, display_name, phone_number_id, account_id, verify_token,
                        app_secret, status
                 FROM tenants ORDER BY id",
            )?;
            let rows = stmt.query_map([], row_to_tenant)?;
            let mut tenants = Vec::new();
            for row in rows {
                tenants.push(row?);
            }
            Ok(tenants)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

async fn find_active_by(
    db: &Database,
    column: &'static str,
    value: &str,
) -> Result<Option<Tenant>, WaflowError> {
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT id, display_name, phone_number_id, account_id, verify_token,
                        app_secret, status
                 FROM tenants WHERE {column} = ?1 AND status = 'active'"
            );
            let tenant = conn
                .query_row(&sql, params![value], row_to_tenant)
                .optional()?;
            Ok(tenant)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn row_to_tenant(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tenant> {
    Ok(Tenant {
        id: row.get(0)?,
        display_name: row.get(1)?,
        phone_number_id: row.get(2)?,
        account_id: row.get(3)?,
        verify_token: row.get(4)?,
        app_secret: row.get(5)?,
        status: enum_col::<TenantStatus>(6, row.get(6)?)?,
    })
}
