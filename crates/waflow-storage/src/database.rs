// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread: every aggregate mutation executes its read-check-write inside one
//! `call` closure, which makes the duplicate check and the status-regression
//! guard atomic without a separate compare-and-set. Do NOT create additional
//! Connection instances for writes.

use tokio_rusqlite::Connection;
use waflow_core::WaflowError;

use crate::migrations;

/// Handle to the SQLite database. Cloning is cheap (channel handle to the
/// single writer thread).
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` with WAL mode, apply
    /// PRAGMAs, and run all pending migrations.
    pub async fn open(path: &str) -> Result<Self, WaflowError> {
        Self::open_with(path, true).await
    }

    /// Open with an explicit journal-mode choice.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, WaflowError> {
        let conn = Connection::open(path).await.map_err(|e| map_tr_err(e.into()))?;

        conn.call(move |conn| {
            if wal_mode {
                conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            }
            conn.execute_batch(
                "PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            migrations::run_migrations(conn)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
            Ok(())
        })
        .await
        .map_err(map_boxed_err)?;

        tracing::debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (tests only survive as long as the handle).
    pub async fn open_in_memory() -> Result<Self, WaflowError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| map_tr_err(e.into()))?;
        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            migrations::run_migrations(conn)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
            Ok(())
        })
        .await
        .map_err(map_boxed_err)?;
        Ok(Self { conn })
    }

    /// Access the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the database, flushing pending writes.
    pub async fn close(self) -> Result<(), WaflowError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Map a tokio-rusqlite error into the workspace error type.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> WaflowError {
    WaflowError::Storage {
        source: Box::new(e),
    }
}

/// Map a tokio-rusqlite error whose closure error is already boxed into the
/// workspace error type.
pub(crate) fn map_boxed_err(
    e: tokio_rusqlite::Error<Box<dyn std::error::Error + Send + Sync>>,
) -> WaflowError {
    match e {
        tokio_rusqlite::Error::Error(source) => WaflowError::Storage { source },
        other => WaflowError::Storage {
            source: other.to_string().into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_runs_migrations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        // All three tables must exist after migration.
        let tables: Vec<String> = db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                let mut names = Vec::new();
                for row in rows {
                    names.push(row?);
                }
                Ok::<_, rusqlite::Error>(names)
            })
            .await
            .unwrap();

        for expected in ["tenants", "conversations", "messages"] {
            assert!(
                tables.iter().any(|t| t == expected),
                "missing table {expected}, got {tables:?}"
            );
        }

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
        // Second open must not re-apply migrations.
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }
}
