// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules plus shared row-mapping helpers.

pub mod conversations;
pub mod tenants;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;

/// Parse an RFC 3339 timestamp column.
pub(crate) fn ts_col(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a nullable RFC 3339 timestamp column.
pub(crate) fn opt_ts_col(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| ts_col(idx, v)).transpose()
}

/// Parse a JSON-encoded column.
pub(crate) fn json_col<T: serde::de::DeserializeOwned>(
    idx: usize,
    value: String,
) -> rusqlite::Result<T> {
    serde_json::from_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a string-enum column (snake_case via strum).
pub(crate) fn enum_col<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
