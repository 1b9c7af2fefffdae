// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant directory: resolves inbound identifiers to active tenants.
//!
//! Fronted by an in-process TTL cache. Cache entries are immutable
//! snapshots: a credential rotation becomes visible only after TTL expiry
//! or explicit invalidation, a staleness window accepted by design and
//! bounded by the configured TTL. Races on cache population are benign
//! (last write wins).

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use waflow_core::{Tenant, WaflowError};
use waflow_storage::Database;
use waflow_storage::queries::tenants;

/// Time source for cache expiry. Injected so tests can drive expiry with a
/// manual clock instead of sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock implementation used in production.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// One of the three independent lookup keys a tenant resolves by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantKey<'a> {
    PhoneNumberId(&'a str),
    AccountId(&'a str),
    VerifyToken(&'a str),
}

impl TenantKey<'_> {
    fn cache_key(&self) -> String {
        match self {
            TenantKey::PhoneNumberId(v) => format!("phone:{v}"),
            TenantKey::AccountId(v) => format!("account:{v}"),
            TenantKey::VerifyToken(v) => format!("token:{v}"),
        }
    }
}

struct CacheEntry {
    tenant: Tenant,
    inserted_at: Instant,
}

/// Resolves inbound identifiers to active tenant records, caching hits for
/// a fixed TTL keyed by whichever identifier was used.
pub struct TenantDirectory {
    db: Database,
    cache: DashMap<String, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TenantDirectory {
    /// Create a directory with the wall clock.
    pub fn new(db: Database, ttl: Duration) -> Self {
        Self::with_clock(db, ttl, Arc::new(SystemClock))
    }

    /// Create a directory with an injected clock (tests).
    pub fn with_clock(db: Database, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            cache: DashMap::new(),
            ttl,
            clock,
        }
    }

    /// Resolve a key to an active tenant.
    ///
    /// Suspended and deleted tenants resolve to `None`. On cache miss the
    /// lookup falls through to the backing store and repopulates the cache
    /// under the key that was used.
    pub async fn resolve(&self, key: TenantKey<'_>) -> Result<Option<Tenant>, WaflowError> {
        let cache_key = key.cache_key();

        let cached = self.cache.get(&cache_key).and_then(|entry| {
            if self.clock.now().duration_since(entry.inserted_at) < self.ttl {
                Some(entry.tenant.clone())
            } else {
                None
            }
        });
        if let Some(tenant) = cached {
            return Ok(Some(tenant));
        }

        let tenant = match key {
            TenantKey::PhoneNumberId(v) => {
                tenants::find_active_by_phone_number_id(&self.db, v).await?
            }
            TenantKey::AccountId(v) => tenants::find_active_by_account_id(&self.db, v).await?,
            TenantKey::VerifyToken(v) => tenants::find_active_by_verify_token(&self.db, v).await?,
        };

        match &tenant {
            Some(t) => {
                self.cache.insert(
                    cache_key,
                    CacheEntry {
                        tenant: t.clone(),
                        inserted_at: self.clock.now(),
                    },
                );
            }
            None => {
                // Drop any expired entry so a deactivated tenant does not
                // linger under its old key.
                self.cache.remove(&cache_key);
            }
        }

        Ok(tenant)
    }

    /// Drop the cache entry for one key.
    pub fn invalidate(&self, key: TenantKey<'_>) {
        self.cache.remove(&key.cache_key());
    }

    /// Drop all cache entries (administration path after bulk changes).
    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    /// Number of live cache entries, for diagnostics.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}
