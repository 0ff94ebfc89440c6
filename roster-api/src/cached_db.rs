//! Cache-Aside Helper for Employee Records
//!
//! The lifecycle service reads through this helper before touching the
//! store and refreshes it after every committed write. Entries expire after
//! the backend's TTL, so a write made by another process is visible here at
//! the latest one TTL later.
//!
//! A refresh that fails evicts the entry instead, so the next read goes to
//! the store.
//!
//! Read fills are not ordered against deletes. A `get` that loaded a record
//! from the store before a concurrent `delete` committed can put it back
//! after the eviction, and the deleted record is then served until the entry
//! expires.

use std::sync::Arc;

use roster_core::{EmployeeDto, EmployeeId};
use roster_storage::{CacheBackend, CacheKey, CacheStats};

use crate::error::{ApiError, ApiResult};
use crate::telemetry::metrics;

/// Employee cache over any [`CacheBackend`].
///
/// ```ignore
/// if let Some(hit) = cache.get(id).await? {
///     return Ok(hit);
/// }
/// let dto = load_from_store(id).await?;
/// cache.sync(&dto).await;
/// ```
pub struct EmployeeCache<C: CacheBackend> {
    backend: Arc<C>,
}

impl<C: CacheBackend> Clone for EmployeeCache<C> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<C: CacheBackend> EmployeeCache<C> {
    pub fn new(backend: Arc<C>) -> Self {
        Self { backend }
    }

    /// Look up a cached representation.
    pub async fn get(&self, id: EmployeeId) -> ApiResult<Option<EmployeeDto>> {
        let key = CacheKey::employee(id);
        let cached = self.backend.get::<EmployeeDto>(&key).await?;
        if let Some(metrics) = metrics() {
            metrics.record_cache_lookup(cached.is_some());
        }
        tracing::debug!(employee_id = %id, hit = cached.is_some(), "Cache lookup");
        Ok(cached)
    }

    /// Store `dto` under its id, restarting the TTL.
    ///
    /// A representation without an id has no key and is an internal error.
    pub async fn refresh(&self, dto: &EmployeeDto) -> ApiResult<()> {
        let id = dto.id.ok_or_else(|| {
            tracing::error!("Refusing to cache an employee without an id");
            ApiError::internal_error("Internal server error")
        })?;
        self.backend.put(&CacheKey::employee(id), dto).await?;
        tracing::debug!(employee_id = %id, "Cache refreshed");
        Ok(())
    }

    /// Bring the cache in line with a record the store just returned.
    ///
    /// The store is the source of truth, so cache failures are logged and
    /// never returned. When the refresh fails the old entry is evicted; if
    /// that fails too, the stale entry lives until its TTL runs out.
    pub async fn sync(&self, dto: &EmployeeDto) {
        let Err(refresh_err) = self.refresh(dto).await else {
            return;
        };
        tracing::error!(employee_id = ?dto.id, error = %refresh_err, "Cache refresh failed");

        let Some(id) = dto.id else {
            return;
        };
        if let Err(evict_err) = self.evict(id).await {
            tracing::error!(employee_id = %id, error = %evict_err, "Cache evict after failed refresh also failed");
        }
    }

    /// Drop the cached representation for `id`, if any.
    pub async fn evict(&self, id: EmployeeId) -> ApiResult<bool> {
        let removed = self.backend.evict(&CacheKey::employee(id)).await?;
        tracing::debug!(employee_id = %id, removed, "Cache evicted");
        Ok(removed)
    }

    pub async fn stats(&self) -> ApiResult<CacheStats> {
        Ok(self.backend.stats().await?)
    }
}
