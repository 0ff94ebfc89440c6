//! Cache backend traits and cacheable entity marker.

use std::time::Duration;

use async_trait::async_trait;
use roster_core::{EmployeeDto, RosterResult};
use serde::{de::DeserializeOwned, Serialize};

use super::key::CacheKey;

/// Marker trait for types that can be cached.
///
/// `NAMESPACE` becomes part of every key for this type, so two cacheable
/// types never collide on the same id.
pub trait CacheableEntity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const NAMESPACE: &'static str;
}

/// Cache backend trait for pluggable cache implementations.
///
/// Entries expire after the backend's configured TTL. Values are stored
/// serialized, so a read never aliases a previously written value.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Get a live value, or `None` on a miss or an expired entry.
    async fn get<T: CacheableEntity>(&self, key: &CacheKey) -> RosterResult<Option<T>>;

    /// Insert or overwrite a value, restarting its TTL.
    async fn put<T: CacheableEntity>(&self, key: &CacheKey, value: &T) -> RosterResult<()>;

    /// Remove a value. Returns whether an entry was present.
    async fn evict(&self, key: &CacheKey) -> RosterResult<bool>;

    /// Get cache statistics.
    async fn stats(&self) -> RosterResult<CacheStats>;
}

/// Settings shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Prepended to every encoded key.
    pub prefix: String,
    /// Lifetime of an entry after its last `put`.
    pub ttl: Duration,
}

impl CacheConfig {
    pub const DEFAULT_PREFIX: &'static str = "roster";
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

    pub fn new(prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            ttl,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX, Self::DEFAULT_TTL)
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired entries included.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Approximate stored payload size in bytes.
    pub memory_bytes: u64,
    /// Entries dropped because their TTL ran out.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// ============================================================================
// IMPLEMENTATIONS FOR ROSTER ENTITIES
// ============================================================================

impl CacheableEntity for EmployeeDto {
    const NAMESPACE: &'static str = "employees";
}
