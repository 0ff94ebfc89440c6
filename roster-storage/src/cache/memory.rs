//! Process-local cache backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use roster_core::{CacheError, RosterResult};

use super::key::CacheKey;
use super::traits::{CacheBackend, CacheConfig, CacheStats, CacheableEntity};

#[derive(Debug)]
struct CacheEntry {
    bytes: Vec<u8>,
    expires_at: Instant,
}

/// In-memory cache with per-entry TTL.
///
/// Expired entries are dropped lazily on the next read of their key.
#[derive(Debug)]
pub struct InMemoryCacheBackend {
    config: CacheConfig,
    entries: DashMap<String, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

enum Lookup {
    Live(Vec<u8>),
    Expired,
    Absent,
}

impl InMemoryCacheBackend {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lookup(&self, encoded: &str, now: Instant) -> Lookup {
        match self.entries.get(encoded) {
            Some(entry) if entry.expires_at > now => Lookup::Live(entry.bytes.clone()),
            Some(_) => Lookup::Expired,
            None => Lookup::Absent,
        }
    }
}

impl Default for InMemoryCacheBackend {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get<T: CacheableEntity>(&self, key: &CacheKey) -> RosterResult<Option<T>> {
        let encoded = key.encode(&self.config.prefix);
        let now = Instant::now();

        match self.lookup(&encoded, now) {
            Lookup::Live(bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                let value = serde_json::from_slice(&bytes).map_err(|e| CacheError::Deserialization {
                    reason: e.to_string(),
                })?;
                Ok(Some(value))
            }
            Lookup::Expired => {
                if self
                    .entries
                    .remove_if(&encoded, |_, entry| entry.expires_at <= now)
                    .is_some()
                {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Lookup::Absent => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn put<T: CacheableEntity>(&self, key: &CacheKey, value: &T) -> RosterResult<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        self.entries.insert(
            key.encode(&self.config.prefix),
            CacheEntry {
                bytes,
                expires_at: Instant::now() + self.config.ttl,
            },
        );
        Ok(())
    }

    async fn evict(&self, key: &CacheKey) -> RosterResult<bool> {
        Ok(self
            .entries
            .remove(&key.encode(&self.config.prefix))
            .is_some())
    }

    async fn stats(&self) -> RosterResult<CacheStats> {
        let memory_bytes = self
            .entries
            .iter()
            .map(|entry| entry.value().bytes.len() as u64)
            .sum();
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
            memory_bytes,
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use roster_core::{EmployeeDto, EmployeeId};
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn make_test_dto(id: i64) -> EmployeeDto {
        EmployeeDto {
            id: Some(EmployeeId::from_store(id)),
            name: Some("Jane Doe".to_string()),
            email: Some("jane@x.com".to_string()),
            age: Some(30),
            date_of_joining: NaiveDate::from_ymd_opt(2020, 1, 1),
            is_active: Some(true),
            salary: Some(Decimal::new(500000, 2)),
            role: Some("ENGINEER".to_string()),
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let backend = InMemoryCacheBackend::default();
        let key = CacheKey::employee(EmployeeId::from_store(1));
        backend.put(&key, &make_test_dto(1)).await.unwrap();

        let cached: Option<EmployeeDto> = backend.get(&key).await.unwrap();
        assert_eq!(cached, Some(make_test_dto(1)));

        let stats = backend.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entry_count, 1);
        assert!(stats.memory_bytes > 0);
    }

    #[tokio::test]
    async fn test_miss_and_evict() {
        let backend = InMemoryCacheBackend::default();
        let key = CacheKey::employee(EmployeeId::from_store(1));
        let miss: Option<EmployeeDto> = backend.get(&key).await.unwrap();
        assert!(miss.is_none());

        backend.put(&key, &make_test_dto(1)).await.unwrap();
        assert!(backend.evict(&key).await.unwrap());
        assert!(!backend.evict(&key).await.unwrap());

        let gone: Option<EmployeeDto> = backend.get(&key).await.unwrap();
        assert!(gone.is_none());
        assert_eq!(backend.stats().await.unwrap().misses, 2);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let backend = InMemoryCacheBackend::new(CacheConfig::new("t", Duration::from_millis(20)));
        let key = CacheKey::employee(EmployeeId::from_store(1));
        backend.put(&key, &make_test_dto(1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        let expired: Option<EmployeeDto> = backend.get(&key).await.unwrap();
        assert!(expired.is_none());
        let stats = backend.stats().await.unwrap();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.entry_count, 0);
    }

    #[tokio::test]
    async fn test_put_overwrites_value() {
        let backend = InMemoryCacheBackend::default();
        let key = CacheKey::employee(EmployeeId::from_store(1));
        backend.put(&key, &make_test_dto(1)).await.unwrap();

        let mut changed = make_test_dto(1);
        changed.age = Some(31);
        backend.put(&key, &changed).await.unwrap();

        let cached: Option<EmployeeDto> = backend.get(&key).await.unwrap();
        assert_eq!(cached.and_then(|d| d.age), Some(31));
    }
}
