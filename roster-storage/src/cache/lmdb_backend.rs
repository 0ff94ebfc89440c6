//! LMDB-backed cache implementation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a memory-mapped
//! key-value store for cached employee representations.
//!
//! # Value Layout
//!
//! Each value is `[expires_at: 8 bytes, little-endian unix millis][json]`.
//! Expired values are removed lazily on the next read of their key.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The backend uses:
//! - Read transactions for `get` and `stats`
//! - Write transactions for `put`, `evict` and expiry cleanup
//! - Hit/miss statistics are tracked behind a lock

use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use roster_core::{CacheError, RosterError, RosterResult};

use super::key::CacheKey;
use super::traits::{CacheBackend, CacheConfig, CacheStats, CacheableEntity};

const EXPIRY_HEADER_LEN: usize = 8;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for RosterError {
    fn from(e: LmdbCacheError) -> Self {
        let cache_error = match e {
            LmdbCacheError::Serialization(reason) => CacheError::Serialization { reason },
            LmdbCacheError::Deserialization(reason) => CacheError::Deserialization { reason },
            other => CacheError::Backend {
                reason: other.to_string(),
            },
        };
        RosterError::Cache(cache_error)
    }
}

/// LMDB-backed cache with per-entry TTL.
///
/// # Example
///
/// ```ignore
/// use roster_storage::cache::{CacheConfig, CacheKey, LmdbCacheBackend};
///
/// let backend = LmdbCacheBackend::new("/tmp/roster-cache", 64, CacheConfig::default())?;
/// let key = CacheKey::employee(id);
/// backend.put(&key, &dto).await?;
/// let cached: Option<EmployeeDto> = backend.get(&key).await?;
/// ```
pub struct LmdbCacheBackend {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    config: CacheConfig,
    /// Hit, miss and eviction counters. Entry count and size are read from LMDB.
    stats: Arc<RwLock<CacheStats>>,
}

impl LmdbCacheBackend {
    /// Create a new LMDB cache backend.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    /// * `config` - Key prefix and TTL
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(
        path: P,
        max_size_mb: usize,
        config: CacheConfig,
    ) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment directory is owned by this backend and is
        // not opened twice within one process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            config,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn record_hit(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += 1;
        }
    }

    fn record_miss(&self, expired: bool) {
        if let Ok(mut stats) = self.stats.write() {
            stats.misses += 1;
            if expired {
                stats.evictions += 1;
            }
        }
    }

    fn read_raw(&self, encoded_key: &[u8]) -> Result<Option<Vec<u8>>, LmdbCacheError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        let bytes = self
            .db
            .get(&rtxn, encoded_key)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        Ok(bytes.map(<[u8]>::to_vec))
    }

    fn delete_raw(&self, encoded_key: &[u8]) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        let deleted = self
            .db
            .delete(&mut wtxn, encoded_key)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        Ok(deleted)
    }
}

fn split_value(bytes: &[u8]) -> Result<(i64, &[u8]), LmdbCacheError> {
    if bytes.len() < EXPIRY_HEADER_LEN {
        return Err(LmdbCacheError::Deserialization(
            "value shorter than expiry header".into(),
        ));
    }
    let (header, payload) = bytes.split_at(EXPIRY_HEADER_LEN);
    let header: [u8; EXPIRY_HEADER_LEN] = header
        .try_into()
        .map_err(|_| LmdbCacheError::Deserialization("Invalid expiry header".into()))?;
    Ok((i64::from_le_bytes(header), payload))
}

#[async_trait]
impl CacheBackend for LmdbCacheBackend {
    async fn get<T: CacheableEntity>(&self, key: &CacheKey) -> RosterResult<Option<T>> {
        let encoded_key = key.encode(&self.config.prefix);

        let Some(bytes) = self.read_raw(encoded_key.as_bytes())? else {
            self.record_miss(false);
            return Ok(None);
        };

        let (expires_at, payload) = split_value(&bytes)?;
        if expires_at <= Utc::now().timestamp_millis() {
            self.delete_raw(encoded_key.as_bytes())?;
            self.record_miss(true);
            return Ok(None);
        }

        let value: T = serde_json::from_slice(payload)
            .map_err(|e| LmdbCacheError::Deserialization(e.to_string()))?;
        self.record_hit();
        Ok(Some(value))
    }

    async fn put<T: CacheableEntity>(&self, key: &CacheKey, value: &T) -> RosterResult<()> {
        let encoded_key = key.encode(&self.config.prefix);

        let ttl_millis = i64::try_from(self.config.ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp_millis().saturating_add(ttl_millis);
        let value_bytes =
            serde_json::to_vec(value).map_err(|e| LmdbCacheError::Serialization(e.to_string()))?;

        let mut full_bytes = Vec::with_capacity(EXPIRY_HEADER_LEN + value_bytes.len());
        full_bytes.extend_from_slice(&expires_at.to_le_bytes());
        full_bytes.extend_from_slice(&value_bytes);

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, encoded_key.as_bytes(), &full_bytes)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn evict(&self, key: &CacheKey) -> RosterResult<bool> {
        let encoded_key = key.encode(&self.config.prefix);
        Ok(self.delete_raw(encoded_key.as_bytes())?)
    }

    async fn stats(&self) -> RosterResult<CacheStats> {
        let mut stats = self
            .stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default();

        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let mut entry_count = 0u64;
        let mut memory_bytes = 0u64;
        for (_, value) in iter.flatten() {
            entry_count += 1;
            memory_bytes += value.len() as u64;
        }
        stats.entry_count = entry_count;
        stats.memory_bytes = memory_bytes;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use roster_core::{EmployeeDto, EmployeeId};
    use rust_decimal::Decimal;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_backend(ttl: Duration) -> (LmdbCacheBackend, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let backend = LmdbCacheBackend::new(temp_dir.path(), 10, CacheConfig::new("test", ttl))
            .expect("backend creation should succeed");
        (backend, temp_dir)
    }

    fn make_test_dto(id: i64) -> EmployeeDto {
        EmployeeDto {
            id: Some(EmployeeId::from_store(id)),
            name: Some("Jane Doe".to_string()),
            email: Some(format!("jane{}@x.com", id)),
            age: Some(30),
            date_of_joining: NaiveDate::from_ymd_opt(2020, 1, 1),
            is_active: Some(true),
            salary: Some(Decimal::new(500000, 2)),
            role: Some("ENGINEER".to_string()),
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (backend, _temp_dir) = create_test_backend(Duration::from_secs(60));
        let key = CacheKey::employee(EmployeeId::from_store(1));

        backend
            .put(&key, &make_test_dto(1))
            .await
            .expect("put should succeed");

        let cached: Option<EmployeeDto> = backend.get(&key).await.expect("get should succeed");
        assert_eq!(cached, Some(make_test_dto(1)));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (backend, _temp_dir) = create_test_backend(Duration::from_secs(60));
        let key = CacheKey::employee(EmployeeId::from_store(404));
        let cached: Option<EmployeeDto> = backend.get(&key).await.expect("get should succeed");
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_evict() {
        let (backend, _temp_dir) = create_test_backend(Duration::from_secs(60));
        let key = CacheKey::employee(EmployeeId::from_store(1));
        backend.put(&key, &make_test_dto(1)).await.unwrap();

        assert!(backend.evict(&key).await.unwrap());
        assert!(!backend.evict(&key).await.unwrap());
        let cached: Option<EmployeeDto> = backend.get(&key).await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let (backend, _temp_dir) = create_test_backend(Duration::from_millis(20));
        let key = CacheKey::employee(EmployeeId::from_store(1));
        backend.put(&key, &make_test_dto(1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        let cached: Option<EmployeeDto> = backend.get(&key).await.unwrap();
        assert!(cached.is_none());
        let stats = backend.stats().await.unwrap();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.entry_count, 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let (backend, _temp_dir) = create_test_backend(Duration::from_secs(60));
        for id in 1..=3 {
            backend
                .put(&CacheKey::employee(EmployeeId::from_store(id)), &make_test_dto(id))
                .await
                .unwrap();
        }
        let _: Option<EmployeeDto> = backend
            .get(&CacheKey::employee(EmployeeId::from_store(1)))
            .await
            .unwrap();
        let _: Option<EmployeeDto> = backend
            .get(&CacheKey::employee(EmployeeId::from_store(9)))
            .await
            .unwrap();

        let stats = backend.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 3);
        assert!((stats.hit_rate() - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_short_value_is_rejected() {
        assert!(split_value(&[1, 2, 3]).is_err());
        let (expires_at, payload) = split_value(&[1, 0, 0, 0, 0, 0, 0, 0, b'{', b'}']).unwrap();
        assert_eq!(expires_at, 1);
        assert_eq!(payload, b"{}");
    }
}
