//! ROSTER Storage - Record Store Traits, In-Memory Store and Cache Backends
//!
//! Defines the storage abstraction for employee records. The PostgreSQL
//! implementation lives in roster-api next to its connection pool.

pub mod cache;
pub mod repository;

pub use cache::{
    CacheBackend, CacheConfig, CacheKey, CacheStats, CacheableEntity, InMemoryCacheBackend,
    LmdbCacheBackend, LmdbCacheError,
};
pub use repository::{EmployeeRepository, EmployeeStore, EmployeeTransaction};

use ::async_trait::async_trait;
use roster_core::{EmployeeEntity, EmployeeId, RosterResult, StorageError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Constraint name reported for duplicate emails, matching the SQL schema.
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "employees_email_key";

// ============================================================================
// TABLE
// ============================================================================

#[derive(Debug, Clone)]
struct Table {
    rows: BTreeMap<i64, EmployeeEntity>,
    next_id: i64,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl Table {
    fn find_all(&self) -> Vec<EmployeeEntity> {
        self.rows.values().cloned().collect()
    }

    fn find_by_id(&self, id: EmployeeId) -> Option<EmployeeEntity> {
        self.rows.get(&id.get()).cloned()
    }

    fn exists_by_email(&self, email: &str) -> bool {
        self.rows.values().any(|row| row.email == email)
    }

    fn email_taken_by_other(&self, email: &str, own_id: Option<i64>) -> bool {
        self.rows
            .iter()
            .any(|(id, row)| row.email == email && Some(*id) != own_id)
    }

    fn save(&mut self, mut entity: EmployeeEntity) -> Result<EmployeeEntity, StorageError> {
        let own_id = entity.id.map(EmployeeId::get);
        if let Some(id) = own_id {
            if !self.rows.contains_key(&id) {
                return Err(StorageError::NotFound {
                    entity: "employee",
                    id,
                });
            }
        }
        if self.email_taken_by_other(&entity.email, own_id) {
            return Err(StorageError::UniqueViolation {
                constraint: EMAIL_UNIQUE_CONSTRAINT.to_string(),
                value: entity.email,
            });
        }

        let id = match own_id {
            Some(id) => id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };
        entity.id = Some(EmployeeId::from_store(id));
        self.rows.insert(id, entity.clone());
        Ok(entity)
    }

    fn delete_by_id(&mut self, id: EmployeeId) -> bool {
        self.rows.remove(&id.get()).is_some()
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// In-memory employee store for tests and local runs.
///
/// Ids come from a counter that never goes backwards, so deleted ids are
/// not reused. Transactions are serialized: one holds the table lock from
/// `begin` until commit or rollback.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmployeeStore {
    table: Arc<AsyncMutex<Table>>,
}

impl InMemoryEmployeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.table.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryEmployeeStore {
    async fn find_all(&self) -> RosterResult<Vec<EmployeeEntity>> {
        Ok(self.table.lock().await.find_all())
    }

    async fn find_by_id(&self, id: EmployeeId) -> RosterResult<Option<EmployeeEntity>> {
        Ok(self.table.lock().await.find_by_id(id))
    }

    async fn exists_by_email(&self, email: &str) -> RosterResult<bool> {
        Ok(self.table.lock().await.exists_by_email(email))
    }

    async fn save(&self, entity: EmployeeEntity) -> RosterResult<EmployeeEntity> {
        Ok(self.table.lock().await.save(entity)?)
    }

    async fn delete_by_id(&self, id: EmployeeId) -> RosterResult<bool> {
        Ok(self.table.lock().await.delete_by_id(id))
    }
}

#[async_trait]
impl EmployeeStore for InMemoryEmployeeStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> RosterResult<InMemoryTransaction> {
        let guard = Arc::clone(&self.table).lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTransaction {
            guard,
            working: Mutex::new(working),
        })
    }
}

/// Transaction over [`InMemoryEmployeeStore`].
///
/// Writes go to a working copy that replaces the table on commit.
#[derive(Debug)]
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Table>,
    working: Mutex<Table>,
}

impl InMemoryTransaction {
    fn with_working<R>(&self, f: impl FnOnce(&mut Table) -> R) -> RosterResult<R> {
        let mut working = self.working.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(f(&mut working))
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryTransaction {
    async fn find_all(&self) -> RosterResult<Vec<EmployeeEntity>> {
        self.with_working(|t| t.find_all())
    }

    async fn find_by_id(&self, id: EmployeeId) -> RosterResult<Option<EmployeeEntity>> {
        self.with_working(|t| t.find_by_id(id))
    }

    async fn exists_by_email(&self, email: &str) -> RosterResult<bool> {
        self.with_working(|t| t.exists_by_email(email))
    }

    async fn save(&self, entity: EmployeeEntity) -> RosterResult<EmployeeEntity> {
        Ok(self.with_working(|t| t.save(entity))??)
    }

    async fn delete_by_id(&self, id: EmployeeId) -> RosterResult<bool> {
        self.with_working(|t| t.delete_by_id(id))
    }
}

#[async_trait]
impl EmployeeTransaction for InMemoryTransaction {
    async fn commit(self) -> RosterResult<()> {
        let Self { mut guard, working } = self;
        *guard = working.into_inner().map_err(|_| StorageError::LockPoisoned)?;
        Ok(())
    }

    async fn rollback(self) -> RosterResult<()> {
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
