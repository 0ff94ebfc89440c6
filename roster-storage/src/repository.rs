//! Async record store traits.
//!
//! [`EmployeeRepository`] is the query surface shared by a store and its
//! transactions. A store opens [`EmployeeTransaction`]s; each one holds a
//! consistent view until it is committed or rolled back. Dropping a
//! transaction without committing rolls it back.

use ::async_trait::async_trait;
use roster_core::{EmployeeEntity, EmployeeId, RosterResult};

/// Query and write operations over employee records.
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// Every record, ordered by id.
    async fn find_all(&self) -> RosterResult<Vec<EmployeeEntity>>;

    async fn find_by_id(&self, id: EmployeeId) -> RosterResult<Option<EmployeeEntity>>;

    /// Exact, case-sensitive email match.
    async fn exists_by_email(&self, email: &str) -> RosterResult<bool>;

    /// Insert when `entity.id` is `None`, otherwise replace the existing row.
    ///
    /// Returns the stored record with its id assigned. Fails with
    /// `StorageError::UniqueViolation` if the email belongs to another row and
    /// `StorageError::NotFound` if an id is given that does not exist.
    async fn save(&self, entity: EmployeeEntity) -> RosterResult<EmployeeEntity>;

    /// Returns `false` when no row had this id.
    async fn delete_by_id(&self, id: EmployeeId) -> RosterResult<bool>;
}

/// A record store that can open transactions.
#[async_trait]
pub trait EmployeeStore: EmployeeRepository + 'static {
    type Tx: EmployeeTransaction;

    async fn begin(&self) -> RosterResult<Self::Tx>;

    /// Cheap round-trip used by readiness probes.
    async fn health_check(&self) -> RosterResult<()> {
        Ok(())
    }
}

/// A unit of work over the store.
#[async_trait]
pub trait EmployeeTransaction: EmployeeRepository + Sized {
    async fn commit(self) -> RosterResult<()>;

    async fn rollback(self) -> RosterResult<()>;
}
