//! Concurrent writers and alternate cache backends.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use roster_api::{EmployeeCache, EmployeeService, ErrorCode};
use roster_core::{EmployeeDto, EmployeeEntity, EmployeeId, EmployeeValidator, RosterResult};
use roster_storage::{
    CacheConfig, EmployeeRepository, EmployeeStore, InMemoryCacheBackend, InMemoryEmployeeStore,
    InMemoryTransaction, LmdbCacheBackend,
};
use roster_test_utils::fixtures::jane_doe;

#[path = "support/service.rs"]
mod test_service_support;
use test_service_support::test_service;

fn candidate_with_email(email: &str) -> EmployeeDto {
    let mut candidate = jane_doe();
    candidate.email = Some(email.to_string());
    candidate
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_same_email_admit_one() {
    let service = test_service();

    let attempts = (0..16).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.create(candidate_with_email("race@x.com")).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let created = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.code == ErrorCode::EntityAlreadyExists))
        .count();
    assert_eq!(created, 1);
    assert_eq!(conflicts, 15);
    assert_eq!(service.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_creates_with_distinct_emails_get_distinct_ids() {
    let service = test_service();

    let attempts = (0..10).map(|i| {
        let service = service.clone();
        async move { service.create(candidate_with_email(&format!("e{}@x.com", i))).await }
    });
    let mut ids: Vec<i64> = join_all(attempts)
        .await
        .into_iter()
        .map(|r| r.unwrap().id.unwrap().get())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 10);
}

#[tokio::test]
async fn test_lifecycle_over_lmdb_cache() {
    let dir = tempfile::tempdir().unwrap();
    let backend = LmdbCacheBackend::new(dir.path(), 16, CacheConfig::default()).unwrap();
    let service = EmployeeService::new(
        Arc::new(InMemoryEmployeeStore::new()),
        EmployeeCache::new(Arc::new(backend)),
        Arc::new(EmployeeValidator::default()),
    );

    let created = service.create(jane_doe()).await.unwrap();
    let id = created.id.unwrap();
    assert_eq!(service.cache().get(id).await.unwrap(), Some(created.clone()));
    assert_eq!(service.get(id).await.unwrap(), created);

    service.delete(id).await.unwrap();
    assert!(service.cache().get(id).await.unwrap().is_none());
    let err = service.get(id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::EntityNotFound);
}

/// In-memory store whose single-record reads return only after a delay.
struct SlowReads {
    inner: InMemoryEmployeeStore,
    delay: Duration,
}

#[async_trait]
impl EmployeeRepository for SlowReads {
    async fn find_all(&self) -> RosterResult<Vec<EmployeeEntity>> {
        self.inner.find_all().await
    }

    async fn find_by_id(&self, id: EmployeeId) -> RosterResult<Option<EmployeeEntity>> {
        let found = self.inner.find_by_id(id).await;
        tokio::time::sleep(self.delay).await;
        found
    }

    async fn exists_by_email(&self, email: &str) -> RosterResult<bool> {
        self.inner.exists_by_email(email).await
    }

    async fn save(&self, entity: EmployeeEntity) -> RosterResult<EmployeeEntity> {
        self.inner.save(entity).await
    }

    async fn delete_by_id(&self, id: EmployeeId) -> RosterResult<bool> {
        self.inner.delete_by_id(id).await
    }
}

#[async_trait]
impl EmployeeStore for SlowReads {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> RosterResult<InMemoryTransaction> {
        self.inner.begin().await
    }
}

#[tokio::test]
async fn test_read_racing_delete_goes_stale_for_at_most_one_ttl() {
    let store = SlowReads {
        inner: InMemoryEmployeeStore::new(),
        delay: Duration::from_millis(100),
    };
    let cache = InMemoryCacheBackend::new(CacheConfig::new("roster", Duration::from_millis(150)));
    let service = EmployeeService::new(
        Arc::new(store),
        EmployeeCache::new(Arc::new(cache)),
        Arc::new(EmployeeValidator::default()),
    );

    let id = service.create(jane_doe()).await.unwrap().id.unwrap();
    service.cache().evict(id).await.unwrap();

    let reader = {
        let service = service.clone();
        tokio::spawn(async move { service.get(id).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    service.delete(id).await.unwrap();

    assert_eq!(reader.await.unwrap().unwrap().id, Some(id));

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(service.cache().get(id).await.unwrap().is_none());
    assert_eq!(service.get(id).await.unwrap_err().code, ErrorCode::EntityNotFound);
}
