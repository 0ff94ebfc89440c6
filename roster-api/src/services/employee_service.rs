//! Employee Service
//!
//! Business logic for the employee lifecycle: validation, the email
//! uniqueness rule, transactional writes and cache upkeep. Handlers stay thin
//! and call into this service.

use std::sync::Arc;
use std::time::Instant;

use roster_core::{EmployeeDto, EmployeeEntity, EmployeeId, EmployeePatch, EmployeeValidator};
use roster_storage::{CacheBackend, EmployeeRepository, EmployeeStore, EmployeeTransaction};

use crate::cached_db::EmployeeCache;
use crate::error::{ApiError, ApiResult};
use crate::telemetry::metrics;

const ENTITY: &str = "Employee";

/// Lifecycle manager for employee records.
///
/// Holds only shared handles, so cloning is cheap and every request can own
/// its copy. Each write runs in its own transaction; returning early drops
/// the transaction and rolls it back.
pub struct EmployeeService<S: EmployeeStore, C: CacheBackend> {
    store: Arc<S>,
    cache: EmployeeCache<C>,
    validator: Arc<EmployeeValidator>,
}

impl<S: EmployeeStore, C: CacheBackend> Clone for EmployeeService<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
            validator: Arc::clone(&self.validator),
        }
    }
}

impl<S: EmployeeStore, C: CacheBackend> EmployeeService<S, C> {
    pub fn new(store: Arc<S>, cache: EmployeeCache<C>, validator: Arc<EmployeeValidator>) -> Self {
        Self {
            store,
            cache,
            validator,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn cache(&self) -> &EmployeeCache<C> {
        &self.cache
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Every record in store order.
    pub async fn list(&self) -> ApiResult<Vec<EmployeeDto>> {
        let start = Instant::now();
        let result = self.store.find_all().await.map_err(ApiError::from);
        record("list", start, result.is_ok());

        let rows = result?;
        tracing::debug!(count = rows.len(), "Listed employees");
        Ok(rows.into_iter().map(EmployeeDto::from).collect())
    }

    /// Fetch one record, serving from the cache when it holds a live entry.
    pub async fn get(&self, id: EmployeeId) -> ApiResult<EmployeeDto> {
        if let Some(hit) = self.cache.get(id).await? {
            return Ok(hit);
        }

        let start = Instant::now();
        let result = self.store.find_by_id(id).await.map_err(ApiError::from);
        record("get", start, result.is_ok());

        let entity = result?.ok_or_else(|| not_found(id))?;
        let dto = EmployeeDto::from(entity);
        self.cache.sync(&dto).await;
        Ok(dto)
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Validate and insert a new record. Any id on the candidate is ignored.
    pub async fn create(&self, candidate: EmployeeDto) -> ApiResult<EmployeeDto> {
        tracing::info!(email = ?candidate.email, "Creating employee");
        self.validator.validate(&candidate).map_err(|errors| {
            tracing::warn!(violations = errors.len(), "Employee create rejected");
            ApiError::from(errors)
        })?;

        let start = Instant::now();
        let result = self.create_in_tx(candidate).await;
        record("create", start, result.is_ok());

        let saved = EmployeeDto::from(result?);
        self.cache.sync(&saved).await;
        tracing::info!(employee_id = ?saved.id, "Employee created");
        Ok(saved)
    }

    async fn create_in_tx(&self, candidate: EmployeeDto) -> ApiResult<EmployeeEntity> {
        let mut entity = EmployeeEntity::try_from(candidate)?;
        entity.id = None;

        let tx = self.store.begin().await?;
        if tx.exists_by_email(&entity.email).await? {
            tracing::warn!(email = %entity.email, "Email already registered");
            return Err(duplicate_email(&entity.email));
        }
        let saved = tx.save(entity).await?;
        tx.commit().await?;
        Ok(saved)
    }

    /// Replace every mutable field of an existing record.
    pub async fn update(&self, id: EmployeeId, candidate: EmployeeDto) -> ApiResult<EmployeeDto> {
        tracing::info!(employee_id = %id, "Updating employee");
        self.validator.validate(&candidate).map_err(|errors| {
            tracing::warn!(employee_id = %id, violations = errors.len(), "Employee update rejected");
            ApiError::from(errors)
        })?;

        let start = Instant::now();
        let result = self.update_in_tx(id, candidate).await;
        record("update", start, result.is_ok());

        let saved = EmployeeDto::from(result?);
        self.cache.sync(&saved).await;
        tracing::info!(employee_id = %id, "Employee updated");
        Ok(saved)
    }

    async fn update_in_tx(&self, id: EmployeeId, candidate: EmployeeDto) -> ApiResult<EmployeeEntity> {
        let replacement = EmployeeEntity::try_from(candidate)?;

        let tx = self.store.begin().await?;
        let mut stored = tx.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
        ensure_email_free(&tx, &stored, &replacement.email).await?;

        stored.replace_fields(replacement);
        let saved = tx.save(stored).await?;
        tx.commit().await?;
        Ok(saved)
    }

    /// Apply the supplied patchable fields, keeping the rest.
    ///
    /// An empty patch still writes the record back unchanged.
    pub async fn patch(&self, id: EmployeeId, patch: EmployeePatch) -> ApiResult<EmployeeDto> {
        tracing::info!(employee_id = %id, "Patching employee");
        let ignored = patch.ignored_fields();
        if !ignored.is_empty() {
            tracing::debug!(employee_id = %id, ?ignored, "Ignoring non-patchable fields");
        }
        self.validator.validate_patch(&patch).map_err(|errors| {
            tracing::warn!(employee_id = %id, violations = errors.len(), "Employee patch rejected");
            ApiError::from(errors)
        })?;

        let start = Instant::now();
        let result = self.patch_in_tx(id, &patch).await;
        record("patch", start, result.is_ok());

        let saved = EmployeeDto::from(result?);
        self.cache.sync(&saved).await;
        tracing::info!(employee_id = %id, "Employee patched");
        Ok(saved)
    }

    async fn patch_in_tx(&self, id: EmployeeId, patch: &EmployeePatch) -> ApiResult<EmployeeEntity> {
        let tx = self.store.begin().await?;
        let mut stored = tx.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
        if let Some(email) = patch.email.as_deref() {
            ensure_email_free(&tx, &stored, email).await?;
        }

        patch.apply_to(&mut stored);
        let saved = tx.save(stored).await?;
        tx.commit().await?;
        Ok(saved)
    }

    /// Remove a record and its cache entry.
    pub async fn delete(&self, id: EmployeeId) -> ApiResult<()> {
        tracing::info!(employee_id = %id, "Deleting employee");

        let start = Instant::now();
        let result = self.delete_in_tx(id).await;
        record("delete", start, result.is_ok());
        result?;

        self.cache.evict(id).await?;
        tracing::info!(employee_id = %id, "Employee deleted");
        Ok(())
    }

    async fn delete_in_tx(&self, id: EmployeeId) -> ApiResult<()> {
        let tx = self.store.begin().await?;
        if tx.find_by_id(id).await?.is_none() {
            return Err(not_found(id));
        }
        if !tx.delete_by_id(id).await? {
            return Err(not_found(id));
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Fails with a conflict when `email` differs from the stored one and
/// belongs to another record.
async fn ensure_email_free<T: EmployeeTransaction>(
    tx: &T,
    stored: &EmployeeEntity,
    email: &str,
) -> ApiResult<()> {
    if stored.email == email {
        return Ok(());
    }
    if tx.exists_by_email(email).await? {
        tracing::warn!(employee_id = ?stored.id, email = %email, "Email already registered");
        return Err(duplicate_email(email));
    }
    Ok(())
}

fn not_found(id: EmployeeId) -> ApiError {
    tracing::warn!(employee_id = %id, "Employee not found");
    ApiError::entity_not_found(ENTITY, id)
}

fn duplicate_email(email: &str) -> ApiError {
    ApiError::entity_already_exists(ENTITY, "email", email)
}

fn record(operation: &str, start: Instant, success: bool) {
    if let Some(metrics) = metrics() {
        metrics.record_db_operation(operation, success, start.elapsed().as_secs_f64());
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use roster_core::{CacheError, RosterResult};
    use roster_storage::{
        CacheConfig, CacheKey, CacheStats, CacheableEntity, InMemoryCacheBackend,
        InMemoryEmployeeStore,
    };
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, Ordering};

    type TestService = EmployeeService<InMemoryEmployeeStore, InMemoryCacheBackend>;

    fn make_test_service() -> TestService {
        EmployeeService::new(
            Arc::new(InMemoryEmployeeStore::new()),
            EmployeeCache::new(Arc::new(InMemoryCacheBackend::new(CacheConfig::default()))),
            Arc::new(EmployeeValidator::default()),
        )
    }

    /// In-memory cache whose writes can be switched to fail.
    #[derive(Default)]
    struct FlakyCacheBackend {
        inner: InMemoryCacheBackend,
        fail_puts: AtomicBool,
        fail_evicts: AtomicBool,
    }

    fn backend_down(op: &str) -> roster_core::RosterError {
        CacheError::Backend {
            reason: format!("{} refused", op),
        }
        .into()
    }

    #[async_trait]
    impl CacheBackend for FlakyCacheBackend {
        async fn get<T: CacheableEntity>(&self, key: &CacheKey) -> RosterResult<Option<T>> {
            self.inner.get(key).await
        }

        async fn put<T: CacheableEntity>(&self, key: &CacheKey, value: &T) -> RosterResult<()> {
            if self.fail_puts.load(Ordering::SeqCst) {
                return Err(backend_down("put"));
            }
            self.inner.put(key, value).await
        }

        async fn evict(&self, key: &CacheKey) -> RosterResult<bool> {
            if self.fail_evicts.load(Ordering::SeqCst) {
                return Err(backend_down("evict"));
            }
            self.inner.evict(key).await
        }

        async fn stats(&self) -> RosterResult<CacheStats> {
            self.inner.stats().await
        }
    }

    fn make_flaky_service() -> (
        EmployeeService<InMemoryEmployeeStore, FlakyCacheBackend>,
        Arc<FlakyCacheBackend>,
    ) {
        let backend = Arc::new(FlakyCacheBackend::default());
        let service = EmployeeService::new(
            Arc::new(InMemoryEmployeeStore::new()),
            EmployeeCache::new(Arc::clone(&backend)),
            Arc::new(EmployeeValidator::default()),
        );
        (service, backend)
    }

    fn make_test_candidate(name: &str, email: &str) -> EmployeeDto {
        EmployeeDto {
            id: None,
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            age: Some(30),
            date_of_joining: NaiveDate::from_ymd_opt(2020, 1, 1),
            is_active: Some(true),
            salary: Some(Decimal::new(500000, 2)),
            role: Some("ENGINEER".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_caches() {
        let service = make_test_service();
        let mut candidate = make_test_candidate("Jane Doe", "jane@x.com");
        candidate.id = Some(EmployeeId::from_store(99));

        let created = service.create(candidate).await.unwrap();
        let id = created.id.unwrap();
        assert_eq!(id.get(), 1);
        assert_eq!(service.cache().get(id).await.unwrap(), Some(created.clone()));
        assert_eq!(service.get(id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_create_reports_every_violation() {
        let service = make_test_service();
        let err = service.create(EmployeeDto::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let errors = err.errors.unwrap();
        for field in ["name", "email", "age", "dateOfJoining", "isActive", "salary", "role"] {
            assert!(errors.contains_key(field), "missing {}", field);
        }
        assert!(service.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_create_duplicate_email_conflicts() {
        let service = make_test_service();
        service.create(make_test_candidate("Jane Doe", "jane@x.com")).await.unwrap();

        let err = service
            .create(make_test_candidate("John Roe", "jane@x.com"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::EntityAlreadyExists);
        assert_eq!(err.message, "Employee with email jane@x.com already exists");
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let service = make_test_service();
        let err = service.get(EmployeeId::from_store(7)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::EntityNotFound);
        assert_eq!(err.message, "Employee not found with ID: 7");
    }

    #[tokio::test]
    async fn test_update_replaces_and_keeps_own_email() {
        let service = make_test_service();
        let created = service.create(make_test_candidate("Jane Doe", "jane@x.com")).await.unwrap();
        let id = created.id.unwrap();

        let mut replacement = make_test_candidate("Janet Doe", "jane@x.com");
        replacement.age = Some(41);
        replacement.role = Some("MANAGER".to_string());

        let updated = service.update(id, replacement.clone()).await.unwrap();
        assert_eq!(updated.id, Some(id));
        assert_eq!(updated.name.as_deref(), Some("Janet Doe"));
        assert_eq!(updated.age, Some(41));

        let again = service.update(id, replacement).await.unwrap();
        assert_eq!(again, updated);
        assert_eq!(service.get(id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_to_taken_email_conflicts() {
        let service = make_test_service();
        service.create(make_test_candidate("Jane Doe", "jane@x.com")).await.unwrap();
        let john = service.create(make_test_candidate("John Roe", "john@x.com")).await.unwrap();

        let err = service
            .update(john.id.unwrap(), make_test_candidate("John Roe", "jane@x.com"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::EntityAlreadyExists);

        let stored = service.get(john.id.unwrap()).await.unwrap();
        assert_eq!(stored.email.as_deref(), Some("john@x.com"));
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let service = make_test_service();
        let err = service
            .update(EmployeeId::from_store(3), make_test_candidate("Jane Doe", "jane@x.com"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::EntityNotFound);
    }

    #[tokio::test]
    async fn test_patch_changes_only_supplied_fields() {
        let service = make_test_service();
        let created = service.create(make_test_candidate("Jane Doe", "jane@x.com")).await.unwrap();
        let id = created.id.unwrap();

        let patch: EmployeePatch = serde_json::from_value(serde_json::json!({
            "age": 45,
            "isActive": false,
            "salary": 99999.0,
            "role": "ADMIN"
        }))
        .unwrap();
        let patched = service.patch(id, patch).await.unwrap();

        assert_eq!(patched.age, Some(45));
        assert_eq!(patched.is_active, Some(false));
        assert_eq!(patched.name, created.name);
        assert_eq!(patched.salary, created.salary);
        assert_eq!(patched.role, created.role);
        assert_eq!(service.cache().get(id).await.unwrap(), Some(patched));
    }

    #[tokio::test]
    async fn test_empty_patch_is_noop() {
        let service = make_test_service();
        let created = service.create(make_test_candidate("Jane Doe", "jane@x.com")).await.unwrap();
        let patched = service
            .patch(created.id.unwrap(), EmployeePatch::new())
            .await
            .unwrap();
        assert_eq!(patched, created);
    }

    #[tokio::test]
    async fn test_patch_validates_supplied_fields() {
        let service = make_test_service();
        let created = service.create(make_test_candidate("Jane Doe", "jane@x.com")).await.unwrap();

        let err = service
            .patch(created.id.unwrap(), EmployeePatch::new().with_age(17).with_name("J"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let errors = err.errors.unwrap();
        assert!(errors.contains_key("age"));
        assert!(errors.contains_key("name"));
        assert!(!errors.contains_key("email"));
    }

    #[tokio::test]
    async fn test_patch_email_self_exclusion_and_conflict() {
        let service = make_test_service();
        let jane = service.create(make_test_candidate("Jane Doe", "jane@x.com")).await.unwrap();
        service.create(make_test_candidate("John Roe", "john@x.com")).await.unwrap();
        let id = jane.id.unwrap();

        service
            .patch(id, EmployeePatch::new().with_email("jane@x.com"))
            .await
            .unwrap();

        let err = service
            .patch(id, EmployeePatch::new().with_email("john@x.com"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::EntityAlreadyExists);
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_cache_entry() {
        let service = make_test_service();
        let created = service.create(make_test_candidate("Jane Doe", "jane@x.com")).await.unwrap();
        let id = created.id.unwrap();

        service.delete(id).await.unwrap();
        assert!(service.cache().get(id).await.unwrap().is_none());
        assert_eq!(service.get(id).await.unwrap_err().code, ErrorCode::EntityNotFound);
        assert_eq!(service.delete(id).await.unwrap_err().code, ErrorCode::EntityNotFound);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_store_unchanged() {
        let service = make_test_service();
        service.create(make_test_candidate("Jane Doe", "jane@x.com")).await.unwrap();
        let _ = service.create(make_test_candidate("John Roe", "jane@x.com")).await;

        // A rolled-back transaction must release the store for the next writer.
        let john = service.create(make_test_candidate("John Roe", "john@x.com")).await.unwrap();
        assert_eq!(john.id.map(EmployeeId::get), Some(2));
    }

    #[tokio::test]
    async fn test_committed_update_survives_failed_cache_refresh() {
        let (service, backend) = make_flaky_service();
        let created = service.create(make_test_candidate("Jane Doe", "jane@x.com")).await.unwrap();
        let id = created.id.unwrap();
        assert_eq!(service.cache().get(id).await.unwrap().and_then(|e| e.age), Some(30));

        backend.fail_puts.store(true, Ordering::SeqCst);
        let mut replacement = make_test_candidate("Jane Doe", "jane@x.com");
        replacement.age = Some(44);
        let updated = service.update(id, replacement).await.unwrap();
        assert_eq!(updated.age, Some(44));

        assert!(service.cache().get(id).await.unwrap().is_none());
        assert_eq!(service.get(id).await.unwrap().age, Some(44));
        let stored = service.store().find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.age, 44);
    }

    #[tokio::test]
    async fn test_committed_writes_never_report_cache_failures() {
        let (service, backend) = make_flaky_service();
        backend.fail_puts.store(true, Ordering::SeqCst);
        backend.fail_evicts.store(true, Ordering::SeqCst);

        let created = service.create(make_test_candidate("Jane Doe", "jane@x.com")).await.unwrap();
        let id = created.id.unwrap();
        let patched = service.patch(id, EmployeePatch::new().with_age(50)).await.unwrap();
        assert_eq!(patched.age, Some(50));
        assert_eq!(service.get(id).await.unwrap().age, Some(50));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }
}
