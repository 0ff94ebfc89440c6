use std::sync::Arc;

use axum::Router;
use roster_api::{create_api_router, ApiConfig, EmployeeCache, EmployeeService};
use roster_core::EmployeeValidator;
use roster_storage::{InMemoryCacheBackend, InMemoryEmployeeStore};
use roster_test_utils::in_memory_backends;

pub type TestService = EmployeeService<InMemoryEmployeeStore, InMemoryCacheBackend>;

/// Lifecycle service over a fresh in-memory store and cache.
pub fn test_service() -> TestService {
    let (store, cache) = in_memory_backends();
    EmployeeService::new(
        store,
        EmployeeCache::new(cache),
        Arc::new(EmployeeValidator::default()),
    )
}

/// Full application router over `service`.
#[allow(dead_code)]
pub fn test_router(service: TestService) -> Router {
    create_api_router(service, &ApiConfig::default())
}
