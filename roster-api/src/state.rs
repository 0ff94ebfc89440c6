//! Shared application state for Axum routers.

use axum::extract::FromRef;
use roster_storage::{CacheBackend, EmployeeStore};

use crate::services::EmployeeService;

/// State behind the employee routes.
///
/// Generic over the record store and cache backend, so the same handlers
/// serve PostgreSQL in production and the in-memory store in tests.
pub struct AppState<S: EmployeeStore, C: CacheBackend> {
    pub employees: EmployeeService<S, C>,
}

impl<S: EmployeeStore, C: CacheBackend> AppState<S, C> {
    pub fn new(employees: EmployeeService<S, C>) -> Self {
        Self { employees }
    }
}

impl<S: EmployeeStore, C: CacheBackend> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            employees: self.employees.clone(),
        }
    }
}

impl<S: EmployeeStore, C: CacheBackend> FromRef<AppState<S, C>> for EmployeeService<S, C> {
    fn from_ref(state: &AppState<S, C>) -> Self {
        state.employees.clone()
    }
}
