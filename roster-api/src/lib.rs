//! ROSTER API - REST Layer for Employee Records
//!
//! Axum routes over a generic lifecycle service. The service validates
//! candidates, enforces email uniqueness inside store transactions and keeps
//! a TTL cache of external representations fresh after every write.
//!
//! The PostgreSQL store lives in [`db`]; the in-memory store and the cache
//! backends come from `roster-storage`.

pub mod cached_db;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use cached_db::EmployeeCache;
pub use config::{ApiConfig, CacheBackendKind, StoreKind};
pub use db::{DbClient, DbConfig, PgTransaction};
pub use error::{ApiError, ApiResult, ErrorBody, ErrorCode};
pub use routes::{create_api_router, EMPLOYEE_BASE_PATH};
pub use services::EmployeeService;
pub use state::AppState;
