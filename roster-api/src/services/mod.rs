//! Service Layer
//!
//! Business logic behind the HTTP handlers. Services own validation,
//! transactions and cache upkeep, keeping handlers as thin adapters.

mod employee_service;

pub use employee_service::*;
