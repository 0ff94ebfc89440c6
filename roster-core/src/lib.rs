//! ROSTER Core - Employee Record Types
//!
//! Record shapes, identifiers, the error taxonomy shared by every other
//! crate, field validation and representation mapping. No I/O lives here.

pub mod entities;
pub mod error;
pub mod identity;
pub mod mapper;
pub mod validation;

pub use entities::{EmployeeDto, EmployeeEntity, EmployeePatch};
pub use error::{
    CacheError, FieldError, RosterError, RosterResult, StorageError, ValidationErrors,
};
pub use identity::EmployeeId;
pub use validation::{AllowedRoles, EmployeeValidator, RoleRule, DEFAULT_ROLES};
