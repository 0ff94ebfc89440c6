//! Typed cache keys.

use std::fmt;

use roster_core::EmployeeId;

use super::traits::CacheableEntity;

/// Key of one cached record: the entity namespace plus its id.
///
/// Keys can only be built for a [`CacheableEntity`] type, so the namespace
/// always matches the value stored under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: &'static str,
    id: i64,
}

impl CacheKey {
    pub fn of<T: CacheableEntity>(id: i64) -> Self {
        Self {
            namespace: T::NAMESPACE,
            id,
        }
    }

    /// Key of a cached employee record.
    pub fn employee(id: EmployeeId) -> Self {
        Self::of::<roster_core::EmployeeDto>(id.get())
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Backend key, e.g. `roster:employees::42`.
    pub fn encode(&self, prefix: &str) -> String {
        format!("{}:{}", prefix, self)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.namespace, self.id)
    }
}
