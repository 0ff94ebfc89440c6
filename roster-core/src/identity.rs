//! Identity types for ROSTER records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RosterError;

/// Store-assigned employee identifier.
///
/// Identifiers come from a `BIGSERIAL` sequence, so valid values are
/// strictly positive. Zero and negative values are rejected at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(i64);

impl EmployeeId {
    /// Wrap a raw identifier, rejecting values the store can never assign.
    pub fn new(raw: i64) -> Result<Self, RosterError> {
        if raw <= 0 {
            return Err(RosterError::InvalidId {
                raw: raw.to_string(),
                reason: "must be a positive integer".to_string(),
            });
        }
        Ok(Self(raw))
    }

    /// Wrap a raw identifier read back from the store.
    ///
    /// The store is the only source of identifiers, so no range check applies.
    pub const fn from_store(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EmployeeId {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(RosterError::InvalidId {
                raw: s.to_string(),
                reason: "Employee ID cannot be null".to_string(),
            });
        }
        let raw = trimmed.parse::<i64>().map_err(|e| RosterError::InvalidId {
            raw: s.to_string(),
            reason: e.to_string(),
        })?;
        Self::new(raw)
    }
}

impl From<EmployeeId> for i64 {
    fn from(id: EmployeeId) -> Self {
        id.0
    }
}
