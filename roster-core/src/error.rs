//! Error types for ROSTER operations

use std::fmt;
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Unique constraint {constraint} violated by value {value}")]
    UniqueViolation { constraint: String, value: String },

    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Cache layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend error: {reason}")]
    Backend { reason: String },

    #[error("Cache serialization error: {reason}")]
    Serialization { reason: String },

    #[error("Cache deserialization error: {reason}")]
    Deserialization { reason: String },
}

/// A single violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every constraint violation found on one candidate, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// All messages reported for one field.
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing was collected, otherwise the full set.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} violation(s): {}", self.errors.len(), joined)
    }
}

impl std::error::Error for ValidationErrors {}

/// Master error type for all ROSTER errors.
#[derive(Debug, Clone, Error)]
pub enum RosterError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Required field missing: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid employee id '{raw}': {reason}")]
    InvalidId { raw: String, reason: String },
}

/// Result type alias for ROSTER operations.
pub type RosterResult<T> = Result<T, RosterError>;

// =============================================================================
// TESTS
// =============================================================================
