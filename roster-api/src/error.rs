//! Error Types for ROSTER API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use roster_core::{RosterError, StorageError, ValidationErrors};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur during API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// One or more field constraints failed
    ValidationFailed,

    /// Request is malformed: bad path id, unparsable or unknown JSON
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested entity does not exist
    EntityNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// A unique attribute is already taken by another record
    EntityAlreadyExists,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Database operation failed
    DatabaseError,

    /// Service is temporarily unavailable
    ServiceUnavailable,

    /// Database connection pool exhausted
    ConnectionPoolExhausted,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed | ErrorCode::InvalidInput | ErrorCode::MissingField => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,

            ErrorCode::EntityAlreadyExists => StatusCode::CONFLICT,

            ErrorCode::ServiceUnavailable | ErrorCode::ConnectionPoolExhausted => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            ErrorCode::InternalError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::EntityAlreadyExists => "Entity already exists",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::ConnectionPoolExhausted => "Connection pool exhausted",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error for API operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Per-field messages, only for validation failures
    pub errors: Option<BTreeMap<String, String>>,
}

/// Wire form of an [`ApiError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// RFC 3339 UTC instant the error was produced
    pub timestamp: String,
    /// Numeric HTTP status
    pub status: u16,
    /// HTTP reason phrase
    pub error: String,
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            errors: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    /// Build the response body, stamped with the current time.
    pub fn to_body(&self) -> ErrorBody {
        let status = self.status_code();
        ErrorBody {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.code,
            message: self.message.clone(),
            errors: self.errors.clone(),
        }
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create a ValidationFailed error carrying every field message.
    ///
    /// Several messages for one field are joined with `"; "`.
    pub fn validation_failed(violations: &ValidationErrors) -> Self {
        let mut errors: BTreeMap<String, String> = BTreeMap::new();
        for violation in violations.errors() {
            errors
                .entry(violation.field.to_string())
                .and_modify(|joined| {
                    joined.push_str("; ");
                    joined.push_str(&violation.message);
                })
                .or_insert_with(|| violation.message.clone());
        }
        Self {
            code: ErrorCode::ValidationFailed,
            message: ErrorCode::ValidationFailed.default_message().to_string(),
            errors: Some(errors),
        }
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    /// Create an EntityNotFound error.
    pub fn entity_not_found(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("{} not found with ID: {}", entity_type, id),
        )
    }

    /// Create an EntityAlreadyExists error for a taken unique attribute.
    pub fn entity_already_exists(
        entity_type: &str,
        attribute: &str,
        value: impl fmt::Display,
    ) -> Self {
        Self::new(
            ErrorCode::EntityAlreadyExists,
            format!("{} with {} {} already exists", entity_type, attribute, value),
        )
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a DatabaseError.
    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Create a ServiceUnavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Create a ConnectionPoolExhausted error.
    pub fn connection_pool_exhausted() -> Self {
        Self::from_code(ErrorCode::ConnectionPoolExhausted)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Implement IntoResponse for ApiError to enable automatic error handling in Axum.
///
/// ```ignore
/// async fn handler() -> Result<Json<EmployeeDto>, ApiError> {
///     Err(ApiError::entity_not_found("Employee", 7))
/// }
/// ```
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_body())).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::validation_failed(&errors)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { id, .. } => ApiError::entity_not_found("Employee", id),
            StorageError::UniqueViolation { value, .. } => {
                ApiError::entity_already_exists("Employee", "email", value)
            }
            StorageError::PoolExhausted => {
                tracing::error!("Storage error: {}", err);
                ApiError::connection_pool_exhausted()
            }
            StorageError::ConnectionFailed { .. } => {
                tracing::error!("Storage error: {}", err);
                ApiError::service_unavailable("Database is unavailable")
            }
            other => {
                tracing::error!("Storage error: {}", other);
                ApiError::database_error("Database operation failed")
            }
        }
    }
}

/// Convert from RosterError to ApiError.
///
/// Collaborator detail is logged and never sent to the client.
impl From<RosterError> for ApiError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::Validation(errors) => ApiError::validation_failed(&errors),
            RosterError::Storage(storage) => ApiError::from(storage),
            RosterError::Cache(cache) => {
                tracing::error!("Cache error: {}", cache);
                ApiError::internal_error("Internal server error")
            }
            RosterError::MissingField { field } => ApiError::missing_field(field),
            RosterError::InvalidId { raw, reason } => {
                ApiError::invalid_input(format!("Invalid employee id '{}': {}", raw, reason))
            }
        }
    }
}

/// Malformed, mistyped or unknown-key bodies all report as InvalidInput.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!("Rejected JSON body: {}", rejection.body_text());
        ApiError::invalid_input(rejection.body_text())
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
