//! Custom path extractor for employee ids.
//!
//! Provides `PathId`, which parses the `:id` path segment into an
//! [`EmployeeId`] and rejects with the standard error body.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use roster_core::EmployeeId;

use crate::error::ApiError;

/// Extractor for a type-safe employee id from the path.
///
/// Unlike `Path<i64>`, a malformed, zero or negative id is rejected as
/// `InvalidInput` before any handler code runs, so neither the store nor the
/// cache is touched.
///
/// # Example
///
/// ```rust,ignore
/// async fn get_employee(
///     State(state): State<EmployeeState<S, C>>,
///     PathId(id): PathId,
/// ) -> ApiResult<Json<EmployeeDto>> {
///     Ok(Json(state.service.get(id).await?))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PathId(pub EmployeeId);

#[async_trait]
impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                ApiError::invalid_input(format!("Failed to extract employee id from path: {}", e))
            })?;

        let id = raw.parse::<EmployeeId>().map_err(|e| {
            tracing::warn!(path_param = %raw, "Rejected employee id");
            ApiError::from(e)
        })?;
        Ok(PathId(id))
    }
}
