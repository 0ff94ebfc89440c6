//! Employee REST API Routes
//!
//! Thin adapters from HTTP onto [`EmployeeService`]. Path ids and JSON
//! bodies are parsed by the crate's extractors, so every rejection carries
//! the standard error body.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use roster_core::{EmployeeDto, EmployeePatch};
use roster_storage::{CacheBackend, EmployeeStore};

use crate::{
    error::ApiResult,
    extractors::{JsonBody, PathId},
    services::EmployeeService,
    state::AppState,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/employee - List every employee
pub async fn list_employees<S: EmployeeStore, C: CacheBackend>(
    State(service): State<EmployeeService<S, C>>,
) -> ApiResult<Json<Vec<EmployeeDto>>> {
    Ok(Json(service.list().await?))
}

/// GET /api/v1/employee/{id} - Get one employee
pub async fn get_employee<S: EmployeeStore, C: CacheBackend>(
    State(service): State<EmployeeService<S, C>>,
    PathId(id): PathId,
) -> ApiResult<Json<EmployeeDto>> {
    Ok(Json(service.get(id).await?))
}

/// POST /api/v1/employee - Create an employee
pub async fn create_employee<S: EmployeeStore, C: CacheBackend>(
    State(service): State<EmployeeService<S, C>>,
    JsonBody(candidate): JsonBody<EmployeeDto>,
) -> ApiResult<impl IntoResponse> {
    let created = service.create(candidate).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/v1/employee/{id} - Replace an employee
pub async fn update_employee<S: EmployeeStore, C: CacheBackend>(
    State(service): State<EmployeeService<S, C>>,
    PathId(id): PathId,
    JsonBody(candidate): JsonBody<EmployeeDto>,
) -> ApiResult<Json<EmployeeDto>> {
    Ok(Json(service.update(id, candidate).await?))
}

/// PATCH /api/v1/employee/{id} - Update name, email, age or isActive
pub async fn patch_employee<S: EmployeeStore, C: CacheBackend>(
    State(service): State<EmployeeService<S, C>>,
    PathId(id): PathId,
    JsonBody(patch): JsonBody<EmployeePatch>,
) -> ApiResult<Json<EmployeeDto>> {
    Ok(Json(service.patch(id, patch).await?))
}

/// DELETE /api/v1/employee/{id} - Delete an employee
pub async fn delete_employee<S: EmployeeStore, C: CacheBackend>(
    State(service): State<EmployeeService<S, C>>,
    PathId(id): PathId,
) -> ApiResult<StatusCode> {
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router<S: EmployeeStore, C: CacheBackend>() -> Router<AppState<S, C>> {
    Router::new()
        .route(
            "/",
            get(list_employees::<S, C>).post(create_employee::<S, C>),
        )
        .route(
            "/:id",
            get(get_employee::<S, C>)
                .put(update_employee::<S, C>)
                .patch(patch_employee::<S, C>)
                .delete(delete_employee::<S, C>),
        )
}
