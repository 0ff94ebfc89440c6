//! REST API Routes Module
//!
//! Includes:
//! - Employee CRUD routes under `/api/v1/employee`
//! - Health check endpoints (Kubernetes-compatible)
//! - Prometheus scrape endpoint at `/metrics`
//! - CORS, request timeout and tracing layers

pub mod employee;
pub mod health;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use roster_storage::{CacheBackend, EmployeeStore};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::services::EmployeeService;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use employee::create_router as employee_router;
pub use health::create_router as health_router;

/// Mount point of the employee routes.
pub const EMPLOYEE_BASE_PATH: &str = "/api/v1/employee";

// ============================================================================
// ROUTER ASSEMBLY
// ============================================================================

/// Build the complete application router.
pub fn create_api_router<S, C>(service: EmployeeService<S, C>, config: &ApiConfig) -> Router
where
    S: EmployeeStore,
    C: CacheBackend,
{
    let store = Arc::clone(service.store());
    let employees = employee::create_router::<S, C>().with_state(AppState::new(service));

    Router::new()
        .nest(EMPLOYEE_BASE_PATH, employees)
        .nest("/health", health::create_router(store))
        .route("/metrics", get(metrics_handler))
        .layer(from_fn(observability_middleware))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cached_db::EmployeeCache;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use roster_core::EmployeeValidator;
    use roster_storage::{CacheConfig, InMemoryCacheBackend, InMemoryEmployeeStore};
    use tower::ServiceExt;

    fn make_test_router(config: &ApiConfig) -> Router {
        let service = EmployeeService::new(
            Arc::new(InMemoryEmployeeStore::new()),
            EmployeeCache::new(Arc::new(InMemoryCacheBackend::new(CacheConfig::default()))),
            Arc::new(EmployeeValidator::default()),
        );
        create_api_router(service, config)
    }

    #[tokio::test]
    async fn test_router_mounts_every_surface() {
        let router = make_test_router(&ApiConfig::default());
        for uri in [EMPLOYEE_BASE_PATH, "/health/ping", "/health/ready", "/metrics"] {
            let response = router
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let router = make_test_router(&ApiConfig::default());
        let response = router
            .oneshot(Request::builder().uri("/api/v2/employee").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let config = ApiConfig {
            cors_origins: vec!["https://hr.example".to_string()],
            ..ApiConfig::default()
        };
        let router = make_test_router(&config);
        let response = router
            .oneshot(
                Request::builder()
                    .uri(EMPLOYEE_BASE_PATH)
                    .header(header::ORIGIN, "https://hr.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("https://hr.example"))
        );
    }
}
