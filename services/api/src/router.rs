//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, the CORS policy, and OpenAPI documentation.

use crate::{
    handlers::{self, ApiError},
    models::{
        ApiInfo, AppFeatures, AppInfo, ConnectionStatus, ErrorResponse, ExerciseTypeSummary,
        GeneratePayload, HealthStatus, ServiceState, ServiceStatus,
    },
    state::AppState,
};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header},
    routing::MethodRouter,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::exercises_query,
        handlers::exercises_command,
        handlers::config_query,
        handlers::health,
    ),
    components(
        schemas(
            ErrorResponse, GeneratePayload, ExerciseTypeSummary, ConnectionStatus,
            AppInfo, AppFeatures, ApiInfo, HealthStatus, ServiceStatus, ServiceState
        )
    ),
    tags(
        (name = "LogicKids API", description = "Logic exercise generation for young children")
    )
)]
pub struct ApiDoc;

/// Answers 405 with an `Allow` header for methods a route does not serve.
fn method_not_allowed(allow: &'static str) -> MethodRouter<Arc<AppState>> {
    MethodRouter::new()
        .options(handlers::preflight)
        .fallback(move |method: Method| async move { ApiError::MethodNotAllowed { method, allow } })
}

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route(
            "/exercises",
            method_not_allowed("GET, POST, OPTIONS")
                .get(handlers::exercises_query)
                .post(handlers::exercises_command),
        )
        .route(
            "/config",
            method_not_allowed("GET, OPTIONS").get(handlers::config_query),
        )
        .route(
            "/health",
            method_not_allowed("GET, OPTIONS").get(handlers::health),
        )
        .fallback(handlers::not_found)
        .with_state(app_state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
