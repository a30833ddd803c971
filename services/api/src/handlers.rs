//! Axum Handlers for the REST API
//!
//! Every endpoint dispatches on the `action` query parameter. Handlers use
//! `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Query, State, rejection::JsonRejection},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use logickids_core::{
    aggregator::{GenerateError, TypeFailure},
    request::{ExerciseCount, GenerationRequest, RequestError},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    models::{
        ActionQuery, ApiInfo, ApiResponse, AppFeatures, AppInfo, ConnectionStatus, ErrorResponse,
        ExerciseTypeSummary, GeneratePayload, HealthStatus, ServiceState, ServiceStatus,
    },
    state::AppState,
};

pub const APP_NAME: &str = "LogicKids AI";
pub const APP_DESCRIPTION: &str = "Nền tảng tạo bài tập logic cho trẻ em";
pub const API_VERSION: &str = "v1";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    MethodNotAllowed { method: Method, allow: &'static str },
    NotConfigured,
    GenerationExhausted(Vec<TypeFailure>),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::NotConfigured | ApiError::GenerationExhausted(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, details) = match &self {
            ApiError::BadRequest(message) => (message.clone(), None),
            ApiError::NotFound => ("Endpoint không tồn tại".to_string(), None),
            ApiError::MethodNotAllowed { method, .. } => {
                (format!("Phương thức {} không được hỗ trợ", method), None)
            }
            ApiError::NotConfigured => (
                "Gemini API chưa được cấu hình. Vui lòng kiểm tra GEMINI_API_KEY.".to_string(),
                None,
            ),
            ApiError::GenerationExhausted(failures) => {
                error!(?failures, "Exercise generation exhausted every type");
                (
                    "Không thể tạo bài tập nào. Vui lòng thử lại sau.".to_string(),
                    serde_json::to_value(failures).ok(),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error,
            details,
        });

        match self {
            ApiError::MethodNotAllowed { allow, .. } => {
                (status, [(header::ALLOW, allow)], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::InvalidRequest(e) => e.into(),
            GenerateError::Exhausted { failures } => Self::GenerationExhausted(failures),
        }
    }
}

fn invalid_action(allowed: &str) -> ApiError {
    ApiError::BadRequest(format!("Action không hợp lệ. Sử dụng: {}", allowed))
}

/// Reads `count` leniently: absent means the default, and numeric
/// strings are accepted. Anything else must be an integer in 1..=10.
pub fn parse_count(raw: Option<&Value>) -> Result<ExerciseCount, RequestError> {
    let value = match raw {
        None | Some(Value::Null) => return Ok(ExerciseCount::DEFAULT),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| RequestError::InvalidCount(n.to_string()))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| RequestError::InvalidCount(s.clone()))?,
        Some(other) => return Err(RequestError::InvalidCount(other.to_string())),
    };
    ExerciseCount::new(value)
}

fn into_request(payload: GeneratePayload) -> Result<GenerationRequest, RequestError> {
    let (Some(age_group_id), Some(exercise_type_ids)) =
        (payload.age_group_id, payload.exercise_type_ids)
    else {
        return Err(RequestError::MissingFields);
    };
    let count = parse_count(payload.count.as_ref())?;
    Ok(GenerationRequest {
        age_group_id,
        exercise_type_ids,
        count,
    })
}

/// Read-only exercise queries: `types`, `age-groups`, `test-connection`.
#[utoipa::path(
    get,
    path = "/exercises",
    params(ActionQuery),
    responses(
        (status = 200, description = "Exercise types, age groups, or connection status"),
        (status = 400, description = "Missing or unknown action", body = ErrorResponse),
        (status = 500, description = "Generation endpoint not configured", body = ErrorResponse)
    )
)]
pub async fn exercises_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActionQuery>,
) -> Result<Response, ApiError> {
    match query.action.as_deref() {
        Some("types") => {
            let types: Vec<ExerciseTypeSummary> = state
                .catalog
                .exercise_types()
                .iter()
                .map(ExerciseTypeSummary::from)
                .collect();
            Ok(Json(ApiResponse::with_message(
                types,
                "Lấy danh sách loại bài tập thành công",
            ))
            .into_response())
        }
        Some("age-groups") => Ok(Json(ApiResponse::with_message(
            state.catalog.age_groups().to_vec(),
            "Lấy danh sách độ tuổi thành công",
        ))
        .into_response()),
        Some("test-connection") => {
            let generator = state.generator.as_ref().ok_or(ApiError::NotConfigured)?;
            let connected = generator.test_connection().await;
            let message = if connected {
                "Kết nối Gemini API thành công"
            } else {
                "Không thể kết nối Gemini API"
            };
            info!(connected, "Connection test finished");
            Ok(Json(ApiResponse::ok(ConnectionStatus {
                connected,
                message: message.to_string(),
            }))
            .into_response())
        }
        _ => Err(invalid_action("types, age-groups hoặc test-connection")),
    }
}

/// Generate exercises for an age group and a list of exercise types.
#[utoipa::path(
    post,
    path = "/exercises",
    params(ActionQuery),
    request_body = GeneratePayload,
    responses(
        (status = 200, description = "Exercises generated; data holds the exercises and metadata"),
        (status = 400, description = "Invalid action or request body", body = ErrorResponse),
        (status = 500, description = "Not configured, or no exercise could be generated", body = ErrorResponse)
    )
)]
pub async fn exercises_command(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActionQuery>,
    payload: Result<Json<GeneratePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    if query.action.as_deref() != Some("generate") {
        return Err(invalid_action("generate"));
    }

    let Json(payload) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Rejected generate request body");
        ApiError::BadRequest(format!(
            "Dữ liệu gửi lên không hợp lệ: {}",
            rejection.body_text()
        ))
    })?;

    let request = into_request(payload)?;
    // Validate ids before touching the generation endpoint.
    let resolved = state.catalog.resolve(&request)?;

    let generator = state.generator.as_ref().ok_or(ApiError::NotConfigured)?;
    let envelope = generator.generate_resolved(&resolved).await?;

    let message = format!("Đã tạo thành công {} bài tập", envelope.metadata.total_count);
    Ok(Json(ApiResponse::with_message(envelope, message)).into_response())
}

/// Application metadata (`app`) and health (`health`).
#[utoipa::path(
    get,
    path = "/config",
    params(ActionQuery),
    responses(
        (status = 200, description = "Application metadata or health status"),
        (status = 400, description = "Missing or unknown action", body = ErrorResponse)
    )
)]
pub async fn config_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActionQuery>,
) -> Result<Response, ApiError> {
    match query.action.as_deref() {
        Some("app") => {
            let info = AppInfo {
                app_name: APP_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: APP_DESCRIPTION.to_string(),
                features: AppFeatures {
                    max_exercises_per_request: ExerciseCount::MAX,
                    supported_age_groups: state.catalog.age_group_ids().map(String::from).collect(),
                    supported_exercise_types: state
                        .catalog
                        .exercise_type_ids()
                        .map(String::from)
                        .collect(),
                },
                api: ApiInfo {
                    base_url: state.config.public_base_url.clone(),
                    version: API_VERSION.to_string(),
                },
            };
            Ok(Json(ApiResponse::with_message(
                info,
                "Lấy cấu hình ứng dụng thành công",
            ))
            .into_response())
        }
        Some("health") => Ok(Json(ApiResponse::with_message(
            health_status(&state),
            "Hệ thống hoạt động bình thường",
        ))
        .into_response()),
        _ => Err(invalid_action("app hoặc health")),
    }
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = HealthStatus)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::with_message(
        health_status(&state),
        "LogicKids AI Server đang hoạt động",
    ))
}

fn health_status(state: &AppState) -> HealthStatus {
    HealthStatus {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        environment: state.config.environment.clone(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        services: ServiceStatus {
            gemini: if state.generator.is_some() {
                ServiceState::Configured
            } else {
                ServiceState::NotConfigured
            },
        },
    }
}

/// CORS preflight without CORS headers still gets an empty 200.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
