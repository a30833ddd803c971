//! API Models
//!
//! Request payloads and response bodies for the HTTP surface. Every JSON
//! response is wrapped in the `{success, data?, message?, error?}` envelope.

use chrono::{DateTime, Utc};
use logickids_core::catalog::ExerciseTypeDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

/// Successful response envelope.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

/// Failed response envelope.
#[derive(Serialize, ToSchema, Debug)]
pub struct ErrorResponse {
    #[schema(example = false)]
    pub success: bool,
    pub error: String,
    /// Underlying cause, for operators.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// The `action` query parameter used to dispatch on every endpoint.
#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct ActionQuery {
    /// The operation to perform, e.g. `types` or `generate`.
    pub action: Option<String>,
}

/// Body of `POST /exercises?action=generate`.
#[derive(Deserialize, ToSchema, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePayload {
    #[schema(example = "3-4")]
    pub age_group_id: Option<String>,
    #[schema(example = json!(["counting", "matching"]))]
    pub exercise_type_ids: Option<Vec<String>>,
    /// Exercises per type, 1 to 10. Defaults to 5.
    #[schema(value_type = Option<i64>, example = 5)]
    pub count: Option<Value>,
}

/// Public view of an exercise type.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ExerciseTypeSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
}

impl From<&ExerciseTypeDefinition> for ExerciseTypeSummary {
    fn from(def: &ExerciseTypeDefinition) -> Self {
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            description: def.description.clone(),
            icon: def.icon.clone(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub message: String,
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AppFeatures {
    pub max_exercises_per_request: i64,
    pub supported_age_groups: Vec<String>,
    pub supported_exercise_types: Vec<String>,
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApiInfo {
    pub base_url: String,
    pub version: String,
}

/// Static application metadata served by `GET /config?action=app`.
#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub app_name: String,
    pub version: String,
    pub description: String,
    pub features: AppFeatures,
    pub api: ApiInfo,
}

#[derive(Serialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Configured,
    NotConfigured,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ServiceStatus {
    pub gemini: ServiceState,
}

/// Liveness payload.
#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    #[schema(example = "healthy")]
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    pub uptime_seconds: u64,
    pub services: ServiceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use logickids_core::catalog::Catalog;
    use serde_json::json;

    #[test]
    fn test_api_response_serialization() {
        let json = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(json, json!({"success": true, "data": [1, 2]}));

        let json = serde_json::to_value(ApiResponse::with_message("x", "Xong")).unwrap();
        assert_eq!(json, json!({"success": true, "data": "x", "message": "Xong"}));
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            success: false,
            error: "Độ tuổi không hợp lệ".to_string(),
            details: None,
        };

        let json = serde_json::to_string(&error).unwrap();
        let expected = r#"{"success":false,"error":"Độ tuổi không hợp lệ"}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn test_generate_payload_deserialization() {
        let json = r#"{"ageGroupId": "3-4", "exerciseTypeIds": ["counting"], "count": 2}"#;
        let payload: GeneratePayload = serde_json::from_str(json).unwrap();

        assert_eq!(payload.age_group_id.as_deref(), Some("3-4"));
        assert_eq!(payload.exercise_type_ids, Some(vec!["counting".to_string()]));
        assert_eq!(payload.count, Some(json!(2)));
    }

    #[test]
    fn test_generate_payload_missing_fields() {
        let payload: GeneratePayload = serde_json::from_str("{}").unwrap();
        assert!(payload.age_group_id.is_none());
        assert!(payload.exercise_type_ids.is_none());
        assert!(payload.count.is_none());
    }

    #[test]
    fn test_generate_payload_rejects_non_array_types() {
        let json = r#"{"ageGroupId": "3-4", "exerciseTypeIds": "counting"}"#;
        assert!(serde_json::from_str::<GeneratePayload>(json).is_err());
    }

    #[test]
    fn test_exercise_type_summary_hides_tuning() {
        let catalog = Catalog::standard();
        let summary = ExerciseTypeSummary::from(catalog.exercise_type("matching").unwrap());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            json,
            json!({
                "id": "matching",
                "name": "Nối hình giống nhau",
                "description": "Nối các hình giống nhau hoặc có mối liên hệ",
                "icon": "🔗"
            })
        );
    }

    #[test]
    fn test_health_status_serialization() {
        let health = HealthStatus {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            environment: "test".to_string(),
            uptime_seconds: 12,
            services: ServiceStatus {
                gemini: ServiceState::NotConfigured,
            },
        };

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["uptimeSeconds"], 12);
        assert_eq!(json["services"]["gemini"], "not_configured");
    }
}
