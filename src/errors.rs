use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::dashboard::FilterError;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Field name to message map returned with 422 responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(field, message)| (field.as_str(), message.as_str()))
    }

    /// Fills in `defaults` for fields the server did not report. Server messages win.
    pub fn merge_defaults(mut self, defaults: FieldErrors) -> FieldErrors {
        for (field, message) in defaults.0 {
            self.0.entry(field).or_insert(message);
        }
        self
    }
}

impl From<&validator::ValidationErrors> for FieldErrors {
    fn from(errors: &validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, failures) in errors.field_errors() {
            if let Some(failure) = failures.first() {
                let message = failure
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| format!("{} is invalid ({})", field, failure.code));
                fields.insert(field, message);
            }
        }
        fields
    }
}

/// Error body for every non-2xx response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Unprocessable Entity",
    "message": "Validation failed",
    "fields": { "postal_code": "Postal code must be 5 digits" },
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Per-field validation messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed")]
    InvalidFields(FieldErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::InvalidFields(FieldErrors::from(&err))
    }
}

impl From<FilterError> for ServiceError {
    fn from(err: FilterError) -> Self {
        ServiceError::BadRequest(err.to_string())
    }
}

impl ServiceError {
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::InvalidFields(FieldErrors::single(field, message))
    }

    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidFields(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Message safe to return to callers. Internal failures are reported generically.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let message = self.response_message();
        let fields = match self {
            ServiceError::InvalidFields(fields) => Some(fields),
            _ => None,
        };

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            details: None,
            fields,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppError = ServiceError;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::Validate;

    #[derive(Validate)]
    struct ContactForm {
        #[validate(length(min = 5, message = "Postal code must be 5 digits"))]
        postal_code: String,
        #[validate(email)]
        email: String,
    }

    #[tokio::test]
    async fn error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert!(payload.fields.is_none());
    }

    #[tokio::test]
    async fn validation_failures_map_to_422_with_fields() {
        let form = ContactForm {
            postal_code: "123".into(),
            email: "not-an-email".into(),
        };
        let error: ServiceError = form.validate().unwrap_err().into();
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        let fields = payload.fields.unwrap();
        assert_eq!(fields.get("postal_code"), Some("Postal code must be 5 digits"));
        assert_eq!(fields.get("email"), Some("email is invalid (email)"));
    }

    #[test]
    fn server_messages_win_over_defaults() {
        let server = FieldErrors::single("city", "City is required");
        let mut defaults = FieldErrors::new();
        defaults.insert("city", "Check the city");
        defaults.insert("street", "Check the street");

        let merged = server.merge_defaults(defaults);
        assert_eq!(merged.get("city"), Some("City is required"));
        assert_eq!(merged.get("street"), Some("Check the street"));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(ServiceError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ServiceError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ServiceError::InvalidFields(FieldErrors::new()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::from(FilterError::MissingCustomDates).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_details_are_not_leaked() {
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("secret dsn".into())).response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::InternalError("stack".into()).response_message(),
            "Internal server error"
        );
    }
}
