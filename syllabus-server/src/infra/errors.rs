use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use std::fmt;
use tracing::error;

use syllabus_core::{CatalogError, ValidationErrors};

pub type AppResult<T> = Result<T, AppError>;

/// Error half of the response envelope.
///
/// Serialized as `{"status": "error", "message": ..}` plus `errors` for
/// field-level validation failures and `error` for the underlying cause of
/// an unexpected failure.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub error: Option<String>,
    pub errors: Option<ValidationErrors>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error: None,
            errors: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: errors.to_string(),
            error: None,
            errors: Some(errors),
        }
    }

    /// 500 with `Failed to <action>` and the cause in `error`.
    pub fn failed(action: &str, cause: impl fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("Failed to {action}"),
            error: Some(cause.to_string()),
            errors: None,
        }
    }

    /// Map a core error, naming the attempted action for unexpected failures.
    pub fn from_catalog(err: CatalogError, action: &str) -> Self {
        match err {
            CatalogError::Validation(errors) => Self::validation(errors),
            CatalogError::NotFound(message) => Self::not_found(message),
            CatalogError::Conflict(message) => Self::conflict(message),
            other => {
                error!(action, error = %other, "request failed");
                Self::failed(action, other)
            }
        }
    }

    fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("status".into(), json!("error"));
        body.insert("message".into(), json!(self.message));
        if let Some(errors) = &self.errors {
            body.insert("errors".into(), json!(errors));
        }
        if let Some(cause) = &self.error {
            body.insert("error".into(), json!(cause));
        }
        Value::Object(body)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

/// Attach the attempted action to a core result.
pub trait ResultExt<T> {
    fn or_fail(self, action: &str) -> AppResult<T>;
}

impl<T> ResultExt<T> for syllabus_core::Result<T> {
    fn or_fail(self, action: &str) -> AppResult<T> {
        self.map_err(|err| AppError::from_catalog(err, action))
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        Self::from_catalog(err, "process the request")
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation(errors)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        error!(error = ?err, "unexpected failure");
        Self::failed("process the request", err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::from(CatalogError::from(err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(ValidationErrors::single("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(ValidationErrors::single("query", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        Self::not_found("Resource not found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_render_field_map() {
        let err = AppError::from(ValidationErrors::single(
            "name",
            "The name field is required.",
        ));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.body(),
            json!({
                "status": "error",
                "message": "The name field is required.",
                "errors": {"name": ["The name field is required."]}
            })
        );
    }

    #[test]
    fn catalog_errors_map_to_statuses() {
        let missing = AppError::from_catalog(
            CatalogError::not_found("Video not found in this course"),
            "retrieve video",
        );
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.message, "Video not found in this course");

        let conflict =
            AppError::from_catalog(CatalogError::Conflict("taken".into()), "create category");
        assert_eq!(conflict.status, StatusCode::CONFLICT);
    }

    #[test]
    fn unexpected_errors_name_the_action() {
        let err = AppError::from_catalog(
            CatalogError::Internal("pool closed".into()),
            "create category",
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.body();
        assert_eq!(body["message"], "Failed to create category");
        assert_eq!(body["error"], "Internal error: pool closed");
        assert!(body.get("errors").is_none());
    }
}
