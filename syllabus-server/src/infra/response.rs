use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use syllabus_core::query::Page;

use super::errors::AppResult;

/// Success half of the response envelope: `{status, message?, data, meta?}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    code: StatusCode,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<Value>,
}

pub type ApiResult<T> = AppResult<ApiResponse<T>>;

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: StatusCode::OK,
            status: "success",
            message: None,
            data,
            meta: None,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            code: StatusCode::CREATED,
            ..Self::success(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_meta(mut self, meta: impl Serialize) -> Self {
        self.meta = match serde_json::to_value(meta) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(error = %err, "dropping unserializable response meta");
                None
            }
        };
        self
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn data(&self) -> &T {
        &self.data
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// Page items as `data`, pagination as `meta`.
    pub fn page(page: Page<T>) -> Self {
        Self::success(page.items).with_meta(page.meta)
    }
}

impl ApiResponse<()> {
    /// `data: null` with a message; used by deletes and reorders.
    pub fn done(message: impl Into<String>) -> Self {
        Self::success(()).with_message(message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use syllabus_core::query::{PageLimits, PageRequest};

    #[test]
    fn page_envelope_carries_meta() {
        let request = PageRequest::new(Some(2), Some(2), PageLimits::new(20, 100));
        let response = ApiResponse::page(Page::new(vec!["a", "b"], request, 5))
            .with_message("Categories retrieved successfully");

        assert_eq!(response.code(), StatusCode::OK);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "status": "success",
                "message": "Categories retrieved successfully",
                "data": ["a", "b"],
                "meta": {"current_page": 2, "per_page": 2, "total": 5, "last_page": 3}
            })
        );
    }

    #[test]
    fn created_and_done_shapes() {
        let created = ApiResponse::created(json!({"id": 1}));
        assert_eq!(created.code(), StatusCode::CREATED);

        let done = ApiResponse::done("Category deleted successfully");
        assert_eq!(
            serde_json::to_value(&done).unwrap(),
            json!({
                "status": "success",
                "message": "Category deleted successfully",
                "data": null
            })
        );
    }
}
