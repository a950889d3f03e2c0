//! Turning [`FormDesignerError`]s into HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use form_designer_core::FormDesignerError;

/// An error returned from a handler. Rendered as JSON with the status of
/// the underlying error; validation errors include their per-field messages.
#[derive(Debug)]
pub struct ErrorResponse(pub FormDesignerError);

impl From<FormDesignerError> for ErrorResponse {
    fn from(err: FormDesignerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = match &self.0 {
            FormDesignerError::ValidationError(err) if !err.field_errors.is_empty() => {
                serde_json::json!({
                    "error": "Validation failed",
                    "field_errors": err.messages_by_field(),
                })
            }
            other => serde_json::json!({ "error": other.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}

/// Result type of the JSON handlers.
pub type HandlerResult<T> = Result<T, ErrorResponse>;
