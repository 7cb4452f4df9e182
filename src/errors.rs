use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Standard error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request ({code}): {message}")]
    BadRequest { code: &'static str, message: String },

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        AppError::BadRequest {
            code,
            message: message.into(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::BadRequest { code, .. } => code,
            AppError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::InternalError(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::ExternalServiceError(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!("internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = ErrorResponse {
            error_code: self.error_code().to_string(),
            message,
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_carries_its_own_code() {
        let err = AppError::bad_request("DURATION_TOO_LONG", "too long");
        assert_eq!(err.error_code(), "DURATION_TOO_LONG");
    }

    #[test]
    fn test_external_service_error_code() {
        let err = AppError::ExternalServiceError("boom".to_string());
        assert_eq!(err.error_code(), "EXTERNAL_SERVICE_ERROR");
    }
}
