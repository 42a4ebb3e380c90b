//! API error types and GateError to HTTP status mapping.

use bytes::Bytes;
use changegate_core::error::GateError;
use http_body_util::Full;
use hyper::{Response, StatusCode};

use super::response;

/// API error with HTTP status code and error code.
#[derive(Debug)]
pub struct ApiError {
    /// Error code (e.g., "E302").
    pub code: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// HTTP status code.
    pub status: StatusCode,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: &'static str, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            code,
            message: message.into(),
            status,
        }
    }

    /// Create a 400 Bad Request error.
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, message, StatusCode::BAD_REQUEST)
    }

    /// Create a 404 Not Found error.
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, message, StatusCode::NOT_FOUND)
    }

    /// Create a 413 Payload Too Large error.
    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            "E301",
            format!("Request body exceeds {} bytes", limit),
            StatusCode::PAYLOAD_TOO_LARGE,
        )
    }

    /// Create a 500 Internal Server Error.
    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Convert to HTTP response.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let body = serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message,
                "status": self.status.as_u16()
            }
        });
        response::json_response(self.status, &body)
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        let code = err.code();
        let message = err.to_string();

        let status = match &err {
            // 404 Not Found
            GateError::UnknownToken { .. } | GateError::ExecutionNotFound { .. } => {
                StatusCode::NOT_FOUND
            }

            // 409 Conflict
            GateError::DuplicateToken { .. }
            | GateError::DuplicateDelivery { .. }
            | GateError::Cancelled { .. } => StatusCode::CONFLICT,

            // 400 Bad Request
            GateError::InvalidToken { .. }
            | GateError::Validation { .. }
            | GateError::MalformedPayload { .. }
            | GateError::EndpointNotConfigured { .. }
            | GateError::ConfigValue { .. }
            | GateError::YamlParse { .. } => StatusCode::BAD_REQUEST,

            // 502 Bad Gateway (change-control system misbehaved)
            GateError::SubmissionFailed { .. }
            | GateError::SubmissionRejected { .. }
            | GateError::Authentication { .. }
            | GateError::Network { .. } => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error (everything else)
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self {
            code,
            message,
            status,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
