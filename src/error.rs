//! Hub error types with HTTP status code mapping.
//!
//! [`HubError`] is the central error type. Each variant maps to a specific
//! HTTP status code and structured JSON error response. Delivery to an
//! unknown or departed client is not an error anywhere in the core; only the
//! HTTP close endpoint reports it, as [`HubError::ClientNotFound`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ClientId, EncodeError};

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "message": "client already connected: 1"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Hub error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | Client state    | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// A live connection is already registered under this id.
    #[error("client already connected: {0}")]
    DuplicateClient(ClientId),

    /// No connection is registered under this id.
    #[error("client not connected: {0}")]
    ClientNotFound(ClientId),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The event could not be encoded as a frame.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Encode(_) => 1002,
            Self::ClientNotFound(_) => 2001,
            Self::DuplicateClient(_) => 2002,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::Encode(_) => StatusCode::BAD_REQUEST,
            Self::ClientNotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateClient(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_maps_to_conflict() {
        let err = HubError::DuplicateClient(ClientId::from("1"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), 2002);
        assert_eq!(err.to_string(), "client already connected: 1");
    }

    #[test]
    fn encode_error_converts_and_maps_to_bad_request() {
        let encode = EncodeError::InvalidField {
            field: "id",
            value: "a\nb".to_string(),
        };
        let err = HubError::from(encode);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), 1002);
    }

    #[test]
    fn response_carries_status() {
        let response = HubError::ClientNotFound(ClientId::from("x")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
