//! HTTP request handlers for the mailspool API.
//!
//! Handlers are grouped by functionality:
//! - `inbound` - notification ingestion (the durability-critical path)
//! - `messages` - list/get/delete over spooled artifacts
//! - `session` - root greeting and cookie logout
//! - `health` - health check and readiness probes
//!
//! All handlers surface failures as standardized JSON error bodies
//! with a stable code from the core taxonomy and the matching HTTP
//! status: 403 for auth and permission failures, 400 for malformed
//! payloads, 404 for missing artifacts, 500 for storage failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mailspool_core::Error;
use serde::Serialize;

pub mod health;
pub mod inbound;
pub mod messages;
pub mod session;

pub use health::{health_check, liveness_check, readiness_check};
pub use inbound::inbound_notification;
pub use messages::{delete_message, get_message, list_messages};
pub use session::{logout, root};

/// Error response body with code and message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details including code and message.
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Stable code from the core error taxonomy.
    pub code: String,
    /// Human-readable error description.
    pub message: String,
}

/// Wrapper mapping core errors onto HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Unauthorized | Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Storage(_) | Error::ArtifactExists { .. } | Error::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorDetail { code: self.0.code().to_string(), message: self.0.to_string() },
        };
        (status, Json(body)).into_response()
    }
}
