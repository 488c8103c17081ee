// crates/leap-server/src/error.rs
// ============================================================================
// Module: LEAP HTTP Errors
// Description: Status-coded API errors rendered as `{"detail": ...}`.
// Purpose: Map core failures onto HTTP status codes in one place.
// Dependencies: axum, leap-core, serde_json, tracing
// ============================================================================

//! ## Overview
//! Every handler returns [`ApiError`] on failure. Conversions from the core
//! error enums fix the status code: malformed input is 400, unregistered
//! callers are 403, missing experiments and students are 404, duplicates are
//! 409, handler failures are 500 and unreachable storage is 503.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use leap_core::RegistryError;
use leap_core::RpcError;
use leap_core::StoreError;
use leap_core::StudentError;
use serde_json::json;
use tracing::warn;

// ============================================================================
// SECTION: Api Error
// ============================================================================

/// HTTP error with a status code and a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Response status.
    status: StatusCode,
    /// Message placed under `detail`.
    detail: String,
}

impl ApiError {
    /// Builds an error with an explicit status.
    #[must_use]
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    /// 500 Internal Server Error.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }

    /// Returns the response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the detail message.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = self.status.as_u16(), detail = %self.detail, "request failed");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

impl From<RpcError> for ApiError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::UnknownFunction(_) | RpcError::InvalidIdentity(_) => {
                Self::bad_request(err.to_string())
            }
            RpcError::NotRegistered(_) => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            RpcError::ExecutionFailed(message) => Self::internal(message),
            RpcError::Storage(source) => Self::from(source),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => Self::not_found(err.to_string()),
            RegistryError::Storage { .. } => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            RegistryError::Io { .. } => Self::internal(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match err {
            StoreError::AlreadyExists(_) => StatusCode::CONFLICT,
            StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
            StoreError::Unavailable(_) | StoreError::VersionMismatch(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            StoreError::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<StudentError> for ApiError {
    fn from(err: StudentError) -> Self {
        match err {
            StudentError::InvalidIdentity(_) => Self::bad_request(err.to_string()),
            StudentError::AlreadyExists(_) => Self::new(StatusCode::CONFLICT, err.to_string()),
            StudentError::Storage(source) => Self::from(source),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
