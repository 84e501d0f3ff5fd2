//! Unified error handling
//!
//! Application-level error type shared by the HTTP API and the push channel:
//! - [`AppError`] is the server-wide error enum
//! - HTTP handlers return it directly; axum maps it to a status code and a
//!   [`shared::ApiResponse`] envelope
//!
//! # Status mapping
//!
//! | Variant | HTTP | Code |
//! |---------|------|------|
//! | NotFound | 404 | NOT_FOUND |
//! | IllegalTransition | 400 | ILLEGAL_TRANSITION |
//! | Forbidden | 403 | FORBIDDEN |
//! | Conflict | 409 | CONFLICT |
//! | StoreUnavailable | 503 | STORE_UNAVAILABLE |
//! | Invalid | 400 | INVALID |
//! | Internal | 500 | INTERNAL |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use shared::error::{ApiResponse, ErrorCode};
use shared::message::CodecError;

use crate::orders::TransitionError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Business errors (4xx) ==========
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Illegal transition: {0}")]
    IllegalTransition(String),

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    Invalid(String),

    // ========== System errors (5xx) ==========
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    // ========== Push channel errors ==========
    /// The peer closed its connection; normal at end of a session
    #[error("Client disconnected")]
    ClientDisconnected,

    #[error("Protocol violation: {0}")]
    Protocol(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Error code reported in API envelopes and push error payloads
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::IllegalTransition(_) => ErrorCode::IllegalTransition,
            AppError::Forbidden(_) => ErrorCode::Forbidden,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::Invalid(_) => ErrorCode::Invalid,
            AppError::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
            AppError::Internal(_) | AppError::ClientDisconnected | AppError::Protocol(_) => {
                ErrorCode::Internal
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::IllegalTransition(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg.clone()),

            AppError::StoreUnavailable(msg) => {
                error!(target: "store", error = %msg, "Order store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Order store unavailable".to_string(),
                )
            }

            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }

            // Not reachable from HTTP handlers, mapped defensively
            AppError::ClientDisconnected | AppError::Protocol(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ApiResponse::<()>::error(self.code(), message));
        (status, body).into_response()
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::NotFound(id) => AppError::NotFound(format!("Order not found: {id}")),
            TransitionError::IllegalTransition { .. } => {
                AppError::IllegalTransition(err.to_string())
            }
            TransitionError::Forbidden { .. } => AppError::Forbidden(err.to_string()),
            TransitionError::Conflict(_) => AppError::Conflict(err.to_string()),
            TransitionError::StoreUnavailable(msg) => AppError::StoreUnavailable(msg),
        }
    }
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Disconnected => AppError::ClientDisconnected,
            CodecError::Invalid(msg) => AppError::Protocol(msg),
            CodecError::Io(e) => AppError::Protocol(format!("I/O error: {e}")),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Protocol(format!("JSON error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{OrderStatus, Role};

    #[test]
    fn test_transition_error_mapping() {
        let err: AppError = TransitionError::NotFound(7).into();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err: AppError = TransitionError::Forbidden {
            role: Role::Waiter,
            from: OrderStatus::Created,
            to: OrderStatus::InPreparation,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let err: AppError = TransitionError::Conflict(7).into();
        assert_eq!(err.code(), ErrorCode::Conflict);

        let err: AppError = TransitionError::StoreUnavailable("timeout".into()).into();
        assert_eq!(err.code(), ErrorCode::StoreUnavailable);
    }

    #[test]
    fn test_codec_error_mapping() {
        let err: AppError = CodecError::Disconnected.into();
        assert!(matches!(err, AppError::ClientDisconnected));
    }
}
