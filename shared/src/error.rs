//! Shared error-code taxonomy
//!
//! The server maps its internal errors onto these codes for API responses;
//! clients parse them back without string matching.

use serde::{Deserialize, Serialize};

/// Stable error codes carried in API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Unknown order id; surfaced to the caller, no retry
    NotFound,
    /// Requested edge does not exist in the status graph; indicates a caller bug
    IllegalTransition,
    /// Acting role lacks the capability for the requested edge
    Forbidden,
    /// Stale version from a concurrent writer; refetch and retry with fresh state
    Conflict,
    /// Durable write path failed or timed out; transient, safe to retry
    StoreUnavailable,
    /// Malformed request
    Invalid,
    /// Unexpected server error
    Internal,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
            ErrorCode::IllegalTransition => write!(f, "ILLEGAL_TRANSITION"),
            ErrorCode::Forbidden => write!(f, "FORBIDDEN"),
            ErrorCode::Conflict => write!(f, "CONFLICT"),
            ErrorCode::StoreUnavailable => write!(f, "STORE_UNAVAILABLE"),
            ErrorCode::Invalid => write!(f, "INVALID"),
            ErrorCode::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// API response envelope
///
/// ```json
/// { "code": null, "message": "success", "data": { ... } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Error code, absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: None,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code.is_none()
    }
}
