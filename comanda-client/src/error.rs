//! Client error types

use thiserror::Error;

use shared::message::CodecError;

/// Push channel errors
#[derive(Debug, Error)]
pub enum MessageError {
    /// Connection failed or dropped
    #[error("Connection error: {0}")]
    Connection(String),

    /// The peer violated the push protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server rejected the handshake
    #[error("Handshake rejected: {0}")]
    Rejected(String),

    /// An operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The client was closed locally
    #[error("Client closed")]
    Closed,
}

impl From<CodecError> for MessageError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Disconnected => MessageError::Connection("Disconnected".to_string()),
            CodecError::Invalid(msg) => MessageError::Protocol(msg),
            CodecError::Io(e) => MessageError::Connection(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for MessageError {
    fn from(err: serde_json::Error) -> Self {
        MessageError::Protocol(format!("JSON error: {}", err))
    }
}

/// Feed errors (push channel plus snapshot reads)
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Message(#[from] MessageError),

    /// Snapshot HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Snapshot response was not usable
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

pub type FeedResult<T> = Result<T, FeedError>;
