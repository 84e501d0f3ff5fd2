//! Transport abstraction for push channels
//!
//! Pluggable transport layer:
//! ```text
//!         ┌────────────────────┐
//!         │   Transport Trait  │
//!         └────────┬───────────┘
//!                  │
//!          ┌───────┴───────┐
//!          ▼               ▼
//!    TcpTransport    MemoryTransport
//!    (network)       (same-process)
//! ```
//!
//! The wire framing itself lives in `shared::message::codec` so that server
//! and client agree on it by construction.

mod memory;
mod tcp;

pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

use async_trait::async_trait;
use shared::message::PushMessage;

use crate::utils::AppError;

/// A bidirectional, message-framed connection to one subscriber
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Read one message from the peer
    async fn read_message(&self) -> Result<PushMessage, AppError>;

    /// Write one message to the peer
    async fn write_message(&self, msg: &PushMessage) -> Result<(), AppError>;

    /// Close the connection
    async fn close(&self) -> Result<(), AppError>;

    /// Peer address, when the transport has one
    fn peer_addr(&self) -> Option<String> {
        None
    }
}
