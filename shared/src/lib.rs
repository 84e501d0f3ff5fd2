//! Shared types for Comanda
//!
//! Common types used across the server and client crates: domain models,
//! the status-change event, push-protocol messages and their wire codec,
//! and the error-code taxonomy.

pub mod error;
pub mod event;
pub mod message;
pub mod models;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Event and message re-exports (for convenient access)
pub use error::{ApiResponse, ErrorCode};
pub use event::StatusChanged;
pub use message::{EventType, PushMessage, SubscriptionScope};
pub use models::{Order, OrderId, OrderLine, OrderStatus, Role};
