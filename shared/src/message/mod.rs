//! Push-protocol message types
//!
//! These types are shared between the server and its clients, for both
//! in-process (memory) and network (TCP) channels.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use uuid::Uuid;

pub mod codec;
pub mod payload;
pub use codec::CodecError;
pub use payload::*;

use crate::event::StatusChanged;

/// Protocol version
pub const PROTOCOL_VERSION: u16 = 1;

/// Push-channel event type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Client handshake (carries scope)
    Handshake = 0,
    /// Handshake acknowledgment, sent once on open
    Connected = 1,
    /// Order status-change event
    OrderStatusChanged = 2,
    /// Idle-timer keep-alive, no application payload
    Heartbeat = 3,
    /// Degraded-stream hint: re-fetch full state, then resume
    Resync = 4,
    /// Handshake rejection
    Error = 5,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(EventType::Handshake),
            1 => Ok(EventType::Connected),
            2 => Ok(EventType::OrderStatusChanged),
            3 => Ok(EventType::Heartbeat),
            4 => Ok(EventType::Resync),
            5 => Ok(EventType::Error),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Handshake => write!(f, "handshake"),
            EventType::Connected => write!(f, "connected"),
            EventType::OrderStatusChanged => write!(f, "order_status_changed"),
            EventType::Heartbeat => write!(f, "heartbeat"),
            EventType::Resync => write!(f, "resync"),
            EventType::Error => write!(f, "error"),
        }
    }
}

/// Push-channel message frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    /// Links a response (Connected/Error) back to the handshake request
    pub correlation_id: Option<Uuid>,
    pub payload: Vec<u8>,
}

impl PushMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            correlation_id: None,
            payload,
        }
    }

    /// Set the correlation id (used for handshake responses)
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Create a handshake message
    pub fn handshake(payload: &HandshakePayload) -> Self {
        Self::new(
            EventType::Handshake,
            serde_json::to_vec(payload).expect("Failed to serialize handshake payload"),
        )
    }

    /// Create a connected acknowledgment
    pub fn connected(payload: &ConnectedPayload) -> Self {
        Self::new(
            EventType::Connected,
            serde_json::to_vec(payload).expect("Failed to serialize connected payload"),
        )
    }

    /// Create a status-change event message
    pub fn status_changed(event: &StatusChanged) -> Self {
        Self::new(
            EventType::OrderStatusChanged,
            serde_json::to_vec(event).expect("Failed to serialize status change"),
        )
    }

    /// Create a heartbeat message (empty payload)
    pub fn heartbeat() -> Self {
        Self::new(EventType::Heartbeat, Vec::new())
    }

    /// Create a resync hint
    pub fn resync(payload: &ResyncPayload) -> Self {
        Self::new(
            EventType::Resync,
            serde_json::to_vec(payload).expect("Failed to serialize resync payload"),
        )
    }

    /// Create an error message
    pub fn error(payload: &ErrorPayload) -> Self {
        Self::new(
            EventType::Error,
            serde_json::to_vec(payload).expect("Failed to serialize error payload"),
        )
    }

    /// Parse the payload into a concrete type
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}
