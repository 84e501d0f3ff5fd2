use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::OrderId;

// ==================== Subscription Scope ====================

/// Scope of a push subscription - fixed at subscribe time
///
/// The distinction is made from the caller's resolved authentication state
/// when the channel is opened; it is not re-checked per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubscriptionScope {
    /// Staff viewer (kitchen screen, waiter screen, manager dashboard):
    /// receives every status-change event
    Staff,
    /// Customer status page: receives only events for one order
    Customer { order_id: OrderId },
}

impl SubscriptionScope {
    /// Whether an event for `order_id` falls inside this scope
    pub fn matches(&self, order_id: OrderId) -> bool {
        match self {
            SubscriptionScope::Staff => true,
            SubscriptionScope::Customer { order_id: scoped } => *scoped == order_id,
        }
    }
}

impl fmt::Display for SubscriptionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionScope::Staff => write!(f, "staff"),
            SubscriptionScope::Customer { order_id } => write!(f, "customer({})", order_id),
        }
    }
}

// ==================== Payloads ====================

/// Handshake payload (client -> server)
///
/// Carries the protocol version for compatibility checking and the desired
/// subscription scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    /// Protocol version
    pub version: u16,
    /// Requested subscription scope
    pub scope: SubscriptionScope,
    /// Client name/identifier
    pub client_name: Option<String>,
}

/// Connected payload (server -> client, once per connection)
///
/// Acknowledges the handshake; carries the server-assigned subscriber id and
/// the scope the channel was bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedPayload {
    pub subscriber_id: String,
    pub scope: SubscriptionScope,
}

/// Resync payload (server -> client)
///
/// Sent when the subscriber's queue overflowed and old events were dropped.
/// The incremental stream can no longer be trusted; the client should
/// re-fetch full current state for its scope, then resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResyncPayload {
    pub reason: String,
    /// Number of events dropped for this subscriber
    pub dropped_events: u64,
}

impl ResyncPayload {
    pub fn lagged(dropped_events: u64) -> Self {
        Self {
            reason: "subscriber queue overflowed".to_string(),
            dropped_events,
        }
    }
}

/// Error payload (server -> client)
///
/// Only used before a subscription exists, e.g. a rejected handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
