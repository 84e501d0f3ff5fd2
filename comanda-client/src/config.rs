//! Client configuration

use std::time::Duration;

use shared::message::SubscriptionScope;

/// Order feed configuration
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Push server TCP address (e.g., "127.0.0.1:9100")
    pub server_addr: String,

    /// Subscription scope requested at handshake
    pub scope: SubscriptionScope,

    /// Client name reported at handshake, for server-side logs
    pub client_name: Option<String>,

    /// Delay between reconnect attempts
    pub reconnect_delay: Duration,

    /// How long to wait for the Connected reply before giving up on an
    /// attempt
    pub handshake_timeout: Duration,

    /// Buffer size of the feed event channel handed to the consumer
    pub channel_buffer: usize,
}

impl FeedConfig {
    /// Fixed-interval reconnection; a display losing an event for a fixed
    /// few seconds is acceptable, connection storms are not
    pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

    pub fn new(server_addr: impl Into<String>, scope: SubscriptionScope) -> Self {
        Self {
            server_addr: server_addr.into(),
            scope,
            client_name: None,
            reconnect_delay: Self::DEFAULT_RECONNECT_DELAY,
            handshake_timeout: Duration::from_secs(3),
            channel_buffer: 128,
        }
    }

    /// Staff scope: every order on every table
    pub fn staff(server_addr: impl Into<String>) -> Self {
        Self::new(server_addr, SubscriptionScope::Staff)
    }

    /// Customer scope: a single order
    pub fn customer(server_addr: impl Into<String>, order_id: u64) -> Self {
        Self::new(server_addr, SubscriptionScope::Customer { order_id })
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}
