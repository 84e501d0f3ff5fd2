//! Push channel TCP server
//!
//! Accepts subscriber connections and runs the push protocol:
//! 1. Accept a connection
//! 2. Protocol handshake: a `Handshake` message declaring the desired scope
//! 3. Reply `Connected` with the assigned subscriber id
//! 4. Hand the connection to a [`SubscriptionChannel`] for the push phase
//! 5. Gracefully shut down on cancellation signal

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use shared::message::{
    ConnectedPayload, ErrorPayload, EventType, HandshakePayload, PROTOCOL_VERSION, PushMessage,
    SubscriptionScope,
};

use super::channel::SubscriptionChannel;
use super::transport::{TcpTransport, Transport};
use crate::bus::EventBus;
use crate::core::Config;
use crate::utils::AppError;

/// Delay before closing connection after sending an error, so the client has
/// a chance to read it
const HANDSHAKE_ERROR_DELAY_MS: u64 = 100;

pub struct PushServer {
    bus: EventBus,
    config: Arc<Config>,
    shutdown_token: CancellationToken,
}

impl PushServer {
    pub fn new(bus: EventBus, config: Arc<Config>, shutdown_token: CancellationToken) -> Self {
        Self {
            bus,
            config,
            shutdown_token,
        }
    }

    /// Bind and serve until the shutdown token fires
    pub async fn run(self) -> Result<(), AppError> {
        let addr = format!("0.0.0.0:{}", self.config.push_tcp_port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind push server: {}", e)))?;

        tracing::info!("Push server listening on {}", addr);
        self.accept_loop(listener).await
    }

    async fn accept_loop(self, listener: TcpListener) -> Result<(), AppError> {
        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Push server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!("Subscriber connected: {}", addr);
                            self.spawn_connection_handler(stream, addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn spawn_connection_handler(&self, stream: TcpStream, addr: SocketAddr) {
        let bus = self.bus.clone();
        let config = self.config.clone();
        let shutdown_token = self.shutdown_token.clone();

        tokio::spawn(async move {
            let transport: Arc<dyn Transport> = Arc::new(TcpTransport::from_stream(stream));
            if let Err(e) =
                serve_connection(transport, bus, config, shutdown_token, Some(addr)).await
            {
                tracing::debug!("Subscriber {} handler finished: {}", addr, e);
            }
        });
    }
}

/// Serve one already-established connection
///
/// Split out from the accept loop so tests can drive the full protocol over
/// a memory transport.
pub async fn serve_connection(
    transport: Arc<dyn Transport>,
    bus: EventBus,
    config: Arc<Config>,
    shutdown_token: CancellationToken,
    addr: Option<SocketAddr>,
) -> Result<(), AppError> {
    let (request_id, scope) = perform_handshake(&transport, addr).await?;

    // Subscribe before confirming, so no event published after Connected can
    // be missed
    let subscription = bus.subscribe(scope.clone());
    tracing::info!(
        subscriber_id = %subscription.id(),
        %scope,
        "Subscriber registered"
    );

    let connected = ConnectedPayload {
        subscriber_id: subscription.id().to_string(),
        scope: scope.clone(),
    };
    let response = PushMessage::connected(&connected).with_correlation_id(request_id);
    transport.write_message(&response).await?;

    SubscriptionChannel::new(
        transport,
        subscription,
        config.heartbeat_interval(),
        shutdown_token,
    )
    .run()
    .await;

    Ok(())
}

/// Perform the protocol handshake, returning the request id and scope
async fn perform_handshake(
    transport: &Arc<dyn Transport>,
    addr: Option<SocketAddr>,
) -> Result<(Uuid, SubscriptionScope), AppError> {
    let peer = addr.map(|a| a.to_string()).unwrap_or_else(|| "local".into());
    tracing::debug!("Waiting for handshake from {}", peer);

    let msg = transport.read_message().await.map_err(|e| {
        tracing::warn!("Subscriber {} handshake error: {}", peer, e);
        e
    })?;

    if msg.event_type != EventType::Handshake {
        tracing::warn!(
            "Subscriber {} failed to handshake: expected Handshake, got {}",
            peer,
            msg.event_type
        );
        send_handshake_error(transport, &msg, "Expected Handshake message").await;
        return Err(AppError::invalid("Expected Handshake message"));
    }

    let payload: HandshakePayload = msg.parse_payload().map_err(|e| {
        tracing::warn!("Subscriber {} sent invalid handshake payload: {}", peer, e);
        AppError::invalid(format!("Invalid handshake payload: {}", e))
    })?;

    if payload.version != PROTOCOL_VERSION {
        tracing::warn!(
            "Subscriber {} protocol version mismatch: expected {}, got {}",
            peer,
            PROTOCOL_VERSION,
            payload.version
        );
        send_handshake_error(
            transport,
            &msg,
            &format!(
                "Protocol version mismatch: server={}, client={}. Please update your client.",
                PROTOCOL_VERSION, payload.version
            ),
        )
        .await;
        return Err(AppError::invalid("Protocol version mismatch"));
    }

    tracing::debug!(
        "Subscriber {} handshake success (v{}, scope: {}, client: {:?})",
        peer,
        payload.version,
        payload.scope,
        payload.client_name
    );

    Ok((msg.request_id, payload.scope))
}

/// Send a handshake rejection, then give the client time to read it
async fn send_handshake_error(transport: &Arc<dyn Transport>, msg: &PushMessage, message: &str) {
    let payload = ErrorPayload::new(shared::error::ErrorCode::Invalid.to_string(), message);
    let response = PushMessage::error(&payload).with_correlation_id(msg.request_id);

    if let Err(e) = transport.write_message(&response).await {
        tracing::error!("Failed to send handshake error: {}", e);
    }

    tokio::time::sleep(tokio::time::Duration::from_millis(HANDSHAKE_ERROR_DELAY_MS)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::transport::MemoryTransport;
    use shared::event::StatusChanged;
    use shared::models::OrderStatus;
    use std::time::Duration;

    fn test_config() -> Arc<Config> {
        Arc::new(Config::with_ports(0, 0))
    }

    async fn serve_memory(
        bus: EventBus,
        shutdown: CancellationToken,
    ) -> (Arc<MemoryTransport>, tokio::task::JoinHandle<()>) {
        let (client_end, server_end) = MemoryTransport::pair();
        let server_end: Arc<dyn Transport> = Arc::new(server_end);
        let config = test_config();
        let handle = tokio::spawn(async move {
            let _ = serve_connection(server_end, bus, config, shutdown, None).await;
        });
        (Arc::new(client_end), handle)
    }

    fn handshake(scope: SubscriptionScope) -> PushMessage {
        PushMessage::handshake(&HandshakePayload {
            version: PROTOCOL_VERSION,
            scope,
            client_name: Some("test".to_string()),
        })
    }

    #[tokio::test]
    async fn test_handshake_then_connected() {
        let bus = EventBus::new();
        let shutdown = CancellationToken::new();
        let (client, _handle) = serve_memory(bus.clone(), shutdown.clone()).await;

        let hs = handshake(SubscriptionScope::Staff);
        client.write_message(&hs).await.unwrap();

        let reply = client.read_message().await.unwrap();
        assert_eq!(reply.event_type, EventType::Connected);
        assert_eq!(reply.correlation_id, Some(hs.request_id));
        let payload: ConnectedPayload = reply.parse_payload().unwrap();
        assert_eq!(payload.scope, SubscriptionScope::Staff);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_version_mismatch_rejected() {
        let bus = EventBus::new();
        let shutdown = CancellationToken::new();
        let (client, _handle) = serve_memory(bus.clone(), shutdown.clone()).await;

        let hs = PushMessage::handshake(&HandshakePayload {
            version: PROTOCOL_VERSION + 1,
            scope: SubscriptionScope::Staff,
            client_name: None,
        });
        client.write_message(&hs).await.unwrap();

        let reply = client.read_message().await.unwrap();
        assert_eq!(reply.event_type, EventType::Error);
        let payload: ErrorPayload = reply.parse_payload().unwrap();
        assert!(payload.message.contains("version mismatch"));

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_wrong_first_message_rejected() {
        let bus = EventBus::new();
        let shutdown = CancellationToken::new();
        let (client, _handle) = serve_memory(bus.clone(), shutdown.clone()).await;

        client.write_message(&PushMessage::heartbeat()).await.unwrap();

        let reply = client.read_message().await.unwrap();
        assert_eq!(reply.event_type, EventType::Error);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_events_pushed_after_connect() {
        let bus = EventBus::new();
        let shutdown = CancellationToken::new();
        let (client, _handle) = serve_memory(bus.clone(), shutdown.clone()).await;

        client.write_message(&handshake(SubscriptionScope::Staff)).await.unwrap();
        let reply = client.read_message().await.unwrap();
        assert_eq!(reply.event_type, EventType::Connected);

        // Subscription is live once Connected has been sent
        let event = StatusChanged {
            order_id: 1,
            version: 2,
            old_status: OrderStatus::Created,
            new_status: OrderStatus::InPreparation,
            table_id: 4,
        };
        // The channel task may still be starting; retry until delivered
        let received = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                bus.publish(&event);
                if bus.subscriber_count() > 0 {
                    break client.read_message().await.unwrap();
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(received.event_type, EventType::OrderStatusChanged);
        let payload: StatusChanged = received.parse_payload().unwrap();
        assert_eq!(payload.order_id, 1);
        assert_eq!(payload.version, 2);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_customer_scope_filtered_on_wire() {
        let bus = EventBus::new();
        let shutdown = CancellationToken::new();
        let (client, _handle) = serve_memory(bus.clone(), shutdown.clone()).await;

        client
            .write_message(&handshake(SubscriptionScope::Customer { order_id: 42 }))
            .await
            .unwrap();
        let reply = client.read_message().await.unwrap();
        assert_eq!(reply.event_type, EventType::Connected);

        while bus.subscriber_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let other = StatusChanged {
            order_id: 99,
            version: 2,
            old_status: OrderStatus::Created,
            new_status: OrderStatus::InPreparation,
            table_id: 1,
        };
        let mine = StatusChanged {
            order_id: 42,
            version: 3,
            old_status: OrderStatus::InPreparation,
            new_status: OrderStatus::Ready,
            table_id: 2,
        };
        bus.publish(&other);
        bus.publish(&mine);

        // Only the subscribed order arrives
        let received = tokio::time::timeout(Duration::from_secs(2), client.read_message())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.event_type, EventType::OrderStatusChanged);
        let payload: StatusChanged = received.parse_payload().unwrap();
        assert_eq!(payload.order_id, 42);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_shutdown_closes_channel() {
        let bus = EventBus::new();
        let shutdown = CancellationToken::new();
        let (client, handle) = serve_memory(bus.clone(), shutdown.clone()).await;

        client.write_message(&handshake(SubscriptionScope::Staff)).await.unwrap();
        let _ = client.read_message().await.unwrap();

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bus.subscriber_count(), 0);
    }
}
