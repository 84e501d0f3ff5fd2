//! Push channel message client
//!
//! One connection's worth of protocol: handshake, Connected confirmation,
//! then a stream of pushed messages. Reconnection policy lives a level up in
//! [`crate::feed::OrderFeed`]; this client represents exactly one session.

use std::time::Duration;

use shared::message::{
    ConnectedPayload, ErrorPayload, EventType, HandshakePayload, PROTOCOL_VERSION, PushMessage,
    SubscriptionScope,
};

use super::transport::{ClientTransport, MemoryTransport, TcpTransport};
use crate::error::MessageError;

#[derive(Debug, Clone)]
pub struct MessageClient {
    transport: ClientTransport,
    session: ConnectedPayload,
}

impl MessageClient {
    /// Connect over TCP and complete the handshake
    pub async fn connect(
        addr: &str,
        scope: SubscriptionScope,
        client_name: Option<String>,
        handshake_timeout: Duration,
    ) -> Result<Self, MessageError> {
        let transport = ClientTransport::Tcp(TcpTransport::connect(addr).await?);
        Self::from_transport(transport, scope, client_name, handshake_timeout).await
    }

    /// Complete the handshake over an already-open transport
    pub async fn from_transport(
        transport: ClientTransport,
        scope: SubscriptionScope,
        client_name: Option<String>,
        handshake_timeout: Duration,
    ) -> Result<Self, MessageError> {
        let payload = HandshakePayload {
            version: PROTOCOL_VERSION,
            scope,
            client_name,
        };
        let handshake = PushMessage::handshake(&payload);
        transport.write_message(&handshake).await?;

        let session = tokio::time::timeout(
            handshake_timeout,
            await_connected(&transport, handshake.request_id),
        )
        .await
        .map_err(|_| MessageError::Timeout("Handshake timed out".to_string()))??;

        tracing::debug!(
            subscriber_id = %session.subscriber_id,
            scope = %session.scope,
            "Connected to push server"
        );

        Ok(Self { transport, session })
    }

    /// Create an in-memory client for tests
    pub async fn memory(
        transport: MemoryTransport,
        scope: SubscriptionScope,
        handshake_timeout: Duration,
    ) -> Result<Self, MessageError> {
        Self::from_transport(
            ClientTransport::Memory(transport),
            scope,
            None,
            handshake_timeout,
        )
        .await
    }

    /// Session metadata from the Connected reply
    pub fn session(&self) -> &ConnectedPayload {
        &self.session
    }

    /// Receive the next pushed message
    pub async fn recv(&self) -> Result<PushMessage, MessageError> {
        self.transport.read_message().await
    }

    /// Close the connection
    pub async fn close(&self) -> Result<(), MessageError> {
        self.transport.close().await
    }
}

/// Wait for the Connected reply correlated to our handshake
///
/// Anything else first is a protocol violation, except an Error message,
/// which carries the server's rejection reason.
async fn await_connected(
    transport: &ClientTransport,
    request_id: uuid::Uuid,
) -> Result<ConnectedPayload, MessageError> {
    loop {
        let msg = transport.read_message().await?;
        match msg.event_type {
            EventType::Connected => {
                if msg.correlation_id != Some(request_id) {
                    return Err(MessageError::Protocol(
                        "Connected reply does not match handshake".to_string(),
                    ));
                }
                return msg.parse_payload::<ConnectedPayload>().map_err(Into::into);
            }
            EventType::Error => {
                let reason = msg
                    .parse_payload::<ErrorPayload>()
                    .map(|p| p.message)
                    .unwrap_or_else(|_| "unknown".to_string());
                return Err(MessageError::Rejected(reason));
            }
            // Heartbeats can race the Connected reply on a busy server
            EventType::Heartbeat => continue,
            other => {
                return Err(MessageError::Protocol(format!(
                    "Expected Connected, got {}",
                    other
                )));
            }
        }
    }
}
