//! Per-connection subscription channel
//!
//! Pumps bus events, heartbeats, and resync notices down one transport until
//! the subscriber disconnects or the server shuts down. The channel owns the
//! bus subscription; when it exits for any reason the subscription is dropped
//! and the transport closed.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use shared::message::{PushMessage, ResyncPayload};

use super::transport::Transport;
use crate::bus::{BusEvent, SubscriptionHandle};

pub struct SubscriptionChannel {
    subscriber_id: Uuid,
    transport: Arc<dyn Transport>,
    subscription: SubscriptionHandle,
    heartbeat_interval: Duration,
    shutdown_token: CancellationToken,
}

impl SubscriptionChannel {
    pub fn new(
        transport: Arc<dyn Transport>,
        subscription: SubscriptionHandle,
        heartbeat_interval: Duration,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            subscriber_id: subscription.id(),
            transport,
            subscription,
            heartbeat_interval,
            shutdown_token,
        }
    }

    /// Run the channel to completion
    ///
    /// Consumes the channel; the bus subscription is released when this
    /// returns, whatever the exit path was.
    pub async fn run(mut self) {
        let disconnect_token = CancellationToken::new();
        let reader = spawn_client_reader(
            self.transport.clone(),
            self.subscriber_id,
            disconnect_token.clone(),
        );

        let mut heartbeat = tokio::time::interval(self.heartbeat_interval);
        // First tick fires immediately; the handshake already confirmed
        // liveness, so skip it
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::debug!(subscriber_id = %self.subscriber_id, "Channel shutting down");
                    break;
                }

                _ = disconnect_token.cancelled() => {
                    tracing::debug!(subscriber_id = %self.subscriber_id, "Subscriber disconnected");
                    break;
                }

                _ = heartbeat.tick() => {
                    if let Err(e) = self.transport.write_message(&PushMessage::heartbeat()).await {
                        tracing::debug!(subscriber_id = %self.subscriber_id, "Heartbeat write failed: {}", e);
                        break;
                    }
                }

                event = self.subscription.next() => {
                    match event {
                        Some(BusEvent::Status(ev)) => {
                            let msg = PushMessage::status_changed(&ev);
                            if let Err(e) = self.transport.write_message(&msg).await {
                                tracing::debug!(subscriber_id = %self.subscriber_id, "Event write failed: {}", e);
                                break;
                            }
                        }
                        Some(BusEvent::Overflowed { dropped }) => {
                            // Lag recovery: tell the subscriber its stream has
                            // a gap so it can refetch full state
                            tracing::warn!(
                                subscriber_id = %self.subscriber_id,
                                dropped_events = dropped,
                                "Subscriber lagged behind, sending resync notification"
                            );
                            let msg = PushMessage::resync(&ResyncPayload::lagged(dropped));
                            if let Err(e) = self.transport.write_message(&msg).await {
                                tracing::debug!(subscriber_id = %self.subscriber_id, "Resync write failed: {}", e);
                                break;
                            }
                            self.subscription.clear_degraded();
                        }
                        None => {
                            tracing::debug!(subscriber_id = %self.subscriber_id, "Bus closed");
                            break;
                        }
                    }
                }
            }
        }

        reader.abort();
        let _ = self.transport.close().await;
        tracing::debug!(subscriber_id = %self.subscriber_id, "Channel stopped");
        // self.subscription drops here and unregisters from the bus
    }
}

/// Drain reads from the subscriber so a socket close is noticed promptly
///
/// The push channel is one-directional after the handshake; anything the
/// client sends is ignored, but a read error is how we learn it went away.
fn spawn_client_reader(
    transport: Arc<dyn Transport>,
    subscriber_id: Uuid,
    disconnect_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match transport.read_message().await {
                Ok(msg) => {
                    tracing::debug!(
                        subscriber_id = %subscriber_id,
                        event_type = %msg.event_type,
                        "Ignoring unexpected message on push channel"
                    );
                }
                Err(_) => {
                    disconnect_token.cancel();
                    break;
                }
            }
        }
    })
}
