//! Reconnecting order feed
//!
//! Wraps [`MessageClient`] sessions in a supervision loop that reconnects on
//! a fixed delay and deduplicates redelivered events across sessions. The
//! consumer sees one ordered stream of [`FeedEvent`]s per order; an event
//! whose version is not newer than the last one seen for that order is
//! silently discarded, so reconnect races never make a display go backwards.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use shared::event::StatusChanged;
use shared::message::{EventType, ResyncPayload, SubscriptionScope};
use shared::models::{Order, OrderId};

use crate::config::FeedConfig;
use crate::error::{FeedError, MessageError};
use crate::message::MessageClient;

/// What the feed hands to its consumer
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A session was established (first connect or any reconnect)
    Connected { scope: SubscriptionScope },
    /// A status transition, already deduplicated
    StatusChanged(StatusChanged),
    /// The server reported a gap and a snapshot was fetched to heal it
    Resynced { orders: Vec<Order> },
    /// The server reported a gap and no snapshot source is configured;
    /// the consumer must refetch state itself
    ResyncNeeded,
}

/// Where the feed fetches full state after a gap
///
/// The scope is the feed's own subscription scope; a source only needs to
/// return the orders that scope can observe.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_active(&self, scope: SubscriptionScope) -> Result<Vec<Order>, FeedError>;
}

/// Handle to a running feed
pub struct FeedHandle {
    /// Consumer end of the event stream
    pub events: mpsc::Receiver<FeedEvent>,
    cancel: CancellationToken,
    join: tokio::task::JoinHandle<()>,
}

impl FeedHandle {
    /// Receive the next feed event
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.events.recv().await
    }

    /// Stop the feed and wait for its task to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.join.await;
    }
}

/// Reconnecting order feed
pub struct OrderFeed {
    config: FeedConfig,
    snapshot: Option<Box<dyn SnapshotSource>>,
}

impl OrderFeed {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            snapshot: None,
        }
    }

    /// Attach a snapshot source so gaps heal without consumer involvement
    pub fn with_snapshot_source(mut self, source: impl SnapshotSource + 'static) -> Self {
        self.snapshot = Some(Box::new(source));
        self
    }

    /// Spawn the supervision loop
    pub fn start(self) -> FeedHandle {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer);
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();

        let join = tokio::spawn(async move {
            run_loop(self.config, self.snapshot, tx, loop_cancel).await;
        });

        FeedHandle {
            events: rx,
            cancel,
            join,
        }
    }
}

async fn run_loop(
    config: FeedConfig,
    snapshot: Option<Box<dyn SnapshotSource>>,
    tx: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
) {
    // Highest version seen per order; survives reconnects so redelivered
    // events are dropped instead of replayed
    let mut seen: HashMap<OrderId, u64> = HashMap::new();

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match MessageClient::connect(
            &config.server_addr,
            config.scope.clone(),
            config.client_name.clone(),
            config.handshake_timeout,
        )
        .await
        {
            Ok(client) => {
                tracing::info!(addr = %config.server_addr, "Feed connected");
                if tx
                    .send(FeedEvent::Connected {
                        scope: client.session().scope.clone(),
                    })
                    .await
                    .is_err()
                {
                    // Consumer is gone, stop entirely
                    let _ = client.close().await;
                    break;
                }

                let outcome = consume_session(&client, &snapshot, &mut seen, &tx, &cancel).await;
                let _ = client.close().await;

                match outcome {
                    SessionEnd::Shutdown => break,
                    SessionEnd::Disconnected(e) => {
                        tracing::warn!("Feed session ended: {}", e);
                    }
                }
            }
            Err(MessageError::Rejected(reason)) => {
                // The server will keep rejecting us (e.g. version mismatch);
                // retrying on a delay still gives an updated server a chance
                tracing::error!("Feed handshake rejected: {}", reason);
            }
            Err(e) => {
                tracing::warn!(addr = %config.server_addr, "Feed connect failed: {}", e);
            }
        }

        // Fixed-delay reconnect, cancellable mid-sleep
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }

    tracing::debug!("Feed loop stopped");
}

enum SessionEnd {
    Shutdown,
    Disconnected(MessageError),
}

async fn consume_session(
    client: &MessageClient,
    snapshot: &Option<Box<dyn SnapshotSource>>,
    seen: &mut HashMap<OrderId, u64>,
    tx: &mpsc::Sender<FeedEvent>,
    cancel: &CancellationToken,
) -> SessionEnd {
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => return SessionEnd::Shutdown,
            msg = client.recv() => match msg {
                Ok(msg) => msg,
                Err(e) => return SessionEnd::Disconnected(e),
            },
        };

        match msg.event_type {
            EventType::OrderStatusChanged => {
                let event: StatusChanged = match msg.parse_payload() {
                    Ok(ev) => ev,
                    Err(e) => {
                        tracing::warn!("Discarding malformed status event: {}", e);
                        continue;
                    }
                };

                // Dedup: only strictly newer versions pass
                let last = seen.get(&event.order_id).copied().unwrap_or(0);
                if event.version <= last {
                    tracing::debug!(
                        order_id = event.order_id,
                        version = event.version,
                        last_seen = last,
                        "Dropping stale event"
                    );
                    continue;
                }
                seen.insert(event.order_id, event.version);

                if tx.send(FeedEvent::StatusChanged(event)).await.is_err() {
                    return SessionEnd::Shutdown;
                }
            }

            EventType::Resync => {
                if let Ok(payload) = msg.parse_payload::<ResyncPayload>() {
                    tracing::warn!(
                        reason = %payload.reason,
                        dropped = payload.dropped_events,
                        "Server reported an event gap"
                    );
                }

                let feed_event = match snapshot {
                    Some(source) => match source.fetch_active(client.session().scope).await {
                        Ok(orders) => {
                            // Snapshot versions supersede anything older
                            for order in &orders {
                                let entry = seen.entry(order.id).or_insert(0);
                                if order.version > *entry {
                                    *entry = order.version;
                                }
                            }
                            FeedEvent::Resynced { orders }
                        }
                        Err(e) => {
                            tracing::error!("Snapshot fetch failed: {}", e);
                            FeedEvent::ResyncNeeded
                        }
                    },
                    None => FeedEvent::ResyncNeeded,
                };

                if tx.send(feed_event).await.is_err() {
                    return SessionEnd::Shutdown;
                }
            }

            EventType::Heartbeat => {
                // Liveness only; nothing to surface
            }

            other => {
                tracing::debug!(event_type = %other, "Ignoring unexpected message");
            }
        }
    }
}
