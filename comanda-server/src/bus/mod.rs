//! In-process status event bus
//!
//! Single-process fan-out of committed `StatusChanged` events to push
//! subscribers. Each subscriber owns a bounded queue; when a slow consumer
//! overflows it the oldest events are dropped and the subscriber is handed a
//! `BusEvent::Overflowed` so it can resync from a full-state read instead of
//! acting on a gapped stream. Publishers never block and never observe
//! subscriber failures.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use shared::event::StatusChanged;
use shared::message::SubscriptionScope;

/// Default per-subscriber queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// What a subscriber pulls off its queue
#[derive(Debug, Clone)]
pub enum BusEvent {
    /// A committed status transition matching the subscriber's scope
    Status(StatusChanged),
    /// The subscriber fell behind and `dropped` events were discarded,
    /// oldest first. Delivery resumes with the next event; the stream has a
    /// gap until the subscriber resyncs.
    Overflowed { dropped: u64 },
}

struct SubscriberEntry {
    scope: SubscriptionScope,
    tx: broadcast::Sender<StatusChanged>,
}

/// Scope-filtered event fan-out
///
/// Cheap to clone; all clones share the subscriber registry.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<DashMap<Uuid, SubscriberEntry>>,
    queue_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(queue_capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a subscriber; events published after this call are delivered
    pub fn subscribe(&self, scope: SubscriptionScope) -> SubscriptionHandle {
        let id = Uuid::new_v4();
        let (tx, rx) = broadcast::channel(self.queue_capacity);
        self.subscribers.insert(
            id,
            SubscriberEntry {
                scope: scope.clone(),
                tx,
            },
        );
        tracing::debug!(subscriber_id = %id, %scope, "Subscriber registered");

        SubscriptionHandle {
            id,
            scope,
            rx,
            degraded: false,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    /// Fan a committed event out to every matching subscriber
    ///
    /// Send failures mean the receiving half is already gone; the registry
    /// entry is cleaned up by the handle's `Drop`, so they are ignored here.
    pub fn publish(&self, event: &StatusChanged) {
        let mut delivered = 0usize;
        for entry in self.subscribers.iter() {
            if entry.scope.matches(event.order_id) {
                if entry.tx.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        tracing::debug!(
            order_id = event.order_id,
            version = event.version,
            delivered,
            "Event published"
        );
    }

    /// Remove a subscriber by id; unknown ids are a no-op
    pub fn unsubscribe(&self, id: Uuid) {
        if self.subscribers.remove(&id).is_some() {
            tracing::debug!(subscriber_id = %id, "Subscriber removed");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// A live subscription; dropping it unsubscribes
pub struct SubscriptionHandle {
    id: Uuid,
    scope: SubscriptionScope,
    rx: broadcast::Receiver<StatusChanged>,
    degraded: bool,
    subscribers: Arc<DashMap<Uuid, SubscriberEntry>>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn scope(&self) -> &SubscriptionScope {
        &self.scope
    }

    /// The queue overflowed at some point and the event stream has a gap
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Mark the gap as healed after a successful resync
    pub fn clear_degraded(&mut self) {
        self.degraded = false;
    }

    /// Await the next event; `None` once the bus side is gone
    pub async fn next(&mut self) -> Option<BusEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(BusEvent::Status(event)),
                Err(broadcast::error::RecvError::Lagged(dropped)) => {
                    self.degraded = true;
                    tracing::warn!(
                        subscriber_id = %self.id,
                        dropped,
                        "Subscriber queue overflowed, oldest events dropped"
                    );
                    return Some(BusEvent::Overflowed { dropped });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll, used by tests
    pub fn try_next(&mut self) -> Option<BusEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(BusEvent::Status(event)),
            Err(broadcast::error::TryRecvError::Lagged(dropped)) => {
                self.degraded = true;
                Some(BusEvent::Overflowed { dropped })
            }
            Err(_) => None,
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.subscribers.remove(&self.id);
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("degraded", &self.degraded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::OrderStatus;

    fn event(order_id: u64, version: u64) -> StatusChanged {
        StatusChanged {
            order_id,
            version,
            old_status: OrderStatus::Created,
            new_status: OrderStatus::InPreparation,
            table_id: 1,
        }
    }

    #[tokio::test]
    async fn test_staff_scope_receives_everything() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(SubscriptionScope::Staff);

        bus.publish(&event(1, 2));
        bus.publish(&event(2, 2));

        for expected in [1u64, 2] {
            match sub.next().await {
                Some(BusEvent::Status(ev)) => assert_eq!(ev.order_id, expected),
                other => panic!("Expected status event, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_customer_scope_is_isolated() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(SubscriptionScope::Customer { order_id: 42 });

        bus.publish(&event(99, 2));
        bus.publish(&event(42, 2));

        match sub.next().await {
            Some(BusEvent::Status(ev)) => assert_eq!(ev.order_id, 42),
            other => panic!("Expected status event, got {:?}", other),
        }
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_affect_others() {
        let bus = EventBus::with_capacity(4);
        let mut fast = bus.subscribe(SubscriptionScope::Staff);
        let mut slow = bus.subscribe(SubscriptionScope::Staff);

        for version in 2..12u64 {
            bus.publish(&event(1, version));
            // Fast consumer keeps up
            match fast.next().await {
                Some(BusEvent::Status(ev)) => assert_eq!(ev.version, version),
                other => panic!("Expected status event, got {:?}", other),
            }
        }

        // Slow consumer overflowed but still surfaces the gap and the tail
        match slow.next().await {
            Some(BusEvent::Overflowed { dropped }) => assert_eq!(dropped, 6),
            other => panic!("Expected overflow, got {:?}", other),
        }
        assert!(slow.is_degraded());

        match slow.next().await {
            Some(BusEvent::Status(ev)) => assert_eq!(ev.version, 8),
            other => panic!("Expected status event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_drop_oldest_keeps_most_recent() {
        let bus = EventBus::with_capacity(2);
        let mut sub = bus.subscribe(SubscriptionScope::Staff);

        for version in 2..7u64 {
            bus.publish(&event(1, version));
        }

        match sub.next().await {
            Some(BusEvent::Overflowed { dropped }) => assert_eq!(dropped, 3),
            other => panic!("Expected overflow, got {:?}", other),
        }
        match sub.next().await {
            Some(BusEvent::Status(ev)) => assert_eq!(ev.version, 5),
            other => panic!("Expected status event, got {:?}", other),
        }
        match sub.next().await {
            Some(BusEvent::Status(ev)) => assert_eq!(ev.version, 6),
            other => panic!("Expected status event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_per_order_ordering_preserved() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(SubscriptionScope::Staff);

        for version in 2..6u64 {
            bus.publish(&event(7, version));
        }

        let mut last = 1u64;
        while let Some(BusEvent::Status(ev)) = sub.try_next() {
            assert!(ev.version > last);
            last = ev.version;
        }
        assert_eq!(last, 5);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let bus = EventBus::new();
        let sub = bus.subscribe(SubscriptionScope::Staff);
        assert_eq!(bus.subscriber_count(), 1);

        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);

        // Publishing with nobody listening is a no-op
        bus.publish(&event(1, 2));
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let bus = EventBus::new();
        let sub = bus.subscribe(SubscriptionScope::Staff);
        let id = sub.id();

        bus.unsubscribe(id);
        bus.unsubscribe(id);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
