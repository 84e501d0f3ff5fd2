//! Order status state machine
//!
//! Owns the legal transition graph and its role gates:
//!
//! ```text
//! CREATED ──kitchen──▶ IN_PREPARATION ──kitchen──▶ READY ──waiter──▶ DELIVERED
//!    │                      │                        │
//!    └──────manager/system──┴────────────────────────┴──▶ CANCELLED
//! ```
//!
//! `DELIVERED` and `CANCELLED` are terminal. A transition is committed to the
//! order store first and published to the event bus only after the store
//! acknowledged the write, so subscribers never observe a status that was not
//! durably recorded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;

use shared::event::StatusChanged;
use shared::models::{CreateOrder, Order, OrderId, OrderLine, OrderStatus, Role};

use super::store::{NewOrder, OrderStore, StoreError};
use crate::bus::EventBus;

/// Default bound on order store calls
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Transition errors
#[derive(Debug, Error)]
pub enum TransitionError {
    /// Unknown order id; surfaced to the caller, not retried
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The requested edge does not exist in the status graph
    #[error("Illegal transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// The acting role lacks the capability for this edge
    #[error("Role {role} may not perform {from} -> {to}")]
    Forbidden {
        role: Role,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// A concurrent transition already applied a newer version; the caller
    /// may refetch and retry with fresh state
    #[error("Concurrent transition on order {0}, refetch and retry")]
    Conflict(OrderId),

    /// The durable write path failed or timed out; transient
    #[error("Order store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Capability required to traverse a transition edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Kitchen,
    Waiter,
    /// Cancellation: manager, or system for automated policies
    Cancel,
}

impl Capability {
    pub fn permits(&self, role: Role) -> bool {
        match self {
            Capability::Kitchen => role == Role::Kitchen,
            Capability::Waiter => role == Role::Waiter,
            Capability::Cancel => matches!(role, Role::Manager | Role::System),
        }
    }
}

/// The edge set of the status graph
///
/// Returns the capability gating `(from, to)`, or `None` when the edge does
/// not exist. Terminal statuses have no outgoing edges.
pub fn required_capability(from: OrderStatus, to: OrderStatus) -> Option<Capability> {
    use OrderStatus::*;

    match (from, to) {
        (Created, InPreparation) => Some(Capability::Kitchen),
        (InPreparation, Ready) => Some(Capability::Kitchen),
        (Ready, Delivered) => Some(Capability::Waiter),
        (Created | InPreparation | Ready, Cancelled) => Some(Capability::Cancel),
        _ => None,
    }
}

/// Order lifecycle state machine
///
/// The only writer path for order status. Publishing is fire-and-forget: a
/// slow or disconnected subscriber can never block or fail a transition.
/// Transitions on the same order are serialized, so the event for version
/// `v` always enters the bus before the event for `v + 1`.
#[derive(Debug, Clone)]
pub struct OrderLifecycle {
    store: Arc<dyn OrderStore>,
    bus: EventBus,
    store_timeout: Duration,
    locks: Arc<DashMap<OrderId, Arc<Mutex<()>>>>,
}

impl OrderLifecycle {
    pub fn new(store: Arc<dyn OrderStore>, bus: EventBus) -> Self {
        Self {
            store,
            bus,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Create an order from priced cart lines
    ///
    /// Item names and prices are snapshotted here; the total is computed once
    /// and never changes afterwards. Creation publishes no event.
    pub async fn create_order(&self, request: CreateOrder) -> Result<Order, TransitionError> {
        let items: Vec<OrderLine> = request.items.into_iter().map(OrderLine::from).collect();
        let new_order = NewOrder {
            table_id: request.table_id,
            total_amount: Order::compute_total(&items),
            items,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        let order = self.store_call(self.store.insert(new_order)).await??;
        tracing::info!(
            order_id = order.id,
            table_id = order.table_id,
            total = order.total_amount,
            "Order created"
        );
        Ok(order)
    }

    /// Perform a role-gated status transition
    ///
    /// On success the version has been incremented by exactly one, the new
    /// status is durably recorded, and a `StatusChanged` event has been
    /// published. Every failure leaves status and version untouched and
    /// publishes nothing.
    pub async fn transition(
        &self,
        order_id: OrderId,
        requested: OrderStatus,
        acting_role: Role,
    ) -> Result<Order, TransitionError> {
        // Commit and publish under a per-order lock; without it a racing
        // transition could publish version v + 1 before v
        let lock = self.order_lock(order_id);
        let _guard = lock.lock().await;

        let current = self
            .store_call(self.store.get(order_id))
            .await??
            .ok_or(TransitionError::NotFound(order_id))?;
        let from = current.status;

        let capability = required_capability(from, requested).ok_or(
            TransitionError::IllegalTransition {
                from,
                to: requested,
            },
        )?;
        if !capability.permits(acting_role) {
            return Err(TransitionError::Forbidden {
                role: acting_role,
                from,
                to: requested,
            });
        }

        let updated = self
            .store_call(self.store.compare_and_set(order_id, current.version, requested))
            .await??;

        // Commit acknowledged; only now does anyone get to hear about it
        let event = StatusChanged {
            order_id,
            version: updated.version,
            old_status: from,
            new_status: requested,
            table_id: updated.table_id,
        };
        self.bus.publish(&event);

        tracing::info!(
            order_id,
            from = %from,
            to = %requested,
            version = updated.version,
            role = %acting_role,
            "Order transitioned"
        );

        // Terminal orders take no further transitions; release the lock slot
        if updated.status.is_terminal() {
            self.locks.remove(&order_id);
        }
        Ok(updated)
    }

    fn order_lock(&self, order_id: OrderId) -> Arc<Mutex<()>> {
        self.locks
            .entry(order_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Non-terminal orders, the full-state read used for resync
    pub async fn active_orders(&self) -> Result<Vec<Order>, TransitionError> {
        self.store_call(self.store.list_active()).await?
    }

    /// Fetch one order
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, TransitionError> {
        self.store_call(self.store.get(order_id))
            .await??
            .ok_or(TransitionError::NotFound(order_id))
    }

    // Bound every store call; an elapsed timeout is a transient store failure
    async fn store_call<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<Result<T, TransitionError>, TransitionError> {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => Ok(result.map_err(TransitionError::from)),
            Err(_) => Err(TransitionError::StoreUnavailable(format!(
                "store call timed out after {:?}",
                self.store_timeout
            ))),
        }
    }
}

impl From<StoreError> for TransitionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => TransitionError::NotFound(id),
            StoreError::Conflict { order_id, .. } => TransitionError::Conflict(order_id),
            StoreError::Unavailable(msg) => TransitionError::StoreUnavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::orders::store::MemoryOrderStore;
    use shared::message::SubscriptionScope;
    use shared::models::OrderLineInput;

    fn create_request(table_id: u64) -> CreateOrder {
        CreateOrder {
            table_id,
            items: vec![
                OrderLineInput {
                    menu_item_id: 10,
                    item_name: "Pad Thai".to_string(),
                    unit_price: 11.0,
                    quantity: 2,
                },
                OrderLineInput {
                    menu_item_id: 11,
                    item_name: "Iced Tea".to_string(),
                    unit_price: 2.5,
                    quantity: 2,
                },
            ],
        }
    }

    fn lifecycle() -> (OrderLifecycle, EventBus) {
        let bus = EventBus::new();
        let store = Arc::new(MemoryOrderStore::new());
        (OrderLifecycle::new(store, bus.clone()), bus)
    }

    #[test]
    fn test_edge_set() {
        use OrderStatus::*;

        assert_eq!(
            required_capability(Created, InPreparation),
            Some(Capability::Kitchen)
        );
        assert_eq!(
            required_capability(InPreparation, Ready),
            Some(Capability::Kitchen)
        );
        assert_eq!(required_capability(Ready, Delivered), Some(Capability::Waiter));
        for from in [Created, InPreparation, Ready] {
            assert_eq!(required_capability(from, Cancelled), Some(Capability::Cancel));
        }

        // No edge leaves a terminal state
        for to in [Created, InPreparation, Ready, Delivered, Cancelled] {
            assert_eq!(required_capability(Delivered, to), None);
            assert_eq!(required_capability(Cancelled, to), None);
        }

        // No skipping ahead
        assert_eq!(required_capability(Created, Ready), None);
        assert_eq!(required_capability(Created, Delivered), None);
        assert_eq!(required_capability(InPreparation, Delivered), None);
    }

    #[test]
    fn test_cancel_capability_roles() {
        assert!(Capability::Cancel.permits(Role::Manager));
        assert!(Capability::Cancel.permits(Role::System));
        assert!(!Capability::Cancel.permits(Role::Kitchen));
        assert!(!Capability::Cancel.permits(Role::Waiter));
    }

    #[tokio::test]
    async fn test_create_order_snapshots_total() {
        let (lifecycle, _bus) = lifecycle();
        let order = lifecycle.create_order(create_request(3)).await.unwrap();

        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.version, 1);
        assert_eq!(order.total_amount, 27.0);
        assert_eq!(order.items.len(), 2);
    }

    #[tokio::test]
    async fn test_happy_path_walk() {
        let (lifecycle, _bus) = lifecycle();
        let order = lifecycle.create_order(create_request(1)).await.unwrap();

        let order = lifecycle
            .transition(order.id, OrderStatus::InPreparation, Role::Kitchen)
            .await
            .unwrap();
        assert_eq!(order.version, 2);

        let order = lifecycle
            .transition(order.id, OrderStatus::Ready, Role::Kitchen)
            .await
            .unwrap();
        assert_eq!(order.version, 3);

        let order = lifecycle
            .transition(order.id, OrderStatus::Delivered, Role::Waiter)
            .await
            .unwrap();
        assert_eq!(order.version, 4);
        assert!(order.is_terminal());
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let (lifecycle, _bus) = lifecycle();
        let err = lifecycle
            .transition(999, OrderStatus::InPreparation, Role::Kitchen)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::NotFound(999)));
    }

    #[tokio::test]
    async fn test_illegal_edge_rejected() {
        let (lifecycle, _bus) = lifecycle();
        let order = lifecycle.create_order(create_request(1)).await.unwrap();

        let err = lifecycle
            .transition(order.id, OrderStatus::Delivered, Role::Waiter)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn test_terminal_state_has_no_exit() {
        let (lifecycle, _bus) = lifecycle();
        let order = lifecycle.create_order(create_request(1)).await.unwrap();
        lifecycle
            .transition(order.id, OrderStatus::Cancelled, Role::Manager)
            .await
            .unwrap();

        let err = lifecycle
            .transition(order.id, OrderStatus::InPreparation, Role::Kitchen)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn test_forbidden_leaves_order_unchanged() {
        let (lifecycle, _bus) = lifecycle();
        let order = lifecycle.create_order(create_request(1)).await.unwrap();

        // Waiter has no kitchen capability
        let err = lifecycle
            .transition(order.id, OrderStatus::InPreparation, Role::Waiter)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::Forbidden { .. }));

        let current = lifecycle.get_order(order.id).await.unwrap();
        assert_eq!(current.status, OrderStatus::Created);
        assert_eq!(current.version, 1);
    }

    #[tokio::test]
    async fn test_forbidden_publishes_nothing() {
        let (lifecycle, bus) = lifecycle();
        let order = lifecycle.create_order(create_request(1)).await.unwrap();
        let mut sub = bus.subscribe(SubscriptionScope::Staff);

        let _ = lifecycle
            .transition(order.id, OrderStatus::InPreparation, Role::Waiter)
            .await
            .unwrap_err();

        // A subsequent legal transition is the first thing the subscriber sees
        lifecycle
            .transition(order.id, OrderStatus::InPreparation, Role::Kitchen)
            .await
            .unwrap();

        match sub.next().await {
            Some(crate::bus::BusEvent::Status(ev)) => {
                assert_eq!(ev.version, 2);
                assert_eq!(ev.old_status, OrderStatus::Created);
                assert_eq!(ev.new_status, OrderStatus::InPreparation);
            }
            other => panic!("Expected status event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_transition_conflicts() {
        let (lifecycle, bus) = lifecycle();
        let order = lifecycle.create_order(create_request(7)).await.unwrap();
        assert_eq!(order.version, 1);
        let mut sub = bus.subscribe(SubscriptionScope::Staff);

        // Kitchen wins the race
        let updated = lifecycle
            .transition(order.id, OrderStatus::InPreparation, Role::Kitchen)
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        // The manager's cancel was issued against version 1 and loses.
        // Simulate by resetting the store view: the manager refetched nothing
        // and the CAS inside transition now runs against version 2, where the
        // cancel edge is still legal, so force the stale write directly.
        let store = lifecycle.store.clone();
        let err = store
            .compare_and_set(order.id, 1, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        let current = lifecycle.get_order(order.id).await.unwrap();
        assert_eq!(current.status, OrderStatus::InPreparation);
        assert_eq!(current.version, 2);

        // Exactly one event was published
        match sub.next().await {
            Some(crate::bus::BusEvent::Status(ev)) => assert_eq!(ev.version, 2),
            other => panic!("Expected status event, got {:?}", other),
        }
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn test_commit_then_publish_event_shape() {
        let (lifecycle, bus) = lifecycle();
        let order = lifecycle.create_order(create_request(5)).await.unwrap();
        let mut sub = bus.subscribe(SubscriptionScope::Staff);

        lifecycle
            .transition(order.id, OrderStatus::InPreparation, Role::Kitchen)
            .await
            .unwrap();

        match sub.next().await {
            Some(crate::bus::BusEvent::Status(ev)) => {
                assert_eq!(ev.order_id, order.id);
                assert_eq!(ev.table_id, 5);
                assert_eq!(ev.version, 2);
                assert_eq!(ev.old_status, OrderStatus::Created);
                assert_eq!(ev.new_status, OrderStatus::InPreparation);
            }
            other => panic!("Expected status event, got {:?}", other),
        }
    }

    /// Commits become visible to readers before the writer's ack returns
    #[derive(Debug)]
    struct AckDelayedStore {
        inner: MemoryOrderStore,
        ack_delay: Duration,
    }

    #[async_trait::async_trait]
    impl OrderStore for AckDelayedStore {
        async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
            self.inner.get(id).await
        }

        async fn insert(&self, order: NewOrder) -> Result<Order, StoreError> {
            self.inner.insert(order).await
        }

        async fn compare_and_set(
            &self,
            id: OrderId,
            expected_version: u64,
            status: OrderStatus,
        ) -> Result<Order, StoreError> {
            let result = self.inner.compare_and_set(id, expected_version, status).await;
            tokio::time::sleep(self.ack_delay).await;
            result
        }

        async fn list_active(&self) -> Result<Vec<Order>, StoreError> {
            self.inner.list_active().await
        }
    }

    #[tokio::test]
    async fn test_racing_transitions_publish_in_version_order() {
        let bus = EventBus::new();
        let store = Arc::new(AckDelayedStore {
            inner: MemoryOrderStore::new(),
            ack_delay: Duration::from_millis(100),
        });
        let lifecycle = OrderLifecycle::new(store, bus.clone());
        let order = lifecycle.create_order(create_request(4)).await.unwrap();
        let mut sub = bus.subscribe(SubscriptionScope::Staff);

        // The first transition commits quickly but its ack is delayed; the
        // second starts inside that window and must not publish first
        let first = {
            let lifecycle = lifecycle.clone();
            let id = order.id;
            tokio::spawn(async move {
                lifecycle
                    .transition(id, OrderStatus::InPreparation, Role::Kitchen)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        let second = lifecycle
            .transition(order.id, OrderStatus::Ready, Role::Kitchen)
            .await;

        assert_eq!(first.await.unwrap().unwrap().version, 2);
        assert_eq!(second.unwrap().version, 3);

        let mut versions = Vec::new();
        for _ in 0..2 {
            match sub.next().await {
                Some(crate::bus::BusEvent::Status(ev)) => versions.push(ev.version),
                other => panic!("Expected status event, got {:?}", other),
            }
        }
        assert_eq!(versions, vec![2, 3]);
    }

    /// Reads work but the write path never answers
    #[derive(Debug)]
    struct StalledWriteStore {
        inner: MemoryOrderStore,
    }

    #[async_trait::async_trait]
    impl OrderStore for StalledWriteStore {
        async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
            self.inner.get(id).await
        }

        async fn insert(&self, order: NewOrder) -> Result<Order, StoreError> {
            self.inner.insert(order).await
        }

        async fn compare_and_set(
            &self,
            _id: OrderId,
            _expected_version: u64,
            _status: OrderStatus,
        ) -> Result<Order, StoreError> {
            std::future::pending().await
        }

        async fn list_active(&self) -> Result<Vec<Order>, StoreError> {
            self.inner.list_active().await
        }
    }

    #[tokio::test]
    async fn test_stalled_store_is_unavailable_and_publishes_nothing() {
        let bus = EventBus::new();
        let store = Arc::new(StalledWriteStore {
            inner: MemoryOrderStore::new(),
        });
        let lifecycle =
            OrderLifecycle::new(store, bus.clone()).with_store_timeout(Duration::from_millis(50));
        let order = lifecycle.create_order(create_request(1)).await.unwrap();
        let mut sub = bus.subscribe(SubscriptionScope::Staff);

        let err = lifecycle
            .transition(order.id, OrderStatus::InPreparation, Role::Kitchen)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::StoreUnavailable(_)));

        let current = lifecycle.get_order(order.id).await.unwrap();
        assert_eq!(current.status, OrderStatus::Created);
        assert_eq!(current.version, 1);
        assert!(sub.try_next().is_none());
    }
}
