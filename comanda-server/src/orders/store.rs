//! Order store contract and in-memory implementation
//!
//! The durable store is an external collaborator; the lifecycle only relies
//! on this narrow contract. The store is the single writer of record and is
//! accessed concurrently by multiple role-driven callers; conflicting writes
//! are rejected via version compare-and-set, never silently overwritten.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use shared::models::{Order, OrderId, OrderLine, OrderStatus};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    #[error("Version conflict on order {order_id}: expected {expected}, found {found}")]
    Conflict {
        order_id: OrderId,
        expected: u64,
        found: u64,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Fields of an order that the store does not assign
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub table_id: u64,
    pub items: Vec<OrderLine>,
    pub created_at: String,
    pub total_amount: f64,
}

/// Durable keyed storage for orders
///
/// `compare_and_set` applies a status mutation only when the caller's
/// expected version still matches, incrementing the version by exactly one on
/// success.
#[async_trait]
pub trait OrderStore: Send + Sync + std::fmt::Debug {
    /// Fetch one order
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Persist a new order; the store assigns the id
    async fn insert(&self, order: NewOrder) -> Result<Order, StoreError>;

    /// Atomically set `status` if the stored version equals `expected_version`
    async fn compare_and_set(
        &self,
        id: OrderId,
        expected_version: u64,
        status: OrderStatus,
    ) -> Result<Order, StoreError>;

    /// All orders in a non-terminal status
    async fn list_active(&self) -> Result<Vec<Order>, StoreError>;
}

/// In-memory order store
///
/// Reference implementation of the store contract, also used by tests.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: DashMap<OrderId, Order>,
    next_id: AtomicU64,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(&id).map(|o| o.clone()))
    }

    async fn insert(&self, order: NewOrder) -> Result<Order, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let order = Order {
            id,
            table_id: order.table_id,
            items: order.items,
            status: OrderStatus::Created,
            created_at: order.created_at,
            total_amount: order.total_amount,
            version: 1,
        };
        self.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn compare_and_set(
        &self,
        id: OrderId,
        expected_version: u64,
        status: OrderStatus,
    ) -> Result<Order, StoreError> {
        // Entry lock serializes concurrent writers on the same order
        let mut entry = self.orders.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if entry.version != expected_version {
            return Err(StoreError::Conflict {
                order_id: id,
                expected: expected_version,
                found: entry.version,
            });
        }
        entry.status = status;
        entry.version += 1;
        Ok(entry.clone())
    }

    async fn list_active(&self) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| !o.status.is_terminal())
            .map(|o| o.clone())
            .collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_order(table_id: u64) -> NewOrder {
        NewOrder {
            table_id,
            items: vec![OrderLine {
                menu_item_id: 1,
                item_name: "Ramen".to_string(),
                unit_price: 12.0,
                quantity: 1,
            }],
            created_at: "2026-01-01T12:00:00Z".to_string(),
            total_amount: 12.0,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_initial_version() {
        let store = MemoryOrderStore::new();
        let a = store.insert(new_order(1)).await.unwrap();
        let b = store.insert(new_order(2)).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.version, 1);
        assert_eq!(a.status, OrderStatus::Created);
    }

    #[tokio::test]
    async fn test_cas_rejects_stale_version() {
        let store = MemoryOrderStore::new();
        let order = store.insert(new_order(1)).await.unwrap();

        let updated = store
            .compare_and_set(order.id, 1, OrderStatus::InPreparation)
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        // Second writer still holding version 1
        let err = store
            .compare_and_set(order.id, 1, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        // The conflicting write left nothing behind
        let current = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(current.status, OrderStatus::InPreparation);
        assert_eq!(current.version, 2);
    }

    #[tokio::test]
    async fn test_list_active_excludes_terminal() {
        let store = MemoryOrderStore::new();
        let a = store.insert(new_order(1)).await.unwrap();
        let b = store.insert(new_order(2)).await.unwrap();

        store
            .compare_and_set(a.id, 1, OrderStatus::Cancelled)
            .await
            .unwrap();

        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b.id);
    }
}
