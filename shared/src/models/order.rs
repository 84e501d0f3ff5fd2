//! Order Model

use serde::{Deserialize, Serialize};

/// Order identifier, assigned by the order store at creation
pub type OrderId = u64;

/// Order lifecycle status
///
/// Transitions walk a fixed directed graph owned by the server's lifecycle
/// module; `Delivered` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Created,
    InPreparation,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Created => write!(f, "CREATED"),
            OrderStatus::InPreparation => write!(f, "IN_PREPARATION"),
            OrderStatus::Ready => write!(f, "READY"),
            OrderStatus::Delivered => write!(f, "DELIVERED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Order line - menu item snapshot taken at order creation
///
/// Name and price are copied from the menu when the order is placed so later
/// menu edits never change a historical order's total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    /// Menu item reference
    pub menu_item_id: u64,
    pub item_name: String,
    /// Unit price in currency unit
    pub unit_price: f64,
    pub quantity: u32,
}

impl OrderLine {
    /// Line total (unit price x quantity)
    pub fn line_total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: OrderId,
    /// Table this order belongs to (the table outlives its orders)
    pub table_id: u64,
    pub items: Vec<OrderLine>,
    pub status: OrderStatus,
    /// Creation timestamp (RFC 3339), set once
    pub created_at: String,
    /// Total amount in currency unit, computed at creation, immutable
    pub total_amount: f64,
    /// Monotonic counter, +1 per accepted transition; used for optimistic
    /// concurrency and event deduplication
    pub version: u64,
}

impl Order {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Sum of line totals over the snapshotted items
    pub fn compute_total(items: &[OrderLine]) -> f64 {
        items.iter().map(OrderLine::line_total).sum()
    }
}

/// Order line input - priced cart line submitted at order placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub menu_item_id: u64,
    pub item_name: String,
    pub unit_price: f64,
    pub quantity: u32,
}

impl From<OrderLineInput> for OrderLine {
    fn from(input: OrderLineInput) -> Self {
        Self {
            menu_item_id: input.menu_item_id,
            item_name: input.item_name,
            unit_price: input.unit_price,
            quantity: input.quantity,
        }
    }
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrder {
    pub table_id: u64,
    pub items: Vec<OrderLineInput>,
}
