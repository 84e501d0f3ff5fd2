//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Dining table entity
///
/// Tables are administered by an external collaborator; the core only reads
/// them to derive occupancy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: u64,
    pub name: String,
    pub capacity: u32,
}

/// Derived occupancy view for a table
///
/// A table is occupied while at least one of its orders is in a non-terminal
/// status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableOccupancy {
    pub table_id: u64,
    pub occupied: bool,
    /// Non-terminal orders currently open on this table
    pub active_orders: u32,
}
