//! Domain models shared between server and clients

pub mod dining_table;
pub mod order;
pub mod role;

pub use dining_table::{DiningTable, TableOccupancy};
pub use order::{CreateOrder, Order, OrderId, OrderLine, OrderLineInput, OrderStatus};
pub use role::Role;
