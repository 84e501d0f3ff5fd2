//! Order lifecycle module
//!
//! - **lifecycle**: the status state machine with role-capability gates
//! - **store**: the durable order store contract plus an in-memory
//!   implementation
//!
//! # Data flow
//!
//! ```text
//! Role action → OrderLifecycle::transition
//!                    │ validate edge + capability
//!                    ▼
//!              OrderStore::compare_and_set   (optimistic concurrency)
//!                    │ commit acknowledged
//!                    ▼
//!              EventBus::publish(StatusChanged)
//!                    ▼
//!              All matching subscription channels
//! ```

pub mod lifecycle;
pub mod store;

pub use lifecycle::{Capability, OrderLifecycle, TransitionError, required_capability};
pub use store::{MemoryOrderStore, NewOrder, OrderStore, StoreError};

// Re-export shared types for convenience
pub use shared::event::StatusChanged;
pub use shared::models::{CreateOrder, Order, OrderId, OrderLine, OrderStatus, Role};
