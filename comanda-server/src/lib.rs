//! Comanda Server - table-ordering lifecycle and live status hub
//!
//! # Architecture overview
//!
//! - **Order lifecycle** (`orders`): the status state machine with role
//!   gates, backed by a pluggable order store with optimistic concurrency
//! - **Event bus** (`bus`): in-process fan-out of status-change events with
//!   per-subscriber bounded queues and server-side scope filtering
//! - **Push channels** (`message`): long-lived TCP subscription channels
//!   with handshake, heartbeats, and degraded-stream resync hints
//! - **HTTP API** (`api`): role-driven transitions and snapshot reads
//!
//! # Module structure
//!
//! ```text
//! comanda-server/src/
//! ├── core/          # Config, state, server startup
//! ├── orders/        # State machine + order store
//! ├── bus/           # Event bus
//! ├── message/       # Push channels (TCP server, transports)
//! ├── api/           # HTTP routes and handlers
//! └── utils/         # Errors, logging
//! ```

pub mod api;
pub mod bus;
pub mod core;
pub mod message;
pub mod orders;
pub mod utils;

// Re-export public types
pub use bus::{BusEvent, EventBus, SubscriptionHandle};
pub use core::{Config, Server, ServerState};
pub use orders::{MemoryOrderStore, OrderLifecycle, OrderStore, StoreError, TransitionError};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
