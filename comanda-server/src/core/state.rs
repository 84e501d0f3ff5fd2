//! Server state
//!
//! Holds shared references to every long-lived service. Cloning is shallow;
//! all clones see the same store, bus, and lifecycle.
//!
//! | Field | Type | Purpose |
//! |-------|------|---------|
//! | config | Arc<Config> | Immutable configuration |
//! | store | Arc<dyn OrderStore> | Order persistence |
//! | bus | EventBus | Status event fan-out |
//! | lifecycle | Arc<OrderLifecycle> | Transition state machine |
//! | shutdown_token | CancellationToken | Coordinated shutdown |

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::bus::EventBus;
use crate::core::Config;
use crate::orders::{MemoryOrderStore, OrderLifecycle, OrderStore};

#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub store: Arc<dyn OrderStore>,
    pub bus: EventBus,
    pub lifecycle: Arc<OrderLifecycle>,
    pub shutdown_token: CancellationToken,
}

impl ServerState {
    /// Build the full service graph from configuration
    pub fn initialize(config: &Config) -> Self {
        let config = Arc::new(config.clone());
        let store: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
        let bus = EventBus::with_capacity(config.event_queue_capacity);
        let lifecycle = Arc::new(
            OrderLifecycle::new(store.clone(), bus.clone())
                .with_store_timeout(config.store_timeout()),
        );

        Self {
            config,
            store,
            bus,
            lifecycle,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Variant with a caller-supplied store, used by tests
    pub fn with_store(config: &Config, store: Arc<dyn OrderStore>) -> Self {
        let config = Arc::new(config.clone());
        let bus = EventBus::with_capacity(config.event_queue_capacity);
        let lifecycle = Arc::new(
            OrderLifecycle::new(store.clone(), bus.clone())
                .with_store_timeout(config.store_timeout()),
        );

        Self {
            config,
            store,
            bus,
            lifecycle,
            shutdown_token: CancellationToken::new(),
        }
    }
}
