//! Comanda Client - reconnecting consumer of the order status feed
//!
//! ```ignore
//! use comanda_client::{FeedConfig, FeedEvent, HttpSnapshotSource, OrderFeed};
//!
//! let config = FeedConfig::staff("127.0.0.1:9100");
//! let mut feed = OrderFeed::new(config)
//!     .with_snapshot_source(HttpSnapshotSource::new("http://127.0.0.1:8080"))
//!     .start();
//!
//! while let Some(event) = feed.recv().await {
//!     match event {
//!         FeedEvent::StatusChanged(ev) => println!("{} -> {}", ev.order_id, ev.new_status),
//!         FeedEvent::Resynced { orders } => println!("resynced {} orders", orders.len()),
//!         _ => {}
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod feed;
pub mod http;
pub mod message;

pub use config::FeedConfig;
pub use error::{FeedError, FeedResult, MessageError};
pub use feed::{FeedEvent, FeedHandle, OrderFeed, SnapshotSource};
pub use http::HttpSnapshotSource;
pub use message::MessageClient;

// Re-export the shared types consumers handle
pub use shared::event::StatusChanged;
pub use shared::message::SubscriptionScope;
pub use shared::models::{Order, OrderStatus};
