//! Push notification channel
//!
//! Long-lived TCP channels carrying committed status events to subscribers:
//!
//! ```text
//!  EventBus ──▶ SubscriptionChannel ──▶ Transport ──▶ wire
//!                    ▲
//!              PushServer (accept + handshake)
//! ```

pub mod channel;
pub mod tcp_server;
pub mod transport;

pub use channel::SubscriptionChannel;
pub use tcp_server::{PushServer, serve_connection};
pub use transport::{MemoryTransport, TcpTransport, Transport};
