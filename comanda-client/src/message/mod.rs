//! Push channel client: transports and the per-session protocol

pub mod client;
pub mod transport;

pub use client::MessageClient;
pub use transport::{ClientTransport, MemoryTransport, TcpTransport};
