//! Table API Module
//!
//! Occupancy is derived from active orders, not stored.

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Table router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/tables/{id}/occupancy", get(handler::occupancy))
}
