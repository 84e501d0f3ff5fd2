//! Order API Module
//!
//! Creation, status transitions, and the snapshot reads used for resync.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        // Resync read; must stay cheap, clients hit it after every gap
        .route("/active", get(handler::list_active))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/transition", post(handler::transition))
}
