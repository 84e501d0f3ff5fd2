//! HTTP API
//!
//! # Route list
//!
//! | Path | Method | Purpose | Role header |
//! |------|--------|---------|-------------|
//! | /api/orders | POST | Create order | no |
//! | /api/orders/active | GET | Non-terminal orders (resync read) | no |
//! | /api/orders/{id} | GET | Order snapshot | no |
//! | /api/orders/{id}/transition | POST | Status transition | yes |
//! | /api/tables/{id}/occupancy | GET | Derived occupancy | no |
//! | /health | GET | Liveness | no |
//!
//! The acting role is resolved by an upstream gateway and presented as the
//! `x-actor-role` header; this server trusts it as stated.

pub mod health;
pub mod orders;
pub mod tables;

use std::str::FromStr;

use axum::{Router, extract::FromRequestParts, http::request::Parts};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use shared::models::Role;

use crate::core::ServerState;
use crate::utils::AppError;

/// Header carrying the externally resolved acting role
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Build the fully configured application router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(orders::router())
        .merge(tables::router())
        .merge(health::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Extractor for the `x-actor-role` header
///
/// Missing or unrecognized values reject the request before the handler runs.
#[derive(Debug, Clone, Copy)]
pub struct ActorRole(pub Role);

impl<S: Send + Sync> FromRequestParts<S> for ActorRole {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ACTOR_ROLE_HEADER)
            .ok_or_else(|| AppError::invalid(format!("Missing {} header", ACTOR_ROLE_HEADER)))?
            .to_str()
            .map_err(|_| AppError::invalid(format!("Invalid {} header", ACTOR_ROLE_HEADER)))?;

        let role = Role::from_str(value)
            .map_err(|_| AppError::invalid(format!("Unknown role: {}", value)))?;
        Ok(ActorRole(role))
    }
}
