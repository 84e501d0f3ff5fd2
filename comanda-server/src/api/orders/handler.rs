//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use shared::error::ApiResponse;
use shared::models::{CreateOrder, Order, OrderId, OrderStatus};

use super::super::ActorRole;
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// Create an order
///
/// Items arrive already priced; the total is snapshotted here and never
/// recomputed.
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateOrder>,
) -> AppResult<Json<ApiResponse<Order>>> {
    if payload.items.is_empty() {
        return Err(AppError::invalid("Order must contain at least one item"));
    }
    if payload.items.iter().any(|i| i.quantity == 0) {
        return Err(AppError::invalid("Item quantity must be positive"));
    }

    let order = state.lifecycle.create_order(payload).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Transition request body
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: OrderStatus,
}

/// Perform a role-gated status transition
pub async fn transition(
    State(state): State<ServerState>,
    Path(id): Path<OrderId>,
    ActorRole(role): ActorRole,
    Json(payload): Json<TransitionRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.lifecycle.transition(id, payload.status, role).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<OrderId>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.lifecycle.get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Query params for the active-orders read
#[derive(Debug, Deserialize)]
pub struct ActiveQuery {
    pub table_id: Option<u64>,
}

/// List non-terminal orders, optionally filtered by table
pub async fn list_active(
    State(state): State<ServerState>,
    Query(query): Query<ActiveQuery>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let mut orders = state.lifecycle.active_orders().await?;
    if let Some(table_id) = query.table_id {
        orders.retain(|o| o.table_id == table_id);
    }
    Ok(Json(ApiResponse::success(orders)))
}
