//! Table API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use shared::error::ApiResponse;
use shared::models::TableOccupancy;

use crate::core::ServerState;
use crate::utils::AppResult;

/// Derived occupancy for one table
///
/// Unknown table ids simply report unoccupied; tables live in an external
/// system and are not validated here.
pub async fn occupancy(
    State(state): State<ServerState>,
    Path(table_id): Path<u64>,
) -> AppResult<Json<ApiResponse<TableOccupancy>>> {
    let active = state
        .lifecycle
        .active_orders()
        .await?
        .into_iter()
        .filter(|o| o.table_id == table_id)
        .count() as u32;

    Ok(Json(ApiResponse::success(TableOccupancy {
        table_id,
        occupied: active > 0,
        active_orders: active,
    })))
}
