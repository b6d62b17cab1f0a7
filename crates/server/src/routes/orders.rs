//! Order history route handlers (session auth).

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use tracing::instrument;

use bluewave_core::OrderId;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::state::AppState;

/// List the user's orders, newest first.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Value>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(json!({ "orders": orders })))
}

/// Order detail with its lines, scoped to the owner.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let order_id: OrderId = id
        .parse()
        .map_err(|_| AppError::BadRequest("invalid order id".to_owned()))?;

    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get_for_user(order_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("order not found".to_owned()))?;
    let items = orders.items(order.id).await?;

    Ok(Json(json!({ "order": order, "items": items })))
}
