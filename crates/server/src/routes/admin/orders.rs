//! Admin order handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use bluewave_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Status change payload.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: OrderStatus,
}

/// `GET /admin/orders` - every order, newest first.
#[instrument(skip(state, _admin))]
pub async fn index(State(state): State<AppState>, _admin: RequireAdmin) -> Result<Json<Value>> {
    let orders = OrderRepository::new(state.pool()).list_all().await?;
    Ok(Json(json!({ "orders": orders })))
}

/// `POST /admin/orders/{id}/status` - move an order through its lifecycle.
#[instrument(skip(state, admin, form))]
pub async fn set_status(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    Json(form): Json<StatusForm>,
) -> Result<Json<Value>> {
    let order_id: OrderId = id
        .parse()
        .map_err(|_| AppError::BadRequest("invalid order id".to_owned()))?;

    OrderRepository::new(state.pool())
        .set_status(order_id, form.status)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => {
                AppError::NotFound("order not found".to_owned())
            }
            other => other.into(),
        })?;

    tracing::info!(
        order_id = %order_id,
        status = %form.status,
        admin = %admin.0.username,
        "order status changed"
    );
    Ok(Json(json!({ "message": "Order updated", "status": form.status })))
}
