//! `/api/cart` handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use bluewave_core::ProductId;

use crate::db::{CartRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::ApiAuth;
use crate::models::CartSummary;
use crate::routes::cart::CartView;
use crate::state::AppState;

/// Body for cart item operations.
#[derive(Debug, Deserialize)]
pub struct CartItemRequest {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// `GET /api/cart/` - the caller's cart.
#[instrument(skip(state, auth))]
pub async fn current(State(state): State<AppState>, auth: ApiAuth) -> Result<Json<CartView>> {
    auth.require(|s| s.manage_cart)?;

    let items = CartRepository::new(state.pool())
        .items(auth.user.id)
        .await?;
    Ok(Json(CartView::from_items(items)))
}

/// `POST /api/cart/add_item/` - add a product to the cart.
#[instrument(skip(state, auth, body))]
pub async fn add_item(
    State(state): State<AppState>,
    auth: ApiAuth,
    Json(body): Json<CartItemRequest>,
) -> Result<Json<Value>> {
    auth.require(|s| s.manage_cart)?;

    let quantity = body.quantity.unwrap_or(1).max(1);

    let product = ProductRepository::new(state.pool())
        .get_active_by_id(body.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;

    let cart = CartRepository::new(state.pool());
    cart.add_item(auth.user.id, &product, quantity).await?;

    let summary = CartSummary::from_items(cart.items(auth.user.id).await?);
    Ok(Json(json!({
        "message": format!("{} added to cart", product.name),
        "cart_total_items": summary.total_items,
    })))
}

/// `POST /api/cart/remove_item/` - remove a product from the cart.
#[instrument(skip(state, auth, body))]
pub async fn remove_item(
    State(state): State<AppState>,
    auth: ApiAuth,
    Json(body): Json<CartItemRequest>,
) -> Result<Json<Value>> {
    auth.require(|s| s.manage_cart)?;

    let cart = CartRepository::new(state.pool());
    if !cart.remove_item(auth.user.id, body.product_id).await? {
        return Err(AppError::NotFound("Item not found in cart".to_owned()));
    }

    let summary = CartSummary::from_items(cart.items(auth.user.id).await?);
    Ok(Json(json!({
        "message": "Item removed from cart",
        "cart_total_items": summary.total_items,
    })))
}

/// `POST /api/cart/clear/` - empty the cart.
#[instrument(skip(state, auth))]
pub async fn clear(State(state): State<AppState>, auth: ApiAuth) -> Result<Json<Value>> {
    auth.require(|s| s.manage_cart)?;

    CartRepository::new(state.pool()).clear(auth.user.id).await?;
    Ok(Json(json!({ "message": "Cart cleared" })))
}
