//! `/api/wishlist` handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use bluewave_core::ProductId;

use crate::db::{CartRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::ApiAuth;
use crate::state::AppState;

/// Body for wishlist item operations.
#[derive(Debug, Deserialize)]
pub struct WishlistItemRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub note: String,
}

/// `GET /api/wishlist/` - the caller's wishlist.
#[instrument(skip(state, auth))]
pub async fn current(State(state): State<AppState>, auth: ApiAuth) -> Result<Json<Value>> {
    auth.require(|s| s.manage_wishlist)?;

    let cart = CartRepository::new(state.pool());
    let items = cart.wishlist_items(auth.user.id).await?;
    let item_count = items.len();

    Ok(Json(json!({ "items": items, "item_count": item_count })))
}

/// `POST /api/wishlist/add_item/` - save a product; idempotent.
#[instrument(skip(state, auth, body))]
pub async fn add_item(
    State(state): State<AppState>,
    auth: ApiAuth,
    Json(body): Json<WishlistItemRequest>,
) -> Result<Json<Value>> {
    auth.require(|s| s.manage_wishlist)?;

    let product = ProductRepository::new(state.pool())
        .get_active_by_id(body.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;

    let cart = CartRepository::new(state.pool());
    let created = cart
        .add_wishlist_item(auth.user.id, product.id, &body.note)
        .await?;
    let total = cart.wishlist_count(auth.user.id).await?;

    let message = if created {
        format!("{} added to wishlist", product.name)
    } else {
        "Item already in wishlist".to_owned()
    };

    Ok(Json(json!({
        "message": message,
        "wishlist_total_items": total,
    })))
}

/// `POST /api/wishlist/remove_item/` - remove a saved product.
#[instrument(skip(state, auth, body))]
pub async fn remove_item(
    State(state): State<AppState>,
    auth: ApiAuth,
    Json(body): Json<WishlistItemRequest>,
) -> Result<Json<Value>> {
    auth.require(|s| s.manage_wishlist)?;

    let cart = CartRepository::new(state.pool());
    if !cart
        .remove_wishlist_item(auth.user.id, body.product_id)
        .await?
    {
        return Err(AppError::NotFound(
            "Item not found in wishlist".to_owned(),
        ));
    }

    let total = cart.wishlist_count(auth.user.id).await?;
    Ok(Json(json!({
        "message": "Item removed from wishlist",
        "wishlist_total_items": total,
    })))
}
