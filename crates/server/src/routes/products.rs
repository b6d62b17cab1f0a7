//! Storefront product route handlers.
//!
//! The listing is served from a 5-minute cache; admin catalog writes
//! invalidate it.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::state::AppState;

/// Cache key for the active-product listing.
const ACTIVE_LISTING_KEY: &str = "products:active";

/// Fetch the active listing through the cache.
pub(crate) async fn cached_active_products(state: &AppState) -> Result<Arc<Vec<Product>>> {
    if let Some(cached) = state.product_cache().get(ACTIVE_LISTING_KEY).await {
        return Ok(cached);
    }

    let products = Arc::new(ProductRepository::new(state.pool()).list_active().await?);
    state
        .product_cache()
        .insert(ACTIVE_LISTING_KEY.to_owned(), Arc::clone(&products))
        .await;
    Ok(products)
}

/// Product listing.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = cached_active_products(&state).await?;
    Ok(Json(products.as_ref().clone()))
}

/// Product detail by slug, with its gallery.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>> {
    let products = ProductRepository::new(state.pool());
    let product = products
        .get_active_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product '{slug}'")))?;
    let images = products.images(product.id).await?;

    Ok(Json(json!({ "product": product, "images": images })))
}
