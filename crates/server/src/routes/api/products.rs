//! `/api/products` handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::ApiAuth;
use crate::models::Product;
use crate::state::AppState;

/// `GET /api/products/` - active products.
#[instrument(skip(state, auth))]
pub async fn index(State(state): State<AppState>, auth: ApiAuth) -> Result<Json<Vec<Product>>> {
    auth.require(|s| s.read_products)?;

    let products = super::super::products::cached_active_products(&state).await?;
    Ok(Json(products.as_ref().clone()))
}

/// `GET /api/products/{slug}/` - product detail with its gallery.
#[instrument(skip(state, auth))]
pub async fn show(
    State(state): State<AppState>,
    auth: ApiAuth,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>> {
    auth.require(|s| s.read_products)?;

    let products = ProductRepository::new(state.pool());
    let product = products
        .get_active_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product '{slug}'")))?;
    let images = products.images(product.id).await?;

    Ok(Json(serde_json::json!({ "product": product, "images": images })))
}
