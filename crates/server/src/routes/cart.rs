//! Storefront cart route handlers (session auth).

use axum::{
    Form, Json,
    extract::State,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use bluewave_core::ProductId;

use crate::db::{CartRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::cart::{CartItem, CartSummary};
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Cart line shaped for responses: formatted prices and the price-drift
/// flag the cart page shows before checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub price_when_added: String,
    pub price_changed: bool,
}

impl From<&CartItem> for CartLineView {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product.id,
            name: item.product.name.clone(),
            slug: item.product.slug.clone(),
            image: item.product.main_image.clone(),
            quantity: item.quantity,
            price: item.product.price.display(),
            line_price: item.line_total().display(),
            price_when_added: item.price_when_added.display(),
            price_changed: item.price_changed(),
        }
    }
}

/// Cart contents shaped for responses.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total_items: u32,
    pub total_price: String,
}

impl CartView {
    /// Build the response view from cart lines.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let lines = items.iter().map(CartLineView::from).collect();
        let summary = CartSummary::from_items(items);
        Self {
            items: lines,
            total_items: summary.total_items,
            total_price: summary.total_price.display(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Display the cart.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<CartView>> {
    let items = CartRepository::new(state.pool()).items(user.id).await?;
    Ok(Json(CartView::from_items(items)))
}

/// Add an item to the cart.
///
/// Rejects inactive and out-of-stock products; adding an existing product
/// increments its quantity.
#[instrument(skip(state, user, form))]
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<AddToCartForm>,
) -> Result<Json<serde_json::Value>> {
    let quantity = form.quantity.unwrap_or(1).max(1);

    let product = ProductRepository::new(state.pool())
        .get_active_by_id(form.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("product not found".to_owned()))?;

    if !product.is_in_stock() {
        return Err(AppError::BadRequest(format!(
            "{} is out of stock",
            product.name
        )));
    }

    let cart = CartRepository::new(state.pool());
    cart.add_item(user.id, &product, quantity).await?;

    let items = cart.items(user.id).await?;
    let summary = CartSummary::from_items(items);

    Ok(Json(json!({
        "message": format!("{} added to cart", product.name),
        "cart_total_items": summary.total_items,
    })))
}

/// Update a line's quantity. Zero removes the line.
#[instrument(skip(state, user, form))]
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<UpdateCartForm>,
) -> Result<Json<CartView>> {
    let cart = CartRepository::new(state.pool());

    if form.quantity == 0 {
        cart.remove_item(user.id, form.product_id).await?;
    } else {
        cart.set_quantity(user.id, form.product_id, form.quantity)
            .await
            .map_err(|e| match e {
                crate::db::RepositoryError::NotFound => {
                    AppError::NotFound("item not found in cart".to_owned())
                }
                other => other.into(),
            })?;
    }

    let items = cart.items(user.id).await?;
    Ok(Json(CartView::from_items(items)))
}

/// Remove an item from the cart.
#[instrument(skip(state, user, form))]
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Json<CartView>> {
    let cart = CartRepository::new(state.pool());

    if !cart.remove_item(user.id, form.product_id).await? {
        return Err(AppError::NotFound("item not found in cart".to_owned()));
    }

    let items = cart.items(user.id).await?;
    Ok(Json(CartView::from_items(items)))
}

/// Cart badge count.
#[instrument(skip(state, user))]
pub async fn count(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<serde_json::Value>> {
    let items = CartRepository::new(state.pool()).items(user.id).await?;
    let count: u32 = items.iter().map(|i| i.quantity).sum();
    Ok(Json(json!({ "count": count })))
}
