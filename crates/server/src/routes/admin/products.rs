//! Admin product CRUD handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use bluewave_core::{CategoryId, CurrencyCode, Money, ProductId, ProductStatus, ProductType};

use crate::db::ProductRepository;
use crate::db::products::NewProduct;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Product;
use crate::state::AppState;

/// Product create/update payload.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub environmental_notes: Option<String>,
    pub product_type: ProductType,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i32,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub main_image: Option<String>,
}

const fn default_low_stock_threshold() -> i32 {
    10
}

/// Stock adjustment payload.
#[derive(Debug, Deserialize)]
pub struct StockAdjustment {
    pub delta: i32,
}

/// Gallery image payload.
#[derive(Debug, Deserialize)]
pub struct ImageForm {
    /// Path under the media root.
    pub path: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub sort_order: i32,
}

impl ProductForm {
    fn validate(&self) -> Result<NewProduct> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("name is required".to_owned()));
        }
        if self.price.is_sign_negative() {
            return Err(AppError::BadRequest("price cannot be negative".to_owned()));
        }
        if self.stock_quantity < 0 {
            return Err(AppError::BadRequest(
                "stock cannot be negative".to_owned(),
            ));
        }

        let currency = CurrencyCode::default();
        Ok(NewProduct {
            name: self.name.clone(),
            slug: self.slug.clone(),
            description: self.description.clone(),
            short_description: self.short_description.clone(),
            environmental_notes: self.environmental_notes.clone(),
            product_type: self.product_type,
            category_id: self.category_id,
            price: Money::new(self.price, currency),
            compare_at_price: self.compare_at_price.map(|p| Money::new(p, currency)),
            sku: self.sku.clone(),
            stock_quantity: self.stock_quantity,
            low_stock_threshold: self.low_stock_threshold,
            status: self.status,
            is_featured: self.is_featured,
            main_image: self.main_image.clone(),
        })
    }
}

/// `GET /admin/products` - every product, any status.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool()).list_all().await?;
    Ok(Json(products))
}

/// `POST /admin/products` - create a product.
#[instrument(skip(state, _admin, form))]
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(form): Json<ProductForm>,
) -> Result<Response> {
    let new = form.validate()?;
    let product = ProductRepository::new(state.pool()).create(&new).await?;
    state.invalidate_product_cache();

    tracing::info!(product_id = %product.id, slug = %product.slug, "product created");
    Ok((StatusCode::CREATED, Json(product)).into_response())
}

/// `PUT /admin/products/{id}` - replace a product's fields.
#[instrument(skip(state, _admin, form))]
pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<ProductId>,
    Json(form): Json<ProductForm>,
) -> Result<Json<Product>> {
    let changes = form.validate()?;
    let product = ProductRepository::new(state.pool())
        .update(id, &changes)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => {
                AppError::NotFound("product not found".to_owned())
            }
            other => other.into(),
        })?;
    state.invalidate_product_cache();

    Ok(Json(product))
}

/// `DELETE /admin/products/{id}` - delete a product.
#[instrument(skip(state, _admin))]
pub async fn remove(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    if !ProductRepository::new(state.pool()).delete(id).await? {
        return Err(AppError::NotFound("product not found".to_owned()));
    }
    state.invalidate_product_cache();

    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/products/{id}/images` - attach a gallery image.
#[instrument(skip(state, _admin, form))]
pub async fn add_image(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<ProductId>,
    Json(form): Json<ImageForm>,
) -> Result<Response> {
    if form.path.trim().is_empty() {
        return Err(AppError::BadRequest("image path is required".to_owned()));
    }

    let products = ProductRepository::new(state.pool());
    if products.get_by_id(id).await?.is_none() {
        return Err(AppError::NotFound("product not found".to_owned()));
    }

    let image = products
        .add_image(id, &form.path, &form.alt_text, form.is_primary, form.sort_order)
        .await?;

    Ok((StatusCode::CREATED, Json(image)).into_response())
}

/// `POST /admin/products/{id}/stock` - adjust stock by a delta.
#[instrument(skip(state, _admin, body))]
pub async fn adjust_stock(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<StockAdjustment>,
) -> Result<Json<serde_json::Value>> {
    let quantity = ProductRepository::new(state.pool())
        .adjust_stock(id, body.delta)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => {
                AppError::NotFound("product not found".to_owned())
            }
            crate::db::RepositoryError::Conflict(msg) => AppError::BadRequest(msg),
            other => other.into(),
        })?;
    state.invalidate_product_cache();

    Ok(Json(json!({ "stock_quantity": quantity })))
}
