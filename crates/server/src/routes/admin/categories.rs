//! Admin category handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use bluewave_core::CategoryType;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Category;
use crate::state::AppState;

/// Category create payload.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_type: CategoryType,
}

/// `GET /admin/categories` - all categories.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<Category>>> {
    let categories = ProductRepository::new(state.pool()).list_categories().await?;
    Ok(Json(categories))
}

/// `POST /admin/categories` - create a category.
#[instrument(skip(state, _admin, form))]
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(form): Json<CategoryForm>,
) -> Result<Response> {
    if form.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_owned()));
    }

    let category = ProductRepository::new(state.pool())
        .create_category(&form.name, &form.description, form.category_type)
        .await?;

    Ok((StatusCode::CREATED, Json(category)).into_response())
}
