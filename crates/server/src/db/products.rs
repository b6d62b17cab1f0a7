//! Product and category repository.
//!
//! Prices are stored as `NUMERIC(10,2)` in the store currency; the rows are
//! lifted into [`Money`] during conversion.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bluewave_core::{
    CategoryId, CategoryType, CurrencyCode, Money, ProductId, ProductImageId, ProductStatus,
    ProductType,
};

use super::{RepositoryError, map_unique_violation};
use crate::models::catalog::{Category, Product, ProductImage, slugify};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: i32,
    name: String,
    slug: String,
    description: String,
    short_description: String,
    environmental_notes: Option<String>,
    product_type: String,
    category_id: Option<i32>,
    price: Decimal,
    compare_at_price: Option<Decimal>,
    sku: Option<String>,
    stock_quantity: i32,
    low_stock_threshold: i32,
    status: String,
    is_featured: bool,
    main_image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let product_type: ProductType = row.product_type.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid product type in database: {e}"))
        })?;
        let status: ProductStatus = row.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid product status in database: {e}"))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            short_description: row.short_description,
            environmental_notes: row.environmental_notes,
            product_type,
            category_id: row.category_id.map(CategoryId::new),
            price: Money::new(row.price, CurrencyCode::default()),
            compare_at_price: row
                .compare_at_price
                .map(|amount| Money::new(amount, CurrencyCode::default())),
            sku: row.sku,
            stock_quantity: row.stock_quantity,
            low_stock_threshold: row.low_stock_threshold,
            status,
            is_featured: row.is_featured,
            main_image: row.main_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductImageRow {
    id: i32,
    product_id: i32,
    path: String,
    alt_text: String,
    is_primary: bool,
    sort_order: i32,
}

impl From<ProductImageRow> for ProductImage {
    fn from(row: ProductImageRow) -> Self {
        Self {
            id: ProductImageId::new(row.id),
            product_id: ProductId::new(row.product_id),
            path: row.path,
            alt_text: row.alt_text,
            is_primary: row.is_primary,
            sort_order: row.sort_order,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
    slug: String,
    description: String,
    category_type: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = RepositoryError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        let category_type: CategoryType = row.category_type.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid category type in database: {e}"))
        })?;

        Ok(Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            category_type,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

pub(crate) const PRODUCT_COLUMNS: &str = "id, name, slug, description, short_description, \
     environmental_notes, product_type, category_id, price, compare_at_price, sku, \
     stock_quantity, low_stock_threshold, status, is_featured, main_image, \
     created_at, updated_at";

// =============================================================================
// Write Parameters
// =============================================================================

/// Fields for creating or fully replacing a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    /// Explicit slug; generated from the name when empty.
    pub slug: Option<String>,
    pub description: String,
    pub short_description: String,
    pub environmental_notes: Option<String>,
    pub product_type: ProductType,
    pub category_id: Option<CategoryId>,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub sku: Option<String>,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
    pub status: ProductStatus,
    pub is_featured: bool,
    pub main_image: Option<String>,
}

impl NewProduct {
    fn slug(&self) -> String {
        self.slug
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(&self.name))
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List active products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE status = 'active'
             ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// List all products regardless of status (admin view).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get an active product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1 AND status = 'active'"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a product by ID regardless of status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an active product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_id(
        &self,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND status = 'active'"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug or SKU already exists.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products
                 (name, slug, description, short_description, environmental_notes,
                  product_type, category_id, price, compare_at_price, sku,
                  stock_quantity, low_stock_threshold, status, is_featured, main_image)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(new.slug())
        .bind(&new.description)
        .bind(&new.short_description)
        .bind(&new.environmental_notes)
        .bind(new.product_type.to_string())
        .bind(new.category_id.map(|c| c.as_i32()))
        .bind(new.price.amount)
        .bind(new.compare_at_price.map(|m| m.amount))
        .bind(&new.sku)
        .bind(new.stock_quantity)
        .bind(new.low_stock_threshold)
        .bind(new.status.to_string())
        .bind(new.is_featured)
        .bind(&new.main_image)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "slug or sku already exists"))?;

        row.try_into()
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` on slug/SKU collisions.
    pub async fn update(
        &self,
        id: ProductId,
        changes: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET
                 name = $2, slug = $3, description = $4, short_description = $5,
                 environmental_notes = $6, product_type = $7, category_id = $8,
                 price = $9, compare_at_price = $10, sku = $11, stock_quantity = $12,
                 low_stock_threshold = $13, status = $14, is_featured = $15,
                 main_image = $16, updated_at = NOW()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(&changes.name)
        .bind(changes.slug())
        .bind(&changes.description)
        .bind(&changes.short_description)
        .bind(&changes.environmental_notes)
        .bind(changes.product_type.to_string())
        .bind(changes.category_id.map(|c| c.as_i32()))
        .bind(changes.price.amount)
        .bind(changes.compare_at_price.map(|m| m.amount))
        .bind(&changes.sku)
        .bind(changes.stock_quantity)
        .bind(changes.low_stock_threshold)
        .bind(changes.status.to_string())
        .bind(changes.is_featured)
        .bind(&changes.main_image)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "slug or sku already exists"))?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Delete a product.
    ///
    /// # Returns
    ///
    /// Returns `true` if the product was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Adjust stock by a delta (negative to decrement).
    ///
    /// The `stock_quantity >= 0` CHECK turns oversells into `Conflict`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the adjustment would go negative.
    pub async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<i32, RepositoryError> {
        let quantity: Option<i32> = sqlx::query_scalar(
            "UPDATE products
             SET stock_quantity = stock_quantity + $2, updated_at = NOW()
             WHERE id = $1
             RETURNING stock_quantity",
        )
        .bind(id.as_i32())
        .bind(delta)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_check_violation()
            {
                return RepositoryError::Conflict("stock cannot go negative".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        quantity.ok_or(RepositoryError::NotFound)
    }

    /// Gallery images for a product, primary first then by sort order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images(&self, id: ProductId) -> Result<Vec<ProductImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductImageRow>(
            "SELECT id, product_id, path, alt_text, is_primary, sort_order
             FROM product_images WHERE product_id = $1
             ORDER BY is_primary DESC, sort_order",
        )
        .bind(id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Attach a gallery image to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_image(
        &self,
        id: ProductId,
        path: &str,
        alt_text: &str,
        is_primary: bool,
        sort_order: i32,
    ) -> Result<ProductImage, RepositoryError> {
        let row = sqlx::query_as::<_, ProductImageRow>(
            "INSERT INTO product_images (product_id, path, alt_text, is_primary, sort_order)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, product_id, path, alt_text, is_primary, sort_order",
        )
        .bind(id.as_i32())
        .bind(path)
        .bind(alt_text)
        .bind(is_primary)
        .bind(sort_order)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// List all categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description, category_type, is_active, created_at
             FROM categories ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or slug already exists.
    pub async fn create_category(
        &self,
        name: &str,
        description: &str,
        category_type: CategoryType,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (name, slug, description, category_type)
             VALUES ($1, $2, $3, $4)
             RETURNING id, name, slug, description, category_type, is_active, created_at",
        )
        .bind(name)
        .bind(slugify(name))
        .bind(description)
        .bind(category_type.to_string())
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "category already exists"))?;

        row.try_into()
    }
}
