//! Cart and wishlist repository.
//!
//! Lines are unique per (user, product); adding an existing product
//! increments its quantity. Products are fetched in a second query and
//! joined in memory, so deleted products silently drop off the cart.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bluewave_core::{CartItemId, CurrencyCode, Money, ProductId, UserId, WishlistItemId};

use super::products::{PRODUCT_COLUMNS, ProductRow};
use super::RepositoryError;
use crate::models::cart::{CartItem, WishlistItem};
use crate::models::catalog::Product;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: i32,
    user_id: i32,
    product_id: i32,
    quantity: i32,
    price_when_added: Decimal,
    added_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct WishlistItemRow {
    id: i32,
    user_id: i32,
    product_id: i32,
    note: String,
    added_at: DateTime<Utc>,
}

/// Fetch the referenced products and index them by id.
async fn products_by_id(
    pool: &PgPool,
    ids: &[i32],
) -> Result<HashMap<i32, Product>, RepositoryError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;

    let mut map = HashMap::with_capacity(rows.len());
    for row in rows {
        let product: Product = row.try_into()?;
        map.insert(product.id.as_i32(), product);
    }
    Ok(map)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for cart and wishlist database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Get the user's cart lines, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            "SELECT id, user_id, product_id, quantity, price_when_added, added_at, updated_at
             FROM cart_items WHERE user_id = $1 ORDER BY added_at DESC",
        )
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|r| r.product_id).collect();
        let mut products = products_by_id(self.pool, &ids).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(product) = products.remove(&row.product_id) else {
                continue;
            };
            let quantity = u32::try_from(row.quantity).map_err(|_| {
                RepositoryError::DataCorruption("negative cart quantity".to_owned())
            })?;
            items.push(CartItem {
                id: CartItemId::new(row.id),
                user_id: UserId::new(row.user_id),
                product,
                quantity,
                price_when_added: Money::new(row.price_when_added, CurrencyCode::default()),
                added_at: row.added_at,
                updated_at: row.updated_at,
            });
        }
        Ok(items)
    }

    /// Add a product to the cart, incrementing quantity when already present.
    ///
    /// `price_when_added` is recorded on first insert only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_item(
        &self,
        user_id: UserId,
        product: &Product,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO cart_items (user_id, product_id, quantity, price_when_added)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, product_id)
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity,
                           updated_at = NOW()",
        )
        .bind(user_id.as_i32())
        .bind(product.id.as_i32())
        .bind(i32::try_from(quantity).unwrap_or(i32::MAX))
        .bind(product.price.amount)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line doesn't exist.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3, updated_at = NOW()
             WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id.as_i32())
        .bind(product_id.as_i32())
        .bind(i32::try_from(quantity).unwrap_or(i32::MAX))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove a product from the cart.
    ///
    /// # Returns
    ///
    /// Returns `true` if a line was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id.as_i32())
            .bind(product_id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove all lines from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_i32())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Get the user's wishlist, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn wishlist_items(
        &self,
        user_id: UserId,
    ) -> Result<Vec<WishlistItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, WishlistItemRow>(
            "SELECT id, user_id, product_id, note, added_at
             FROM wishlist_items WHERE user_id = $1 ORDER BY added_at DESC",
        )
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|r| r.product_id).collect();
        let mut products = products_by_id(self.pool, &ids).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(product) = products.remove(&row.product_id) else {
                continue;
            };
            items.push(WishlistItem {
                id: WishlistItemId::new(row.id),
                user_id: UserId::new(row.user_id),
                product,
                note: row.note,
                added_at: row.added_at,
            });
        }
        Ok(items)
    }

    /// Add a product to the wishlist.
    ///
    /// # Returns
    ///
    /// Returns `true` if the item was added, `false` if it was already there.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_wishlist_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        note: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO wishlist_items (user_id, product_id, note)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, product_id) DO NOTHING",
        )
        .bind(user_id.as_i32())
        .bind(product_id.as_i32())
        .bind(note)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a product from the wishlist.
    ///
    /// # Returns
    ///
    /// Returns `true` if an item was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_wishlist_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
                .bind(user_id.as_i32())
                .bind(product_id.as_i32())
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count the user's wishlist entries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn wishlist_count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM wishlist_items WHERE user_id = $1")
                .bind(user_id.as_i32())
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }
}
