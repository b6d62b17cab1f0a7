//! API token repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bluewave_core::{ApiTokenId, TokenScopes, UserId};

use super::{RepositoryError, map_unique_violation};
use crate::models::token::ApiToken;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ApiTokenRow {
    id: i32,
    user_id: i32,
    name: String,
    token: String,
    token_length: i32,
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
    last_used: Option<DateTime<Utc>>,
    can_read_products: bool,
    can_manage_cart: bool,
    can_place_orders: bool,
    can_manage_wishlist: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ApiTokenRow> for ApiToken {
    type Error = RepositoryError;

    fn try_from(row: ApiTokenRow) -> Result<Self, Self::Error> {
        let token_length = u32::try_from(row.token_length)
            .map_err(|_| RepositoryError::DataCorruption("negative token length".to_owned()))?;

        Ok(Self {
            id: ApiTokenId::new(row.id),
            user_id: UserId::new(row.user_id),
            name: row.name,
            token: row.token,
            token_length,
            is_active: row.is_active,
            expires_at: row.expires_at,
            last_used: row.last_used,
            scopes: TokenScopes {
                read_products: row.can_read_products,
                manage_cart: row.can_manage_cart,
                place_orders: row.can_place_orders,
                manage_wishlist: row.can_manage_wishlist,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const TOKEN_COLUMNS: &str = "id, user_id, name, token, token_length, is_active, expires_at, \
     last_used, can_read_products, can_manage_cart, can_place_orders, \
     can_manage_wishlist, created_at, updated_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for API token database operations.
pub struct ApiTokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ApiTokenRepository<'a> {
    /// Create a new API token repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reserve a token row and return its ID.
    ///
    /// The JWT embeds the row ID, so the row is written first with an empty
    /// token and completed via [`Self::store_jwt`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create_pending(
        &self,
        user_id: UserId,
        name: &str,
        token_length: u32,
        expires_at: Option<DateTime<Utc>>,
        scopes: TokenScopes,
    ) -> Result<ApiTokenId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO api_tokens
                 (user_id, name, token, token_length, expires_at,
                  can_read_products, can_manage_cart, can_place_orders, can_manage_wishlist)
             VALUES ($1, $2, '', $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(user_id.as_i32())
        .bind(name)
        .bind(i32::try_from(token_length).unwrap_or(i32::MAX))
        .bind(expires_at)
        .bind(scopes.read_products)
        .bind(scopes.manage_cart)
        .bind(scopes.place_orders)
        .bind(scopes.manage_wishlist)
        .fetch_one(self.pool)
        .await?;

        Ok(ApiTokenId::new(id))
    }

    /// Complete a pending row with its signed JWT and return the full token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row doesn't exist.
    /// Returns `RepositoryError::Conflict` if the JWT is somehow duplicated.
    pub async fn store_jwt(
        &self,
        id: ApiTokenId,
        jwt: &str,
    ) -> Result<ApiToken, RepositoryError> {
        let row = sqlx::query_as::<_, ApiTokenRow>(&format!(
            "UPDATE api_tokens SET token = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(jwt)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "token already exists"))?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Get a token by ID if it is still active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active(&self, id: ApiTokenId) -> Result<Option<ApiToken>, RepositoryError> {
        let row = sqlx::query_as::<_, ApiTokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE id = $1 AND is_active = TRUE"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List a user's tokens, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ApiToken>, RepositoryError> {
        let rows = sqlx::query_as::<_, ApiTokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// List every token (admin view), newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<ApiToken>, RepositoryError> {
        let rows = sqlx::query_as::<_, ApiTokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM api_tokens ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Stamp the token's last-used time.
    ///
    /// Best effort: failures are surfaced but callers may ignore them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn touch_last_used(&self, id: ApiTokenId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE api_tokens SET last_used = NOW() WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Deactivate a token.
    ///
    /// # Returns
    ///
    /// Returns `true` if the token existed and was active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revoke(&self, id: ApiTokenId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE api_tokens SET is_active = FALSE, updated_at = NOW()
             WHERE id = $1 AND is_active = TRUE",
        )
        .bind(id.as_i32())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
