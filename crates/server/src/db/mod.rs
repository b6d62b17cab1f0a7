//! Database operations for the BlueWave `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` / `user_passwords` / `user_profiles` - Accounts, Argon2 hashes,
//!   MFA state
//! - `categories` / `products` / `product_images` - Catalog
//! - `cart_items` / `wishlist_items` - Per-user collections
//! - `orders` / `order_items` - Purchase history
//! - `api_tokens` - Issued API tokens
//! - `tower_sessions.session` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p bluewave-cli -- migrate
//! ```
//!
//! Queries use the runtime `query_as` API with `FromRow` row types converted
//! into domain models via `TryFrom`, so the workspace builds without a live
//! database.

pub mod cart;
pub mod orders;
pub mod products;
pub mod tokens;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use cart::CartRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use tokens::ApiTokenRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email, non-negative stock).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Create a pool without establishing a connection up front.
///
/// Used by tests that exercise routes which never touch the database.
#[must_use]
pub fn create_lazy_pool(database_url: &secrecy::SecretString) -> PgPool {
    PgPoolOptions::new()
        .max_connections(2)
        .connect_lazy(database_url.expose_secret())
        .unwrap_or_else(|_| {
            // connect_lazy only fails on URL parse errors
            PgPoolOptions::new()
                .connect_lazy("postgres://localhost/bluewave")
                .expect("static connection string is valid")
        })
}

/// Map a sqlx error to `Conflict` when it is a unique violation.
pub(crate) fn map_unique_violation(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}
