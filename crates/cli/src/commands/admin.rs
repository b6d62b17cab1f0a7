//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! BLUEWAVE_ADMIN_PASSWORD='...' bw-cli admin create -u admin -e admin@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `BLUEWAVE_ADMIN_PASSWORD` - Initial password (never passed on argv)

use secrecy::SecretString;
use thiserror::Error;

use bluewave_server::db;
use bluewave_server::services::auth::AuthService;

use bluewave_core::{Email, UserRole};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Account creation failure.
    #[error("Could not create admin: {0}")]
    Create(String),
}

/// Create a new admin user.
///
/// The password is read from `BLUEWAVE_ADMIN_PASSWORD` and hashed with the
/// same Argon2id parameters the server uses. Admin accounts are not forced
/// through MFA enrollment, but enabling it is required before any API token
/// can be issued to them.
///
/// # Arguments
///
/// * `username` - Admin's login name
/// * `email` - Admin's email address
///
/// # Returns
///
/// The ID of the created admin user.
pub async fn create_user(username: &str, email: &str) -> Result<i32, AdminError> {
    dotenvy::dotenv().ok();

    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(e.to_string()))?;

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| AdminError::MissingEnvVar("DATABASE_URL"))?;

    let password = std::env::var("BLUEWAVE_ADMIN_PASSWORD")
        .map_err(|_| AdminError::MissingEnvVar("BLUEWAVE_ADMIN_PASSWORD"))?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url)
        .await
        .map_err(AdminError::Database)?;

    tracing::info!("Creating admin user: {} ({})", username, email);

    // Reuse the server's hashing via the registration path, then promote.
    let auth = AuthService::new(&pool);
    let user = auth
        .register(username, email.as_str(), &password)
        .await
        .map_err(|e| AdminError::Create(e.to_string()))?;

    promote_to_admin(&pool, user.id.as_i32())
        .await
        .map_err(AdminError::Database)?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Username: {}, Email: {}",
        user.id,
        username,
        email
    );
    tracing::warn!(
        "Enable MFA on first login; API tokens cannot be issued to accounts without it."
    );

    Ok(user.id.as_i32())
}

/// Flip a freshly created account to the admin role.
async fn promote_to_admin(pool: &sqlx::PgPool, user_id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(UserRole::Admin.to_string())
        .execute(pool)
        .await?;
    Ok(())
}
