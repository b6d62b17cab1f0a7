//! User repository for database operations.
//!
//! Provides database access for accounts, password hashes, and MFA profiles.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bluewave_core::{Email, UserId, UserRole};

use super::{RepositoryError, map_unique_violation};
use crate::models::user::{User, UserProfile};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    role: String,
    phone: Option<String>,
    company: Option<String>,
    is_active: bool,
    date_joined: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role: UserRole = row.role.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username: row.username,
            email,
            role,
            phone: row.phone,
            company: row.company,
            is_active: row.is_active,
            date_joined: row.date_joined,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for MFA profile queries.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: i32,
    mfa_enabled: bool,
    mfa_secret: Option<String>,
    mfa_backup_codes: String,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let backup_codes: Vec<String> = if row.mfa_backup_codes.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&row.mfa_backup_codes).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid backup codes in database: {e}"))
            })?
        };

        Ok(Self {
            user_id: UserId::new(row.user_id),
            mfa_enabled: row.mfa_enabled,
            mfa_secret: row.mfa_secret,
            backup_codes,
        })
    }
}

const USER_COLUMNS: &str =
    "id, username, email, role, phone, company, is_active, date_joined, updated_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if stored data is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user by their login name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a new user with a password hash.
    ///
    /// The user and password rows are written in one transaction, together
    /// with an empty MFA profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username or email is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(
        &self,
        username: &str,
        email: &Email,
        role: UserRole,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, email, role)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email.as_str())
        .bind(role.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "username or email already exists"))?;

        sqlx::query("INSERT INTO user_passwords (user_id, password_hash) VALUES ($1, $2)")
            .bind(row.id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1)")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        row.try_into()
    }

    /// Create a user without a password (federated login).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username or email is taken.
    pub async fn create_federated(
        &self,
        username: &str,
        email: &Email,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, email, role)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email.as_str())
        .bind(UserRole::Customer.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "username or email already exists"))?;

        sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1)")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        row.try_into()
    }

    /// Get a user's password hash by username.
    ///
    /// Returns `None` if the user doesn't exist or has no password set
    /// (federated accounts).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct UserWithHash {
            #[sqlx(flatten)]
            user: UserRow,
            password_hash: Option<String>,
        }

        let row = sqlx::query_as::<_, UserWithHash>(
            "SELECT u.id, u.username, u.email, u.role, u.phone, u.company,
                    u.is_active, u.date_joined, u.updated_at,
                    p.password_hash
             FROM users u
             LEFT JOIN user_passwords p ON u.id = p.user_id
             WHERE u.username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };
        let Some(password_hash) = r.password_hash else {
            return Ok(None);
        };

        Ok(Some((r.user.try_into()?, password_hash)))
    }

    /// Get a user's MFA profile, creating an empty one if missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create_profile(
        &self,
        user_id: UserId,
    ) -> Result<UserProfile, RepositoryError> {
        sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(user_id.as_i32())
            .execute(self.pool)
            .await?;

        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT user_id, mfa_enabled, mfa_secret, mfa_backup_codes
             FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id.as_i32())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Store a freshly generated MFA secret (enrollment in progress).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile doesn't exist.
    pub async fn set_mfa_secret(
        &self,
        user_id: UserId,
        secret: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE user_profiles SET mfa_secret = $1 WHERE user_id = $2")
            .bind(secret)
            .bind(user_id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Mark MFA as enabled for the account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile doesn't exist.
    pub async fn enable_mfa(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE user_profiles SET mfa_enabled = TRUE WHERE user_id = $1")
            .bind(user_id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Disable MFA and wipe the secret and backup codes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile doesn't exist.
    pub async fn disable_mfa(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE user_profiles
             SET mfa_enabled = FALSE, mfa_secret = NULL, mfa_backup_codes = ''
             WHERE user_id = $1",
        )
        .bind(user_id.as_i32())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Replace the stored backup codes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile doesn't exist.
    pub async fn set_backup_codes(
        &self,
        user_id: UserId,
        codes: &[String],
    ) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(codes).map_err(|e| {
            RepositoryError::DataCorruption(format!("failed to serialize backup codes: {e}"))
        })?;

        let result =
            sqlx::query("UPDATE user_profiles SET mfa_backup_codes = $1 WHERE user_id = $2")
                .bind(json)
                .bind(user_id.as_i32())
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
