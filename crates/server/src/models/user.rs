//! User and profile domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bluewave_core::{Email, UserId, UserRole};

/// A BlueWave account (domain type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// User's email address.
    pub email: Email,
    /// Account role.
    pub role: UserRole,
    /// Contact phone number.
    pub phone: Option<String>,
    /// Company name for business customers.
    pub company: Option<String>,
    /// Whether the account may log in.
    pub is_active: bool,
    /// When the account was created.
    pub date_joined: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this account has admin privileges.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Multi-factor authentication state for an account.
///
/// The secret is absent until enrollment starts; `mfa_enabled` flips only
/// after the user has verified a first code against it. Backup codes are
/// single-use and removed as they are consumed.
#[derive(Debug, Clone)]
pub struct UserProfile {
    /// Owning user.
    pub user_id: UserId,
    /// Whether MFA verification is required at login.
    pub mfa_enabled: bool,
    /// Base32-encoded TOTP secret, set once enrollment begins.
    pub mfa_secret: Option<String>,
    /// Remaining emergency backup codes.
    pub backup_codes: Vec<String>,
}

impl UserProfile {
    /// A fresh profile with MFA not yet configured.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            mfa_enabled: false,
            mfa_secret: None,
            backup_codes: Vec::new(),
        }
    }
}
