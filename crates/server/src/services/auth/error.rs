//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bluewave_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Account exists but may not log in.
    #[error("account disabled")]
    AccountDisabled,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// MFA operation requires MFA to be enabled first.
    #[error("mfa not enabled")]
    MfaNotEnabled,

    /// Enrollment attempted while MFA is already enabled.
    #[error("mfa already enabled")]
    MfaAlreadyEnabled,

    /// TOTP or backup code did not verify.
    #[error("invalid mfa code")]
    InvalidMfaCode,

    /// Session state missing or invalid.
    #[error("invalid session state")]
    InvalidSessionState,

    /// TOTP secret or clock failure.
    #[error("totp error: {0}")]
    Totp(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
