//! Authentication service.
//!
//! Provides password authentication and mandatory TOTP-based MFA with
//! emergency backup codes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;
use sqlx::PgPool;
use totp_rs::{Algorithm, Secret, TOTP};

use bluewave_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{User, UserProfile};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Number of emergency backup codes issued at enrollment.
const BACKUP_CODE_COUNT: usize = 8;

/// TOTP issuer shown in authenticator apps.
const TOTP_ISSUER: &str = "BlueWave";

/// Outcome of the password step of login.
#[derive(Debug)]
pub enum LoginStep {
    /// Credentials verified and no further checks required.
    Complete(User),
    /// Credentials verified; a TOTP or backup code must follow.
    MfaRequired(UserId),
    /// Credentials verified, but the account must enroll in MFA before it
    /// can finish logging in.
    MfaSetupRequired(UserId),
}

/// Authentication service.
///
/// Handles registration, the two-step login flow, and MFA lifecycle.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    // =========================================================================
    // Registration and password login
    // =========================================================================

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the username or email is taken.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        if username.trim().is_empty() {
            return Err(AuthError::WeakPassword("username is required".to_owned()));
        }

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create_with_password(
                username,
                &email,
                bluewave_core::UserRole::Customer,
                &password_hash,
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok(user)
    }

    /// Verify username and password and decide the next login step.
    ///
    /// Accounts without MFA are pushed into mandatory enrollment unless they
    /// hold the admin role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    /// Returns `AuthError::AccountDisabled` for inactive accounts.
    pub async fn login_with_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginStep, AuthError> {
        let (user, password_hash) = self
            .users
            .get_password_hash(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let profile = self.users.get_or_create_profile(user.id).await?;

        if profile.mfa_enabled {
            Ok(LoginStep::MfaRequired(user.id))
        } else if user.is_admin() {
            Ok(LoginStep::Complete(user))
        } else {
            Ok(LoginStep::MfaSetupRequired(user.id))
        }
    }

    /// Re-verify a user's password (required before disabling MFA or
    /// regenerating backup codes).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on mismatch.
    pub async fn verify_password_for(&self, user: &User, password: &str) -> Result<(), AuthError> {
        let (_, password_hash) = self
            .users
            .get_password_hash(&user.username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &password_hash)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    // =========================================================================
    // MFA enrollment
    // =========================================================================

    /// Start (or resume) MFA enrollment.
    ///
    /// Generates and stores a secret if the profile has none yet, and returns
    /// the base32 secret together with the `otpauth://` provisioning URI for
    /// the authenticator app.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MfaAlreadyEnabled` if MFA is already on.
    pub async fn start_mfa_enrollment(
        &self,
        user: &User,
    ) -> Result<(String, String), AuthError> {
        let profile = self.users.get_or_create_profile(user.id).await?;
        if profile.mfa_enabled {
            return Err(AuthError::MfaAlreadyEnabled);
        }

        let secret = match profile.mfa_secret {
            Some(secret) => secret,
            None => {
                let secret = Secret::generate_secret().to_encoded().to_string();
                self.users.set_mfa_secret(user.id, &secret).await?;
                secret
            }
        };

        let totp = build_totp(&secret, user.email.as_str())?;
        Ok((secret, totp.get_url()))
    }

    /// Verify the first code and turn MFA on.
    ///
    /// Returns the freshly generated backup codes; they are shown exactly
    /// once.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidMfaCode` if the code doesn't verify.
    /// Returns `AuthError::InvalidSessionState` if enrollment never started.
    pub async fn confirm_mfa_enrollment(
        &self,
        user: &User,
        code: &str,
    ) -> Result<Vec<String>, AuthError> {
        let profile = self.users.get_or_create_profile(user.id).await?;
        let secret = profile
            .mfa_secret
            .ok_or(AuthError::InvalidSessionState)?;

        if !verify_totp(&secret, user.email.as_str(), code)? {
            return Err(AuthError::InvalidMfaCode);
        }

        self.users.enable_mfa(user.id).await?;

        let codes = generate_backup_codes();
        self.users.set_backup_codes(user.id, &codes).await?;
        Ok(codes)
    }

    // =========================================================================
    // MFA verification (login step 2)
    // =========================================================================

    /// Verify a TOTP code, falling back to consuming a backup code.
    ///
    /// Returns the user on success together with a flag telling whether a
    /// backup code was burned (callers warn the user to regenerate).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidMfaCode` when neither verifies.
    /// Returns `AuthError::MfaNotEnabled` if MFA is off for this account.
    pub async fn verify_mfa(
        &self,
        user_id: UserId,
        code: &str,
    ) -> Result<(User, bool), AuthError> {
        let user = self.get_user(user_id).await?;
        let profile = self.users.get_or_create_profile(user_id).await?;

        if !profile.mfa_enabled {
            return Err(AuthError::MfaNotEnabled);
        }

        let secret = profile
            .mfa_secret
            .clone()
            .ok_or(AuthError::MfaNotEnabled)?;

        if verify_totp(&secret, user.email.as_str(), code)? {
            return Ok((user, false));
        }

        if self.consume_backup_code(&profile, code).await? {
            return Ok((user, true));
        }

        Err(AuthError::InvalidMfaCode)
    }

    /// Consume a backup code if it matches; single use.
    async fn consume_backup_code(
        &self,
        profile: &UserProfile,
        code: &str,
    ) -> Result<bool, AuthError> {
        let code = code.trim();
        if code.is_empty() || !profile.backup_codes.iter().any(|c| c == code) {
            return Ok(false);
        }

        let remaining: Vec<String> = profile
            .backup_codes
            .iter()
            .filter(|c| c.as_str() != code)
            .cloned()
            .collect();
        self.users
            .set_backup_codes(profile.user_id, &remaining)
            .await?;
        Ok(true)
    }

    // =========================================================================
    // MFA management
    // =========================================================================

    /// Disable MFA after re-verifying the password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the password is wrong.
    pub async fn disable_mfa(&self, user: &User, password: &str) -> Result<(), AuthError> {
        self.verify_password_for(user, password).await?;
        self.users.disable_mfa(user.id).await?;
        Ok(())
    }

    /// Replace the backup codes after re-verifying the password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MfaNotEnabled` if MFA is off.
    /// Returns `AuthError::InvalidCredentials` if the password is wrong.
    pub async fn regenerate_backup_codes(
        &self,
        user: &User,
        password: &str,
    ) -> Result<Vec<String>, AuthError> {
        let profile = self.users.get_or_create_profile(user.id).await?;
        if !profile.mfa_enabled {
            return Err(AuthError::MfaNotEnabled);
        }

        self.verify_password_for(user, password).await?;

        let codes = generate_backup_codes();
        self.users.set_backup_codes(user.id, &codes).await?;
        Ok(codes)
    }

    /// Whether the account has MFA enabled.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn mfa_enabled(&self, user_id: UserId) -> Result<bool, AuthError> {
        Ok(self.users.get_or_create_profile(user_id).await?.mfa_enabled)
    }

    // =========================================================================
    // Federated login
    // =========================================================================

    /// Find or create the account backing a federated (Google) identity.
    ///
    /// Existing accounts are matched by email; new accounts take the email's
    /// local part as username, suffixed until unique.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the provider sent a bad email.
    pub async fn find_or_create_federated(&self, email: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        if let Some(user) = self.users.get_by_email(&email).await? {
            if !user.is_active {
                return Err(AuthError::AccountDisabled);
            }
            return Ok(user);
        }

        let base = email.local_part().to_owned();
        for suffix in 0..10 {
            let username = if suffix == 0 {
                base.clone()
            } else {
                format!("{base}{suffix}")
            };
            match self.users.create_federated(&username, &email).await {
                Ok(user) => return Ok(user),
                Err(RepositoryError::Conflict(_)) => {}
                Err(other) => return Err(AuthError::Repository(other)),
            }
        }

        Err(AuthError::UserAlreadyExists)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Build the TOTP generator for a stored base32 secret.
///
/// 6 digits, 30-second period, one period of clock skew tolerated either way.
fn build_totp(secret_base32: &str, account: &str) -> Result<TOTP, AuthError> {
    let secret = Secret::Encoded(secret_base32.to_owned())
        .to_bytes()
        .map_err(|e| AuthError::Totp(format!("invalid secret: {e:?}")))?;

    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        secret,
        Some(TOTP_ISSUER.to_owned()),
        account.to_owned(),
    )
    .map_err(|e| AuthError::Totp(e.to_string()))
}

/// Check a TOTP code against the stored secret.
fn verify_totp(secret_base32: &str, account: &str, code: &str) -> Result<bool, AuthError> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(false);
    }
    let totp = build_totp(secret_base32, account)?;
    totp.check_current(code)
        .map_err(|e| AuthError::Totp(e.to_string()))
}

/// Generate emergency backup codes in `NNNN-NNNN` form.
fn generate_backup_codes() -> Vec<String> {
    let mut rng = rand::rng();
    (0..BACKUP_CODE_COUNT)
        .map(|_| {
            format!(
                "{:04}-{:04}",
                rng.random_range(0..10_000),
                rng.random_range(0..10_000)
            )
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_password_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_totp_accepts_current_and_adjacent_codes() {
        let secret = Secret::generate_secret().to_encoded().to_string();
        let totp = build_totp(&secret, "user@example.com").unwrap();

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();

        // Current code passes
        let code = totp.generate(now);
        assert!(totp.check(&code, now));

        // One period of skew either way is tolerated
        let previous = totp.generate(now - 30);
        assert!(totp.check(&previous, now));
        let next = totp.generate(now + 30);
        assert!(totp.check(&next, now));

        // Two periods out is rejected
        let stale = totp.generate(now - 90);
        assert!(!totp.check(&stale, now));
    }

    #[test]
    fn test_totp_url_carries_issuer() {
        let secret = Secret::generate_secret().to_encoded().to_string();
        let totp = build_totp(&secret, "user@example.com").unwrap();
        let url = totp.get_url();
        assert!(url.starts_with("otpauth://totp/"));
        assert!(url.contains("BlueWave"));
    }

    #[test]
    fn test_verify_totp_rejects_empty_code() {
        let secret = Secret::generate_secret().to_encoded().to_string();
        assert!(!verify_totp(&secret, "user@example.com", "  ").unwrap());
    }

    #[test]
    fn test_backup_code_shape() {
        let codes = generate_backup_codes();
        assert_eq!(codes.len(), BACKUP_CODE_COUNT);
        for code in &codes {
            assert_eq!(code.len(), 9);
            let (a, b) = code.split_once('-').unwrap();
            assert!(a.len() == 4 && a.chars().all(|c| c.is_ascii_digit()));
            assert!(b.len() == 4 && b.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
