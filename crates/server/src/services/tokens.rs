//! JWT issuance and validation.
//!
//! Two token families share the `SECRET_KEY` HS256 signing key:
//!
//! - **Session tokens**: minted at login, 24-hour expiry, identify the user.
//! - **API tokens**: long-lived bearer credentials backed by an `api_tokens`
//!   row. The JWT carries the row ID; validation always consults the row, so
//!   revocation takes effect immediately.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use bluewave_core::{ApiTokenId, TokenScopes, UserId};

use crate::db::tokens::ApiTokenRepository;
use crate::db::users::UserRepository;
use crate::db::RepositoryError;
use crate::models::token::ApiToken;
use crate::models::user::User;

/// Session token lifetime.
const SESSION_TOKEN_HOURS: i64 = 24;

/// Bounds for the random component embedded in API tokens.
const MIN_TOKEN_LENGTH: u32 = 16;
const MAX_TOKEN_LENGTH: u32 = 128;

/// Errors that can occur during token operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature, structure, or referenced row is invalid.
    #[error("invalid token")]
    Invalid,

    /// Token exists but has passed its expiry.
    #[error("token expired")]
    Expired,

    /// Token exists but has been deactivated.
    #[error("token revoked")]
    Revoked,

    /// The owning account has not enabled MFA.
    #[error("mfa required before token issuance")]
    MfaRequired,

    /// Requested random-token length is out of range.
    #[error("invalid token length: {0}")]
    InvalidLength(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Signing failure.
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by an API token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTokenClaims {
    pub api_key_id: i32,
    pub user_id: i32,
    pub user_email: String,
    pub token_name: String,
    /// Random filler of the configured length; gives the JWT issuer-chosen
    /// entropy independent of the claims.
    pub random_token: String,
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Token service.
pub struct TokenService<'a> {
    tokens: ApiTokenRepository<'a>,
    users: UserRepository<'a>,
    secret_key: &'a SecretString,
}

impl<'a> TokenService<'a> {
    /// Create a new token service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, secret_key: &'a SecretString) -> Self {
        Self {
            tokens: ApiTokenRepository::new(pool),
            users: UserRepository::new(pool),
            secret_key,
        }
    }

    // =========================================================================
    // Session tokens
    // =========================================================================

    /// Mint a 24-hour session token for a logged-in user.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Jwt` if signing fails.
    pub fn issue_session_token(&self, user: &User) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = SessionClaims {
            user_id: user.id.as_i32(),
            username: user.username.clone(),
            email: user.email.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(SESSION_TOKEN_HOURS)).timestamp(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret_key.expose_secret().as_bytes()),
        )?)
    }

    /// Decode and verify a session token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` for stale tokens and
    /// `TokenError::Invalid` otherwise.
    pub fn verify_session_token(&self, token: &str) -> Result<SessionClaims, TokenError> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret_key.expose_secret().as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })
    }

    // =========================================================================
    // API tokens
    // =========================================================================

    /// Issue an API token for a user.
    ///
    /// The owning account must have MFA enabled. The returned token carries
    /// the signed JWT; it is not retrievable afterwards.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::MfaRequired` if the owner has no MFA.
    /// Returns `TokenError::InvalidLength` for lengths outside 16..=128.
    pub async fn issue_api_token(
        &self,
        user: &User,
        name: &str,
        token_length: u32,
        expires_at: Option<DateTime<Utc>>,
        scopes: TokenScopes,
    ) -> Result<ApiToken, TokenError> {
        if !(MIN_TOKEN_LENGTH..=MAX_TOKEN_LENGTH).contains(&token_length) {
            return Err(TokenError::InvalidLength(format!(
                "token length must be between {MIN_TOKEN_LENGTH} and {MAX_TOKEN_LENGTH}"
            )));
        }

        let profile = self.users.get_or_create_profile(user.id).await?;
        if !profile.mfa_enabled {
            return Err(TokenError::MfaRequired);
        }

        // The JWT embeds the row ID, so reserve the row first.
        let id = self
            .tokens
            .create_pending(user.id, name, token_length, expires_at, scopes)
            .await?;

        let claims = ApiTokenClaims {
            api_key_id: id.as_i32(),
            user_id: user.id.as_i32(),
            user_email: user.email.to_string(),
            token_name: name.to_owned(),
            random_token: random_alphanumeric(token_length as usize),
            iat: Utc::now().timestamp(),
            exp: expires_at.map(|t| t.timestamp()),
        };

        let jwt = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret_key.expose_secret().as_bytes()),
        )?;

        Ok(self.tokens.store_jwt(id, &jwt).await?)
    }

    /// Validate a bearer JWT and return the owning user and token row.
    ///
    /// Expiry is authoritative on the row, not the claim, and `last_used` is
    /// stamped on success.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` for bad signatures or unknown rows,
    /// `TokenError::Revoked`/`TokenError::Expired` for dead tokens.
    pub async fn validate_api_token(&self, token: &str) -> Result<(User, ApiToken), TokenError> {
        // API tokens may carry no exp claim; the row decides expiry below.
        let mut validation = Validation::default();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = decode::<ApiTokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret_key.expose_secret().as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|_| TokenError::Invalid)?;

        let api_token = self
            .tokens
            .get_active(ApiTokenId::new(claims.api_key_id))
            .await?
            .ok_or(TokenError::Revoked)?;

        if api_token.is_expired(Utc::now()) {
            return Err(TokenError::Expired);
        }

        // The signed claims must agree with the row they point at.
        if api_token.user_id.as_i32() != claims.user_id {
            return Err(TokenError::Invalid);
        }

        let user = self
            .users
            .get_by_id(UserId::new(claims.user_id))
            .await?
            .ok_or(TokenError::Invalid)?;

        if !user.is_active {
            return Err(TokenError::Revoked);
        }

        if let Err(e) = self.tokens.touch_last_used(api_token.id).await {
            tracing::warn!("failed to stamp token last_used: {e}");
        }

        Ok((user, api_token))
    }
}

/// Random alphanumeric string of the given length.
fn random_alphanumeric(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            char::from(CHARSET.get(idx).copied().unwrap_or(b'0'))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bluewave_core::{Email, UserRole};

    fn secret() -> SecretString {
        SecretString::from("k9#mTq2$vX8&wY4!bN6@cL1%dZ5^eH3*")
    }

    fn test_user() -> User {
        User {
            id: UserId::new(42),
            username: "jordan".to_owned(),
            email: Email::parse("jordan@example.com").unwrap(),
            role: UserRole::Customer,
            phone: None,
            company: None,
            is_active: true,
            date_joined: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_session_token_roundtrip() {
        let secret = secret();
        let key = EncodingKey::from_secret(secret.expose_secret().as_bytes());
        let now = Utc::now();
        let claims = SessionClaims {
            user_id: 42,
            username: "jordan".to_owned(),
            email: "jordan@example.com".to_owned(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(24)).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let decoded = decode::<SessionClaims>(
            &token,
            &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.user_id, 42);
        assert_eq!(decoded.claims.username, "jordan");
    }

    #[test]
    fn test_session_token_expired_rejected() {
        let secret = secret();
        let key = EncodingKey::from_secret(secret.expose_secret().as_bytes());
        let now = Utc::now();
        let claims = SessionClaims {
            user_id: 42,
            username: "jordan".to_owned(),
            email: "jordan@example.com".to_owned(),
            iat: (now - Duration::hours(48)).timestamp(),
            exp: (now - Duration::hours(24)).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let result = decode::<SessionClaims>(
            &token,
            &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            &Validation::default(),
        );
        assert!(matches!(
            result.unwrap_err().kind(),
            jsonwebtoken::errors::ErrorKind::ExpiredSignature
        ));
    }

    #[test]
    fn test_session_token_wrong_key_rejected() {
        let key = EncodingKey::from_secret(secret().expose_secret().as_bytes());
        let now = Utc::now();
        let claims = SessionClaims {
            user_id: 1,
            username: "x".to_owned(),
            email: "x@example.com".to_owned(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let result = decode::<SessionClaims>(
            &token,
            &DecodingKey::from_secret(b"a completely different signing key!!"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_api_token_claims_without_exp_decode() {
        let secret = secret();
        let key = EncodingKey::from_secret(secret.expose_secret().as_bytes());
        let claims = ApiTokenClaims {
            api_key_id: 7,
            user_id: 42,
            user_email: "jordan@example.com".to_owned(),
            token_name: "ci".to_owned(),
            random_token: random_alphanumeric(32),
            iat: Utc::now().timestamp(),
            exp: None,
        };
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let mut validation = Validation::default();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let decoded = decode::<ApiTokenClaims>(
            &token,
            &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            &validation,
        )
        .unwrap();
        assert_eq!(decoded.claims.api_key_id, 7);
        assert_eq!(decoded.claims.random_token.len(), 32);
        assert!(decoded.claims.exp.is_none());
    }

    #[test]
    fn test_random_alphanumeric_shape() {
        let s = random_alphanumeric(64);
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));

        // Two draws should differ
        assert_ne!(random_alphanumeric(64), s);
    }

    #[tokio::test]
    async fn test_issue_session_token_produces_verifiable_jwt() {
        // TokenService only needs the pool for DB-backed paths; a lazy pool
        // lets the pure JWT paths run without a database.
        let pool = crate::db::create_lazy_pool(&SecretString::from(
            "postgres://localhost/bluewave_test",
        ));
        let secret = secret();
        let service = TokenService::new(&pool, &secret);

        let token = service.issue_session_token(&test_user()).unwrap();
        let claims = service.verify_session_token(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.email, "jordan@example.com");
    }

    #[tokio::test]
    async fn test_verify_session_token_rejects_garbage() {
        let pool = crate::db::create_lazy_pool(&SecretString::from(
            "postgres://localhost/bluewave_test",
        ));
        let secret = secret();
        let service = TokenService::new(&pool, &secret);

        assert!(matches!(
            service.verify_session_token("not.a.jwt"),
            Err(TokenError::Invalid)
        ));
    }
}
