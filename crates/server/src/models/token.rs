//! API token domain type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bluewave_core::{ApiTokenId, TokenScopes, UserId};

/// An issued API token.
///
/// The `token` field holds the signed JWT handed to the client at issuance;
/// it is never shown again afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiToken {
    pub id: ApiTokenId,
    pub user_id: UserId,
    /// Descriptive name chosen at issuance.
    pub name: String,
    /// The signed JWT.
    pub token: String,
    /// Length of the random component embedded in the JWT (16..=128).
    pub token_length: u32,
    pub is_active: bool,
    /// Absent means the token never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
    pub scopes: TokenScopes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiToken {
    /// Whether the token has passed its expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }

    /// Whether the token is usable: active and not expired.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(is_active: bool, expires_at: Option<DateTime<Utc>>) -> ApiToken {
        ApiToken {
            id: ApiTokenId::new(1),
            user_id: UserId::new(1),
            name: "ci".to_owned(),
            token: "jwt".to_owned(),
            token_length: 32,
            is_active,
            expires_at,
            last_used: None,
            scopes: TokenScopes::all(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_expiry_never_expires() {
        let now = Utc::now();
        assert!(!token(true, None).is_expired(now));
        assert!(token(true, None).is_valid(now));
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now();
        let t = token(true, Some(now - Duration::hours(1)));
        assert!(t.is_expired(now));
        assert!(!t.is_valid(now));
    }

    #[test]
    fn test_inactive_token_invalid_even_when_unexpired() {
        let now = Utc::now();
        let t = token(false, Some(now + Duration::hours(1)));
        assert!(!t.is_expired(now));
        assert!(!t.is_valid(now));
    }
}
