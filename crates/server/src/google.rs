//! Google OAuth 2.0 client for federated login.
//!
//! Implements the authorization-code flow: the browser is redirected to
//! Google's consent page, and the callback code is exchanged server-side for
//! tokens, then the userinfo endpoint provides the verified email.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::GoogleOAuthConfig;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Errors from the Google OAuth client.
#[derive(Debug, Error)]
pub enum GoogleError {
    /// Network-level failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Google rejected the request.
    #[error("google api error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The provider returned an account without a usable email.
    #[error("no verified email on the google account")]
    NoVerifiedEmail,
}

/// Tokens returned by the code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokens {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Subset of the OpenID userinfo response.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    /// Stable subject identifier.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub name: Option<String>,
}

/// Client for Google's OAuth endpoints.
#[derive(Clone)]
pub struct GoogleClient {
    inner: Arc<GoogleClientInner>,
}

struct GoogleClientInner {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_endpoint: String,
    userinfo_endpoint: String,
}

impl GoogleClient {
    /// Create a new Google OAuth client.
    ///
    /// The redirect URI is derived from the public base URL and must match
    /// the console configuration exactly (including the scheme), or Google
    /// responds with `redirect_uri_mismatch`.
    #[must_use]
    pub fn new(config: &GoogleOAuthConfig, base_url: &str) -> Self {
        Self {
            inner: Arc::new(GoogleClientInner {
                client: reqwest::Client::new(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.expose_secret().to_owned(),
                redirect_uri: format!(
                    "{}/auth/google/callback",
                    base_url.trim_end_matches('/')
                ),
                token_endpoint: TOKEN_ENDPOINT.to_owned(),
                userinfo_endpoint: USERINFO_ENDPOINT.to_owned(),
            }),
        }
    }

    /// Build the consent-page URL to redirect the browser to.
    #[must_use]
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{AUTH_ENDPOINT}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(&self.inner.redirect_uri),
            urlencoding::encode("openid email profile"),
            urlencoding::encode(state),
        )
    }

    /// The redirect URI this client was configured with.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.inner.redirect_uri
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError` on network or API failures.
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleTokens, GoogleError> {
        let response = self
            .inner
            .client
            .post(&self.inner.token_endpoint)
            .form(&[
                ("code", code),
                ("client_id", &self.inner.client_id),
                ("client_secret", &self.inner.client_secret),
                ("redirect_uri", &self.inner.redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        Self::read_response(response).await
    }

    /// Fetch the userinfo document for an access token.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::NoVerifiedEmail` if the account lacks a
    /// verified email; the caller must not link such accounts.
    pub async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleUserInfo, GoogleError> {
        let response = self
            .inner
            .client
            .get(&self.inner.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await?;

        let info: GoogleUserInfo = Self::read_response(response).await?;

        if !info.email_verified || info.email.is_none() {
            return Err(GoogleError::NoVerifiedEmail);
        }

        Ok(info)
    }

    async fn read_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GoogleError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(300).collect::<String>(),
                "Google API returned non-success status"
            );
            return Err(GoogleError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| GoogleError::Api {
            status: status.as_u16(),
            message: format!("unparseable response: {e}"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn client() -> GoogleClient {
        GoogleClient::new(
            &GoogleOAuthConfig {
                client_id: "abc123.apps.googleusercontent.com".to_owned(),
                client_secret: SecretString::from("GOCSPX-testvalue"),
            },
            "https://shop.example/",
        )
    }

    #[test]
    fn test_redirect_uri_trims_trailing_slash() {
        assert_eq!(
            client().redirect_uri(),
            "https://shop.example/auth/google/callback"
        );
    }

    #[test]
    fn test_authorization_url() {
        let url = client().authorization_url("state-xyz");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=abc123.apps.googleusercontent.com"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fshop.example%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("state=state-xyz"));
        assert!(url.contains("response_type=code"));
    }

    #[test]
    fn test_userinfo_deserialization() {
        let json = r#"{
            "sub": "10769150350006150715113082367",
            "email": "jordan@example.com",
            "email_verified": true,
            "name": "Jordan"
        }"#;
        let info: GoogleUserInfo = serde_json::from_str(json).unwrap();
        assert!(info.email_verified);
        assert_eq!(info.email.as_deref(), Some("jordan@example.com"));
    }
}
