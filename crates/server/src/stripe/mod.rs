//! Stripe API client.
//!
//! Talks to Stripe's form-encoded REST API with `reqwest`. Only the hosted
//! Checkout surface is used: the card never touches this server.

pub mod types;
pub mod webhook;

use std::sync::Arc;

use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::StripeConfig;

pub use types::{CheckoutSession, CheckoutSessionParams, LineItemParams, StripeEvent};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Errors from the Stripe API client.
#[derive(Debug, Error)]
pub enum StripeError {
    /// Network-level failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe returned an error response.
    #[error("stripe api error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limited; retry after the given number of seconds.
    #[error("rate limited, retry after {0}s")]
    RateLimited(u64),

    /// Response body did not parse.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Webhook signature header missing or malformed.
    #[error("invalid webhook signature header")]
    MalformedSignature,

    /// Webhook signature did not verify.
    #[error("webhook signature mismatch")]
    SignatureMismatch,

    /// Webhook timestamp outside the tolerance window.
    #[error("webhook timestamp outside tolerance")]
    StaleTimestamp,

    /// Cart amounts could not be represented in minor units.
    #[error("amount error: {0}")]
    Amount(#[from] bluewave_core::MoneyError),
}

/// Client for the Stripe REST API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    /// Create a new Stripe client.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self::with_base_url(config, STRIPE_API_BASE)
    }

    /// Create a client against a different endpoint (tests, stripe-mock).
    #[must_use]
    pub fn with_base_url(config: &StripeConfig, base_url: &str) -> Self {
        Self {
            inner: Arc::new(StripeClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_owned(),
                secret_key: config.secret_key.expose_secret().to_owned(),
            }),
        }
    }

    /// Create a hosted Checkout Session.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` on network, rate-limit, or API failures.
    pub async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CheckoutSession, StripeError> {
        let form = params.to_form();
        let url = format!("{}/checkout/sessions", self.inner.base_url);

        let response = self
            .inner
            .client
            .post(&url)
            .basic_auth(&self.inner.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;

        Self::read_response(response).await
    }

    /// Retrieve an existing Checkout Session by ID.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` on network, rate-limit, or API failures.
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let url = format!(
            "{}/checkout/sessions/{}",
            self.inner.base_url,
            urlencoding::encode(session_id)
        );

        let response = self
            .inner
            .client
            .get(&url)
            .basic_auth(&self.inner.secret_key, None::<&str>)
            .send()
            .await?;

        Self::read_response(response).await
    }

    /// Common response handling: rate limits, error envelopes, JSON parse.
    async fn read_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(StripeError::RateLimited(retry_after));
        }

        // Read as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<types::ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            tracing::error!(
                status = %status,
                message = %message,
                "Stripe API returned non-success status"
            );
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "Failed to parse Stripe response"
                );
                Err(StripeError::Parse(e))
            }
        }
    }
}
