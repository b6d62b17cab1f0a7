//! Google OAuth route handlers.
//!
//! Handles the authorization-code flow for federated login:
//! - Login: redirects to Google's consent page with a CSRF state
//! - Callback: validates state, exchanges the code, links the account
//!
//! Federated accounts go through the same MFA gate as password logins.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rand::Rng;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::models::session_keys;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Query parameters from the Google OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
}

/// Generate a cryptographically random URL-safe string.
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            char::from(CHARSET.get(idx).copied().unwrap_or(b'0'))
        })
        .collect()
}

/// Initiate Google OAuth login.
///
/// # Route
///
/// `GET /auth/google/login`
#[instrument(skip(state, session))]
pub async fn google_login(State(state): State<AppState>, session: Session) -> Response {
    let Some(google) = state.google() else {
        tracing::warn!("google login requested but OAuth is not configured");
        return Redirect::to("/auth/login?error=google_disabled").into_response();
    };

    let oauth_state = generate_random_string(32);
    if let Err(e) = session
        .insert(session_keys::GOOGLE_OAUTH_STATE, &oauth_state)
        .await
    {
        tracing::error!("Failed to store OAuth state in session: {e}");
        return Redirect::to("/auth/login?error=session").into_response();
    }

    Redirect::to(&google.authorization_url(&oauth_state)).into_response()
}

/// Handle the Google OAuth callback.
///
/// Validates the state parameter, exchanges the code, fetches the verified
/// email, and routes the account through the usual MFA gate.
///
/// # Route
///
/// `GET /auth/google/callback`
#[instrument(skip(state, session, query))]
pub async fn google_callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(google) = state.google() else {
        return Redirect::to("/auth/login?error=google_disabled").into_response();
    };

    // Consent-screen denials and other provider errors
    if let Some(error) = query.error {
        tracing::warn!("Google OAuth error: {error}");
        return Redirect::to("/auth/login?error=google_denied").into_response();
    }

    let Some(code) = query.code else {
        tracing::warn!("Google OAuth callback missing code");
        return Redirect::to("/auth/login?error=missing_code").into_response();
    };

    // Verify state parameter (CSRF protection)
    let Some(returned_state) = query.state else {
        tracing::warn!("Google OAuth callback missing state");
        return Redirect::to("/auth/login?error=missing_state").into_response();
    };

    let stored_state: Option<String> = session
        .get(session_keys::GOOGLE_OAUTH_STATE)
        .await
        .ok()
        .flatten();

    if stored_state.as_ref() != Some(&returned_state) {
        tracing::warn!("Google OAuth state mismatch");
        return Redirect::to("/auth/login?error=invalid_state").into_response();
    }

    // One-time use
    let _ = session
        .remove::<String>(session_keys::GOOGLE_OAUTH_STATE)
        .await;

    // Exchange code and read the verified identity
    let tokens = match google.exchange_code(&code).await {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::error!("Failed to exchange Google OAuth code: {e}");
            return Redirect::to("/auth/login?error=token_exchange").into_response();
        }
    };

    let info = match google.fetch_userinfo(&tokens.access_token).await {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!("Failed to fetch Google userinfo: {e}");
            return Redirect::to("/auth/login?error=userinfo").into_response();
        }
    };

    let Some(email) = info.email.as_deref() else {
        return Redirect::to("/auth/login?error=userinfo").into_response();
    };

    let auth = AuthService::new(state.pool());
    let user = match auth.find_or_create_federated(email).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Failed to link federated account: {e}");
            return Redirect::to("/auth/login?error=account_link").into_response();
        }
    };

    // Same MFA gate as password login
    let mfa_enabled = match auth.mfa_enabled(user.id).await {
        Ok(enabled) => enabled,
        Err(e) => {
            tracing::error!("Failed to read MFA state: {e}");
            return Redirect::to("/auth/login?error=account_link").into_response();
        }
    };

    if mfa_enabled {
        if let Err(e) = session.insert(session_keys::MFA_USER_ID, user.id).await {
            tracing::error!("Failed to store MFA state in session: {e}");
            return Redirect::to("/auth/login?error=session").into_response();
        }
        return Redirect::to("/auth/mfa/verify").into_response();
    }

    if !user.is_admin() {
        if let Err(e) = session.insert(session_keys::MFA_SETUP_USER_ID, user.id).await {
            tracing::error!("Failed to store MFA setup state in session: {e}");
            return Redirect::to("/auth/login?error=session").into_response();
        }
        return Redirect::to("/auth/mfa/setup").into_response();
    }

    match super::auth::complete_login(&state, &session, &user).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(e) => {
            tracing::error!("Failed to complete federated login: {e}");
            Redirect::to("/auth/login?error=session").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_string() {
        let a = generate_random_string(32);
        let b = generate_random_string(32);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
