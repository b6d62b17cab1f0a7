//! Authentication route handlers.
//!
//! Login is two-step for customer accounts: the password check either
//! completes immediately (admins with MFA pending enrollment), demands a
//! TOTP code, or pushes the account into mandatory MFA enrollment.

use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::user::User;
use crate::models::{CurrentUser, session_keys};
use crate::services::auth::{AuthService, LoginStep};
use crate::services::tokens::TokenService;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle registration.
///
/// New accounts get the customer role and are sent straight into MFA
/// enrollment on their first login.
#[instrument(skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if form.password != form.password_confirm {
        return Err(AppError::BadRequest("passwords do not match".to_owned()));
    }

    let auth = AuthService::new(state.pool());
    let user = auth
        .register(&form.username, &form.email, &form.password)
        .await?;

    tracing::info!(user_id = %user.id, "account registered");

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "message": "Account created. Log in to set up two-factor authentication.",
            "user": { "id": user.id, "username": user.username, "email": user.email },
        })),
    )
        .into_response())
}

/// Handle the password step of login.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let auth = AuthService::new(state.pool());

    match auth
        .login_with_password(&form.username, &form.password)
        .await?
    {
        LoginStep::Complete(user) => {
            complete_login(&state, &session, &user).await?;
            Ok(Redirect::to("/").into_response())
        }
        LoginStep::MfaRequired(user_id) => {
            session
                .insert(session_keys::MFA_USER_ID, user_id)
                .await
                .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
            Ok(Redirect::to("/auth/mfa/verify").into_response())
        }
        LoginStep::MfaSetupRequired(user_id) => {
            session
                .insert(session_keys::MFA_SETUP_USER_ID, user_id)
                .await
                .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
            Ok(Redirect::to("/auth/mfa/setup").into_response())
        }
    }
}

/// Handle logout.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {e}");
    }

    // Also destroy the entire session
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {e}");
    }

    crate::error::clear_sentry_user();

    Redirect::to("/").into_response()
}

// =============================================================================
// Shared login completion
// =============================================================================

/// Put the authenticated user into the session and mint their session JWT.
pub(crate) async fn complete_login(
    state: &AppState,
    session: &Session,
    user: &User,
) -> Result<(), AppError> {
    let current = CurrentUser {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role,
    };

    set_current_user(session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    let tokens = TokenService::new(state.pool(), &state.config().secret_key);
    let jwt = tokens.issue_session_token(user)?;
    session
        .insert(session_keys::JWT_TOKEN, &jwt)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "login complete");
    Ok(())
}
