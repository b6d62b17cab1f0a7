//! MFA route handlers: enrollment, verification, backup codes.
//!
//! Enrollment can run in two states: a logged-in user hardening their
//! account, or a half-logged-in user parked in the session by the password
//! step (`MFA_SETUP_USER_ID`) because enrollment is mandatory.

use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use bluewave_core::UserId;

use crate::error::AppError;
use crate::middleware::OptionalUser;
use crate::models::session_keys;
use crate::models::user::User;
use crate::services::auth::AuthService;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Code submitted to confirm enrollment.
#[derive(Debug, Deserialize)]
pub struct VerifySetupForm {
    pub verification_code: String,
}

/// Code submitted at the MFA step of login.
#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    #[serde(default)]
    pub verification_code: String,
    #[serde(default)]
    pub backup_code: String,
}

/// Password re-verification form.
#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub password: String,
}

// =============================================================================
// Setup-user resolution
// =============================================================================

/// Resolve who is enrolling: the logged-in user, or the account parked in
/// the session by the password step.
async fn setup_user(
    state: &AppState,
    session: &Session,
    current: Option<&crate::models::CurrentUser>,
) -> Result<User, AppError> {
    let auth = AuthService::new(state.pool());

    if let Some(current) = current {
        return Ok(auth.get_user(current.id).await?);
    }

    let user_id: Option<UserId> = session
        .get(session_keys::MFA_SETUP_USER_ID)
        .await
        .ok()
        .flatten();

    match user_id {
        Some(id) => Ok(auth.get_user(id).await?),
        None => Err(AppError::Unauthorized(
            "no enrollment in progress".to_owned(),
        )),
    }
}

// =============================================================================
// Enrollment
// =============================================================================

/// Start (or resume) MFA enrollment.
///
/// Returns the base32 secret and the `otpauth://` URI the authenticator app
/// consumes (rendered as a QR code client-side).
#[instrument(skip(state, session, current))]
pub async fn setup(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(current): OptionalUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = setup_user(&state, &session, current.as_ref()).await?;

    let auth = AuthService::new(state.pool());
    let (secret, otpauth_url) = auth.start_mfa_enrollment(&user).await?;

    Ok(Json(json!({
        "secret": secret,
        "otpauth_url": otpauth_url,
        "account": user.email,
    })))
}

/// Confirm the first TOTP code and enable MFA.
///
/// When enrollment was forced mid-login, this also completes the login.
/// Fresh backup codes are parked in the session for one-time display.
#[instrument(skip(state, session, current, form))]
pub async fn verify_setup(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(current): OptionalUser,
    Form(form): Form<VerifySetupForm>,
) -> Result<Response, AppError> {
    let user = setup_user(&state, &session, current.as_ref()).await?;

    let auth = AuthService::new(state.pool());
    let backup_codes = auth
        .confirm_mfa_enrollment(&user, &form.verification_code)
        .await?;

    session
        .insert(session_keys::MFA_BACKUP_CODES, &backup_codes)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    // Complete the interrupted login, if there was one
    if current.is_none() {
        let _ = session.remove::<UserId>(session_keys::MFA_SETUP_USER_ID).await;
        super::auth::complete_login(&state, &session, &user).await?;
    }

    tracing::info!(user_id = %user.id, "mfa enabled");
    Ok(Redirect::to("/auth/mfa/backup-codes").into_response())
}

/// One-time display of freshly generated backup codes.
#[instrument(skip(session))]
pub async fn backup_codes(session: Session) -> Result<Json<serde_json::Value>, AppError> {
    let codes: Option<Vec<String>> = session
        .remove(session_keys::MFA_BACKUP_CODES)
        .await
        .ok()
        .flatten();

    match codes {
        Some(codes) => Ok(Json(json!({
            "backup_codes": codes,
            "message": "Store these codes safely. They will not be shown again.",
        }))),
        None => Err(AppError::NotFound("no backup codes to display".to_owned())),
    }
}

/// Regenerate backup codes (password required).
#[instrument(skip(state, session, user, form))]
pub async fn regenerate_backup_codes(
    State(state): State<AppState>,
    session: Session,
    user: crate::middleware::RequireUser,
    Form(form): Form<PasswordForm>,
) -> Result<Response, AppError> {
    let auth = AuthService::new(state.pool());
    let account = auth.get_user(user.0.id).await?;
    let codes = auth
        .regenerate_backup_codes(&account, &form.password)
        .await?;

    session
        .insert(session_keys::MFA_BACKUP_CODES, &codes)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    Ok(Redirect::to("/auth/mfa/backup-codes").into_response())
}

// =============================================================================
// Login verification
// =============================================================================

/// Verify the TOTP or backup code parked by the password step.
#[instrument(skip(state, session, form))]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<VerifyForm>,
) -> Result<Response, AppError> {
    let user_id: UserId = session
        .get(session_keys::MFA_USER_ID)
        .await
        .ok()
        .flatten()
        .ok_or_else(|| AppError::Unauthorized("no mfa verification in progress".to_owned()))?;

    let code = if form.verification_code.trim().is_empty() {
        form.backup_code.trim()
    } else {
        form.verification_code.trim()
    };

    let auth = AuthService::new(state.pool());
    let (user, used_backup_code) = auth.verify_mfa(user_id, code).await?;

    let _ = session.remove::<UserId>(session_keys::MFA_USER_ID).await;
    super::auth::complete_login(&state, &session, &user).await?;

    if used_backup_code {
        tracing::warn!(user_id = %user.id, "login used a backup code");
    }

    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Disable
// =============================================================================

/// Disable MFA for the logged-in account (password required).
#[instrument(skip(state, user, form))]
pub async fn disable(
    State(state): State<AppState>,
    user: crate::middleware::RequireUser,
    Form(form): Form<PasswordForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let auth = AuthService::new(state.pool());
    let account = auth.get_user(user.0.id).await?;
    auth.disable_mfa(&account, &form.password).await?;

    tracing::info!(user_id = %account.id, "mfa disabled");
    Ok(Json(json!({ "message": "MFA has been disabled" })))
}
