//! Admin API token handlers.
//!
//! Tokens are issued here with configurable length, expiry, and scopes. The
//! signed JWT appears once in the issuance response and never again; list
//! responses redact it.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use bluewave_core::{ApiTokenId, TokenScopes, UserId};

use crate::db::ApiTokenRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::token::ApiToken;
use crate::services::auth::AuthService;
use crate::services::tokens::TokenService;
use crate::state::AppState;

/// Token issuance payload.
#[derive(Debug, Deserialize)]
pub struct IssueTokenForm {
    /// Account the token is issued for; defaults to the issuing admin.
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub name: String,
    #[serde(default = "default_token_length")]
    pub token_length: u32,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Option<TokenScopes>,
}

const fn default_token_length() -> u32 {
    32
}

/// Token list entry with the secret redacted.
#[derive(Debug, Serialize)]
pub struct TokenView {
    pub id: ApiTokenId,
    pub user_id: UserId,
    pub name: String,
    pub token_length: u32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
    pub scopes: TokenScopes,
    pub created_at: DateTime<Utc>,
}

impl From<ApiToken> for TokenView {
    fn from(token: ApiToken) -> Self {
        Self {
            id: token.id,
            user_id: token.user_id,
            name: token.name,
            token_length: token.token_length,
            is_active: token.is_active,
            expires_at: token.expires_at,
            last_used: token.last_used,
            scopes: token.scopes,
            created_at: token.created_at,
        }
    }
}

/// `GET /admin/tokens` - every issued token, secrets redacted.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<TokenView>>> {
    let tokens = ApiTokenRepository::new(state.pool()).list_all().await?;
    Ok(Json(tokens.into_iter().map(TokenView::from).collect()))
}

/// `POST /admin/tokens` - issue a token.
///
/// The owning account must have completed MFA enrollment; the response is
/// the only place the signed JWT ever appears.
#[instrument(skip(state, admin, form))]
pub async fn create(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Json(form): Json<IssueTokenForm>,
) -> Result<Response> {
    if form.name.trim().is_empty() {
        return Err(AppError::BadRequest("token name is required".to_owned()));
    }

    let owner_id = form.user_id.unwrap_or(admin.0.id);
    let auth = AuthService::new(state.pool());
    let owner = auth.get_user(owner_id).await.map_err(|_| {
        AppError::NotFound("token owner not found".to_owned())
    })?;

    let tokens = TokenService::new(state.pool(), &state.config().secret_key);
    let token = tokens
        .issue_api_token(
            &owner,
            form.name.trim(),
            form.token_length,
            form.expires_at,
            form.scopes.unwrap_or_default(),
        )
        .await?;

    tracing::info!(
        token_id = %token.id,
        owner = %owner.username,
        issued_by = %admin.0.username,
        "api token issued"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Store this token now; it will not be shown again.",
            "token": token.token,
            "details": TokenView::from(token),
        })),
    )
        .into_response())
}

/// `DELETE /admin/tokens/{id}` - revoke a token.
#[instrument(skip(state, admin))]
pub async fn revoke(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<ApiTokenId>,
) -> Result<Json<serde_json::Value>> {
    if !ApiTokenRepository::new(state.pool()).revoke(id).await? {
        return Err(AppError::NotFound(
            "token not found or already revoked".to_owned(),
        ));
    }

    tracing::info!(token_id = %id, revoked_by = %admin.0.username, "api token revoked");
    Ok(Json(json!({ "message": "Token revoked" })))
}
