//! Checkout route handlers.
//!
//! `POST /checkout` redirects the browser to the hosted payment page;
//! `GET /checkout/success` is where the provider sends the shopper back.

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::services::auth::AuthService;
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

/// Query parameters on the success redirect.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub session_id: Option<String>,
}

/// Publishable payment configuration for browser clients.
#[instrument(skip(state))]
pub async fn config(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "stripe_publishable_key": state.config().stripe.publishable_key,
    }))
}

/// Create a hosted checkout session from the cart and redirect to it.
#[instrument(skip(state, user))]
pub async fn start(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Response, AppError> {
    let auth = AuthService::new(state.pool());
    let account = auth.get_user(user.id).await?;

    let checkout = CheckoutService::new(state.pool(), state.stripe(), &state.config().base_url);
    let url = checkout.start(&account).await?;

    // 303 so the POST becomes a GET at the provider
    Ok(Redirect::to(&url).into_response())
}

/// Handle the return from the hosted payment page.
///
/// Verifies payment with the provider and materializes the order; reloading
/// this URL returns the same order.
#[instrument(skip(state, user, query))]
pub async fn success(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<SuccessQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session_id = query
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("invalid checkout session".to_owned()))?;

    let auth = AuthService::new(state.pool());
    let account = auth.get_user(user.id).await?;

    let checkout = CheckoutService::new(state.pool(), state.stripe(), &state.config().base_url);
    let order = checkout.complete(&account, &session_id).await?;

    Ok(Json(json!({
        "message": "Payment complete",
        "order": {
            "id": order.id,
            "order_number": order.order_number,
            "status": order.status,
            "payment_status": order.payment_status,
            "total_amount": order.total_amount,
        },
    })))
}
