//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (pings the database)
//!
//! # Storefront (session auth)
//! GET  /products                - Product listing (cached)
//! GET  /products/{slug}         - Product detail
//! GET  /cart                    - Cart contents
//! POST /cart/add                - Add to cart
//! POST /cart/update             - Update quantity
//! POST /cart/remove             - Remove item
//! GET  /cart/count              - Cart badge count
//! POST /checkout                - Create hosted checkout session, redirect
//! GET  /checkout/success        - Materialize the order after payment
//! GET  /orders                  - Order history
//! GET  /orders/{id}             - Order detail
//!
//! # Auth
//! POST /auth/register           - Create account
//! POST /auth/login              - Password step; may demand MFA
//! POST /auth/logout             - Clear session
//! GET  /auth/mfa/setup          - Enrollment secret + provisioning URI
//! POST /auth/mfa/setup/verify   - Confirm first code, enable MFA
//! GET  /auth/mfa/backup-codes   - One-time display of fresh backup codes
//! POST /auth/mfa/backup-codes/regenerate
//! POST /auth/mfa/verify         - TOTP/backup-code step of login
//! POST /auth/mfa/disable        - Disable MFA (password required)
//! GET  /auth/google/login       - Redirect to Google consent page
//! GET  /auth/google/callback    - Handle OAuth callback
//!
//! # REST API (bearer JWT)
//! GET  /api/products/           - Active products
//! GET  /api/products/{slug}/    - Product detail
//! GET  /api/cart/               - Current cart
//! POST /api/cart/add_item/      - Add item
//! POST /api/cart/remove_item/   - Remove item
//! POST /api/cart/clear/         - Clear cart
//! GET  /api/wishlist/           - Current wishlist
//! POST /api/wishlist/add_item/  - Add item
//! POST /api/wishlist/remove_item/ - Remove item
//!
//! # Admin (session auth + admin role)
//! /admin/products, /admin/categories, /admin/orders, /admin/tokens
//!
//! # Webhooks
//! POST /webhooks/stripe         - Payment provider events
//! ```

pub mod admin;
pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod mfa;
pub mod oauth;
pub mod orders;
pub mod products;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware;
use crate::state::AppState;

/// Create the auth routes router (rate limited by the caller).
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        // MFA lifecycle
        .route("/mfa/setup", get(mfa::setup))
        .route("/mfa/setup/verify", post(mfa::verify_setup))
        .route("/mfa/backup-codes", get(mfa::backup_codes))
        .route(
            "/mfa/backup-codes/regenerate",
            post(mfa::regenerate_backup_codes),
        )
        .route("/mfa/verify", post(mfa::verify))
        .route("/mfa/disable", post(mfa::disable))
        // Google OAuth
        .route("/google/login", get(oauth::google_login))
        .route("/google/callback", get(oauth::google_callback))
}

/// Create the storefront product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
}

/// Create the storefront cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the order history routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create the bearer-token REST API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products/", get(api::products::index))
        .route("/products/{slug}/", get(api::products::show))
        .route("/cart/", get(api::cart::current))
        .route("/cart/add_item/", post(api::cart::add_item))
        .route("/cart/remove_item/", post(api::cart::remove_item))
        .route("/cart/clear/", post(api::cart::clear))
        .route("/wishlist/", get(api::wishlist::current))
        .route("/wishlist/add_item/", post(api::wishlist::add_item))
        .route("/wishlist/remove_item/", post(api::wishlist::remove_item))
}

/// Create the admin router (role checked per handler via `RequireAdmin`).
pub fn admin_routes() -> Router<AppState> {
    use axum::routing::{delete, put};

    Router::new()
        .route(
            "/products",
            get(admin::products::index).post(admin::products::create),
        )
        .route(
            "/products/{id}",
            put(admin::products::update).delete(admin::products::remove),
        )
        .route("/products/{id}/stock", post(admin::products::adjust_stock))
        .route("/products/{id}/images", post(admin::products::add_image))
        .route(
            "/categories",
            get(admin::categories::index).post(admin::categories::create),
        )
        .route("/orders", get(admin::orders::index))
        .route("/orders/{id}/status", post(admin::orders::set_status))
        .route(
            "/tokens",
            get(admin::tokens::index).post(admin::tokens::create),
        )
        .route("/tokens/{id}", delete(admin::tokens::revoke))
}

/// Create all routes for the server.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Storefront
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::start))
        .route("/checkout/config", get(checkout::config))
        .route("/checkout/success", get(checkout::success))
        .nest("/orders", order_routes())
        // Auth (brute-force limited)
        .nest("/auth", auth_routes().layer(middleware::auth_rate_limiter()))
        // Bearer-token API
        .nest("/api", api_routes().layer(middleware::api_rate_limiter()))
        // Admin surface
        .nest("/admin", admin_routes())
        // Payment provider webhooks
        .route("/webhooks/stripe", post(webhooks::stripe))
}
