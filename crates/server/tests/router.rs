//! Router-level tests.
//!
//! These exercise the assembled router with `tower::ServiceExt::oneshot` and
//! a lazily-connected pool, covering the paths that must reject before any
//! database work happens: missing bearer tokens, missing sessions, and
//! webhook deliveries that fail verification.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use tower::ServiceExt;

use bluewave_server::config::{ServerConfig, StripeConfig};
use bluewave_server::state::AppState;
use bluewave_server::{db, routes};

fn test_config(webhook_secret: Option<&str>) -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://localhost/bluewave_test"),
        host: "127.0.0.1".parse().expect("valid ip"),
        port: 8000,
        base_url: "http://localhost:8000".to_owned(),
        secret_key: SecretString::from("k9#mTq2$vX8&wY4!bN6@cL1%dZ5^eH3*"),
        debug: true,
        allowed_hosts: vec![],
        stripe: StripeConfig {
            publishable_key: "pk_test_123".to_owned(),
            secret_key: SecretString::from("sk_test_123"),
            webhook_secret: webhook_secret.map(SecretString::from),
        },
        google: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

fn test_app(webhook_secret: Option<&str>) -> Router {
    let config = test_config(webhook_secret);
    let pool = db::create_lazy_pool(&config.database_url);
    let state = AppState::new(config, pool);

    let session_layer = bluewave_server::middleware::create_session_layer(state.pool(), state.config());

    Router::new()
        .route("/health", axum::routing::get(|| async { "ok" }))
        .merge(routes::routes())
        .layer(session_layer)
        .with_state(state)
}

/// Requests from "a client" - the rate limiter needs a resolvable IP.
fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.5")
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn health_returns_ok() {
    let app = test_app(None);
    let response = app.oneshot(request("GET", "/health")).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.expect("body").to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn api_without_token_is_unauthorized() {
    let app = test_app(None);
    let response = app
        .oneshot(request("GET", "/api/products/"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_with_malformed_header_is_unauthorized() {
    let app = test_app(None);
    let mut req = request("GET", "/api/products/");
    req.headers_mut().insert(
        header::AUTHORIZATION,
        "Token not-a-bearer".parse().expect("header value"),
    );

    let response = app.oneshot(req).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_with_unsigned_jwt_is_unauthorized() {
    let app = test_app(None);
    let mut req = request("GET", "/api/cart/");
    req.headers_mut().insert(
        header::AUTHORIZATION,
        "Bearer eyJhbGciOiJIUzI1NiJ9.e30.invalid"
            .parse()
            .expect("header value"),
    );

    let response = app.oneshot(req).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cart_without_session_redirects_to_login() {
    let app = test_app(None);
    let response = app.oneshot(request("GET", "/cart")).await.expect("response");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok());
    assert_eq!(location, Some("/auth/login"));
}

#[tokio::test]
async fn admin_without_session_redirects_to_login() {
    let app = test_app(None);
    let response = app
        .oneshot(request("GET", "/admin/products"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn orders_without_session_redirects_to_login() {
    let app = test_app(None);
    let response = app.oneshot(request("GET", "/orders")).await.expect("response");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn webhook_without_secret_acknowledges_and_skips() {
    let app = test_app(None);
    let response = app
        .oneshot(request("POST", "/webhooks/stripe"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.expect("body").to_bytes();
    assert_eq!(&body[..], b"Webhook verification disabled");
}

#[tokio::test]
async fn webhook_with_secret_requires_signature_header() {
    let app = test_app(Some("whsec_test_secret"));
    let response = app
        .oneshot(request("POST", "/webhooks/stripe"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_with_secret_rejects_garbage_signature() {
    let app = test_app(Some("whsec_test_secret"));
    let mut req = request("POST", "/webhooks/stripe");
    req.headers_mut().insert(
        "Stripe-Signature",
        "t=0,v1=deadbeef".parse().expect("header value"),
    );

    let response = app.oneshot(req).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = test_app(None);
    let response = app
        .oneshot(request("GET", "/definitely-not-a-route"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
