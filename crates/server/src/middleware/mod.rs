//! Tower/axum middleware and extractors.

pub mod auth;
pub mod host;
pub mod rate_limit;
pub mod session;

pub use auth::{
    ApiAuth, OptionalUser, RequireAdmin, RequireUser, clear_current_user, set_current_user,
};
pub use host::enforce_allowed_hosts;
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use session::create_session_layer;
