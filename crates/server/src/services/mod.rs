//! Business services over the repositories.
//!
//! Services own the multi-step flows (registration, MFA, token issuance,
//! checkout); handlers stay thin.

pub mod auth;
pub mod checkout;
pub mod tokens;

pub use auth::AuthService;
pub use checkout::CheckoutService;
pub use tokens::TokenService;
