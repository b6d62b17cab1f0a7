//! Admin surface handlers.
//!
//! Every handler takes [`crate::middleware::RequireAdmin`], so a session
//! user without the admin role gets 403 before any work happens.

pub mod categories;
pub mod orders;
pub mod products;
pub mod tokens;
