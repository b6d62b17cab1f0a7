//! Bearer-token REST API handlers.
//!
//! Every handler authenticates via [`crate::middleware::ApiAuth`] and
//! enforces the token scope matching the operation. Response shapes follow
//! the public API contract: message strings plus running counts.

pub mod cart;
pub mod products;
pub mod wishlist;
