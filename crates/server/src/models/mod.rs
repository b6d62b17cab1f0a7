//! Domain models for the server.
//!
//! These types represent validated domain objects separate from database row
//! types (which live next to their repositories in [`crate::db`]).

pub mod cart;
pub mod catalog;
pub mod order;
pub mod session;
pub mod token;
pub mod user;

pub use cart::{CartItem, CartSummary, WishlistItem};
pub use catalog::{Category, Product, ProductImage};
pub use order::{BillingDetails, Order, OrderItem};
pub use session::{CurrentUser, session_keys};
pub use token::ApiToken;
pub use user::{User, UserProfile};
