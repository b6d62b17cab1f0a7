//! API token scopes.
//!
//! Each token carries a fixed set of per-operation permissions. A missing
//! scope rejects the request with 403; a missing/invalid token rejects with
//! 401 before scopes are ever consulted.

use serde::{Deserialize, Serialize};

/// Per-operation permissions attached to an API token.
///
/// Defaults to all scopes granted, which is what freshly issued tokens get
/// unless the issuer narrows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenScopes {
    /// Permission to read product data.
    pub read_products: bool,
    /// Permission to manage the shopping cart.
    pub manage_cart: bool,
    /// Permission to place orders.
    pub place_orders: bool,
    /// Permission to manage the wishlist.
    pub manage_wishlist: bool,
}

impl Default for TokenScopes {
    fn default() -> Self {
        Self::all()
    }
}

impl TokenScopes {
    /// All scopes granted.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            read_products: true,
            manage_cart: true,
            place_orders: true,
            manage_wishlist: true,
        }
    }

    /// No scopes granted.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            read_products: false,
            manage_cart: false,
            place_orders: false,
            manage_wishlist: false,
        }
    }

    /// Read-only access to the catalog.
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            read_products: true,
            manage_cart: false,
            place_orders: false,
            manage_wishlist: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grants_everything() {
        assert_eq!(TokenScopes::default(), TokenScopes::all());
    }

    #[test]
    fn test_read_only() {
        let scopes = TokenScopes::read_only();
        assert!(scopes.read_products);
        assert!(!scopes.manage_cart);
        assert!(!scopes.place_orders);
        assert!(!scopes.manage_wishlist);
    }
}
