//! Cart and wishlist domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bluewave_core::{CartItemId, CurrencyCode, Money, UserId, WishlistItemId};

use super::catalog::Product;

/// A line in a user's cart.
///
/// The price at add time is recorded so price drift can be surfaced to the
/// shopper before checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product: Product,
    pub quantity: u32,
    pub price_when_added: Money,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Line total at the product's current price.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.product.price.times(self.quantity)
    }

    /// Whether the product price changed since this line was added.
    #[must_use]
    pub fn price_changed(&self) -> bool {
        self.product.price != self.price_when_added
    }
}

/// Aggregated cart contents for responses.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub total_items: u32,
    pub total_price: Money,
}

impl CartSummary {
    /// Sum up cart lines into a summary.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let total_items = items.iter().map(|i| i.quantity).sum();
        let total_price = items.iter().fold(
            Money::zero(CurrencyCode::default()),
            |acc, item| {
                acc.checked_add(&item.line_total())
                    .unwrap_or(acc)
            },
        );
        Self {
            items,
            total_items,
            total_price,
        }
    }
}

/// A saved product in a user's wishlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: WishlistItemId,
    pub user_id: UserId,
    pub product: Product,
    /// Optional note from the user about this item.
    pub note: String,
    pub added_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bluewave_core::{ProductId, ProductStatus, ProductType};
    use rust_decimal::Decimal;

    fn item(price_cents: i64, added_cents: i64, quantity: u32) -> CartItem {
        let product = Product {
            id: ProductId::new(1),
            name: "Filter Cartridge".to_owned(),
            slug: "filter-cartridge".to_owned(),
            description: String::new(),
            short_description: String::new(),
            environmental_notes: None,
            product_type: ProductType::DesalinationUnit,
            category_id: None,
            price: Money::from_minor_units(price_cents, CurrencyCode::USD),
            compare_at_price: None,
            sku: None,
            stock_quantity: 100,
            low_stock_threshold: 10,
            status: ProductStatus::Active,
            is_featured: false,
            main_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        CartItem {
            id: CartItemId::new(1),
            user_id: UserId::new(1),
            product,
            quantity,
            price_when_added: Money::from_minor_units(added_cents, CurrencyCode::USD),
            added_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_line_total_uses_current_price() {
        let line = item(2500, 2000, 3);
        assert_eq!(line.line_total().to_minor_units().unwrap(), 7500);
    }

    #[test]
    fn test_price_changed() {
        assert!(item(2500, 2000, 1).price_changed());
        assert!(!item(2500, 2500, 1).price_changed());
    }

    #[test]
    fn test_summary_totals() {
        let summary = CartSummary::from_items(vec![item(2500, 2500, 2), item(1000, 1000, 1)]);
        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.total_price.to_minor_units().unwrap(), 6000);
    }

    #[test]
    fn test_empty_summary() {
        let summary = CartSummary::from_items(vec![]);
        assert_eq!(summary.total_items, 0);
        assert_eq!(summary.total_price.to_minor_units().unwrap(), 0);
    }
}
