//! Catalog domain types: categories, products, gallery images.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bluewave_core::{
    CategoryId, CategoryType, Money, ProductId, ProductImageId, ProductStatus, ProductType,
};

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// URL-safe identifier, unique across categories.
    pub slug: String,
    pub description: String,
    pub category_type: CategoryType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// URL-safe identifier, unique across products.
    pub slug: String,
    pub description: String,
    pub short_description: String,
    /// Sustainability information shown on the product page
    /// (CO2 effect, energy efficiency, recyclability).
    pub environmental_notes: Option<String>,
    pub product_type: ProductType,
    pub category_id: Option<CategoryId>,
    pub price: Money,
    /// Original price when the product is discounted.
    pub compare_at_price: Option<Money>,
    pub sku: Option<String>,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
    pub status: ProductStatus,
    pub is_featured: bool,
    /// Path of the primary image under the media root.
    pub main_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product can currently be purchased.
    ///
    /// Subscription products are always in stock.
    #[must_use]
    pub const fn is_in_stock(&self) -> bool {
        if !self.product_type.tracks_stock() {
            return true;
        }
        self.stock_quantity > 0
    }

    /// Whether stock has fallen to or below the configured threshold.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        if !self.product_type.tracks_stock() {
            return false;
        }
        self.stock_quantity > 0 && self.stock_quantity <= self.low_stock_threshold
    }

    /// Discount percentage derived from `compare_at_price`, rounded to the
    /// nearest whole percent. Zero when there is no discount.
    #[must_use]
    pub fn discount_percent(&self) -> u32 {
        use rust_decimal::Decimal;
        use rust_decimal::prelude::ToPrimitive;

        let Some(compare) = &self.compare_at_price else {
            return 0;
        };
        if compare.amount <= self.price.amount || compare.amount.is_zero() {
            return 0;
        }
        let ratio = (compare.amount - self.price.amount) / compare.amount;
        (ratio * Decimal::new(100, 0))
            .round()
            .to_u32()
            .unwrap_or(0)
    }
}

/// An additional gallery image for a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    /// Path under the media root.
    pub path: String,
    pub alt_text: String,
    pub is_primary: bool,
    pub sort_order: i32,
}

/// Build a URL-safe slug from a display name.
///
/// Lowercases, maps runs of non-alphanumeric characters to single hyphens,
/// and trims leading/trailing hyphens.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bluewave_core::CurrencyCode;
    use rust_decimal::Decimal;

    fn product(product_type: ProductType, stock: i32) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Compact Unit".to_owned(),
            slug: "compact-unit".to_owned(),
            description: String::new(),
            short_description: String::new(),
            environmental_notes: None,
            product_type,
            category_id: None,
            price: Money::new(Decimal::new(49_900, 2), CurrencyCode::USD),
            compare_at_price: None,
            sku: Some("BW-CU-01".to_owned()),
            stock_quantity: stock,
            low_stock_threshold: 10,
            status: ProductStatus::Active,
            is_featured: false,
            main_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_stock_tracking() {
        assert!(product(ProductType::DesalinationUnit, 5).is_in_stock());
        assert!(!product(ProductType::DesalinationUnit, 0).is_in_stock());
        // Subscriptions are always purchasable
        assert!(product(ProductType::DataSubscription, 0).is_in_stock());
    }

    #[test]
    fn test_low_stock() {
        assert!(product(ProductType::DesalinationUnit, 10).is_low_stock());
        assert!(!product(ProductType::DesalinationUnit, 11).is_low_stock());
        assert!(!product(ProductType::DesalinationUnit, 0).is_low_stock());
        assert!(!product(ProductType::DataSubscription, 3).is_low_stock());
    }

    #[test]
    fn test_discount_percent() {
        let mut p = product(ProductType::DesalinationUnit, 5);
        assert_eq!(p.discount_percent(), 0);

        p.compare_at_price = Some(Money::new(Decimal::new(99_800, 2), CurrencyCode::USD));
        // 499.00 vs 998.00 -> 50%
        assert_eq!(p.discount_percent(), 50);

        // compare_at below price is not a discount
        p.compare_at_price = Some(Money::new(Decimal::new(100, 2), CurrencyCode::USD));
        assert_eq!(p.discount_percent(), 0);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Compact Unit"), "compact-unit");
        assert_eq!(slugify("  Solar -- Powered!  "), "solar-powered");
        assert_eq!(slugify("Édition 2"), "dition-2");
    }
}
