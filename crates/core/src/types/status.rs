//! Status and classification enums for catalog, order, and account entities.
//!
//! All variants round-trip through their `snake_case` string form, which is
//! how they are stored in `TEXT` columns and rendered in JSON.

use serde::{Deserialize, Serialize};

/// Implement `Display`/`FromStr` over the `snake_case` wire form.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $text),)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", stringify!($name), ": {}"), s)),
                }
            }
        }
    };
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full access to the admin surface and token issuance.
    Admin,
    /// Regular shopper account.
    #[default]
    Customer,
}

string_enum!(UserRole {
    Admin => "admin",
    Customer => "customer",
});

impl UserRole {
    /// Whether this role grants access to the admin surface.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Catalog category classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    #[default]
    Hardware,
    Subscription,
    Service,
}

string_enum!(CategoryType {
    Hardware => "hardware",
    Subscription => "subscription",
    Service => "service",
});

/// Product classification.
///
/// Subscription products are never out of stock; physical products track
/// `stock_quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    #[default]
    DesalinationUnit,
    DataSubscription,
    Service,
}

string_enum!(ProductType {
    DesalinationUnit => "desalination_unit",
    DataSubscription => "data_subscription",
    Service => "service",
});

impl ProductType {
    /// Whether stock tracking applies to this product type.
    #[must_use]
    pub const fn tracks_stock(&self) -> bool {
        !matches!(self, Self::DataSubscription)
    }
}

/// Product publication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Draft,
    Active,
    Inactive,
    OutOfStock,
}

string_enum!(ProductStatus {
    Draft => "draft",
    Active => "active",
    Inactive => "inactive",
    OutOfStock => "out_of_stock",
});

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

string_enum!(OrderStatus {
    Pending => "pending",
    Paid => "paid",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

/// Payment status as reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

string_enum!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
    PartiallyRefunded => "partially_refunded",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [UserRole::Admin, UserRole::Customer] {
            let parsed: UserRole = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_is_admin() {
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Customer.is_admin());
    }

    #[test]
    fn test_product_status_roundtrip() {
        for status in [
            ProductStatus::Draft,
            ProductStatus::Active,
            ProductStatus::Inactive,
            ProductStatus::OutOfStock,
        ] {
            let parsed: ProductStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_order_status_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            let parsed: OrderStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_payment_status_wire_form() {
        assert_eq!(
            PaymentStatus::PartiallyRefunded.to_string(),
            "partially_refunded"
        );
        let parsed: PaymentStatus = "partially_refunded".parse().unwrap();
        assert_eq!(parsed, PaymentStatus::PartiallyRefunded);
    }

    #[test]
    fn test_subscription_products_skip_stock() {
        assert!(!ProductType::DataSubscription.tracks_stock());
        assert!(ProductType::DesalinationUnit.tracks_stock());
    }

    #[test]
    fn test_serde_matches_display() {
        let json = serde_json::to_string(&ProductType::DataSubscription).unwrap();
        assert_eq!(json, "\"data_subscription\"");
    }
}
