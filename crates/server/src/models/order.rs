//! Order domain types.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use bluewave_core::{Email, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId};

/// Billing details captured at checkout.
///
/// The payment provider collects the card and full address; only the contact
/// summary lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: String,
    pub address_line1: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// A customer order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-readable order reference (e.g. `BW123456789`).
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub total_amount: Money,
    pub billing: BillingDetails,
    /// Payment intent reference from the payment provider.
    pub stripe_payment_intent_id: Option<String>,
    /// Hosted checkout session reference from the payment provider.
    pub stripe_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line within an order.
///
/// Product details are snapshotted at purchase time; later catalog edits do
/// not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_sku: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub total_price: Money,
}

/// Generate an order number: `BW` + last six digits of the unix timestamp +
/// three random digits.
///
/// Uniqueness is backed by a unique index; callers retry once on conflict.
#[must_use]
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let timestamp = now.timestamp();
    let suffix = rand::rng().random_range(100..=999);
    format!("BW{:06}{}", timestamp % 1_000_000, suffix)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_shape() {
        let number = generate_order_number(Utc::now());
        assert!(number.starts_with("BW"));
        assert_eq!(number.len(), 11);
        assert!(number.get(2..).unwrap().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_order_number_uses_timestamp_tail() {
        let now = DateTime::from_timestamp(1_723_456_789, 0).unwrap();
        let number = generate_order_number(now);
        assert_eq!(number.get(2..8).unwrap(), "456789");
    }
}
