//! Checkout orchestration.
//!
//! Builds hosted Checkout Sessions from the cart and materializes orders
//! once the payment provider reports the session paid. Order creation is
//! idempotent on the payment intent: revisiting the success URL never
//! duplicates an order.

use sqlx::PgPool;
use thiserror::Error;

use bluewave_core::{CurrencyCode, Money, OrderStatus, PaymentStatus, UserId};

use crate::db::RepositoryError;
use crate::db::cart::CartRepository;
use crate::db::orders::{NewOrder, NewOrderItem, OrderRepository};
use crate::models::cart::CartItem;
use crate::models::order::{BillingDetails, Order};
use crate::models::user::User;
use crate::stripe::{
    CheckoutSession, CheckoutSessionParams, LineItemParams, StripeClient, StripeError, StripeEvent,
};

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout attempted with an empty cart.
    #[error("cart is empty")]
    EmptyCart,

    /// The session exists but has not been paid.
    #[error("payment was not completed")]
    NotPaid,

    /// Paid session without a payment intent reference.
    #[error("session carries no payment intent")]
    MissingPaymentIntent,

    /// Stripe did not return a hosted checkout URL.
    #[error("session carries no checkout url")]
    MissingCheckoutUrl,

    /// Payment provider failure.
    #[error(transparent)]
    Stripe(#[from] StripeError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Checkout service.
pub struct CheckoutService<'a> {
    cart: CartRepository<'a>,
    orders: OrderRepository<'a>,
    stripe: &'a StripeClient,
    base_url: &'a str,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, stripe: &'a StripeClient, base_url: &'a str) -> Self {
        Self {
            cart: CartRepository::new(pool),
            orders: OrderRepository::new(pool),
            stripe,
            base_url,
        }
    }

    /// Create a hosted Checkout Session from the user's cart.
    ///
    /// Returns the URL to redirect the browser to.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` when there is nothing to buy and
    /// `CheckoutError::Stripe` on provider failures.
    pub async fn start(&self, user: &User) -> Result<String, CheckoutError> {
        let items = self.cart.items(user.id).await?;
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let line_items = items
            .iter()
            .map(|item| {
                Ok(LineItemParams {
                    name: item.product.name.clone(),
                    description: Some(item.product.short_description.clone())
                        .filter(|d| !d.is_empty()),
                    currency: item.product.price.currency_code.as_provider_code().to_owned(),
                    unit_amount: item.product.price.to_minor_units()?,
                    quantity: item.quantity,
                })
            })
            .collect::<Result<Vec<_>, bluewave_core::MoneyError>>()
            .map_err(StripeError::Amount)?;

        let base = self.base_url.trim_end_matches('/');
        let params = CheckoutSessionParams {
            line_items,
            success_url: format!(
                "{base}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}"
            ),
            cancel_url: format!("{base}/cart"),
            customer_email: user.email.to_string(),
            metadata: vec![("user_id".to_owned(), user.id.to_string())],
        };

        let session = self.stripe.create_checkout_session(&params).await?;
        tracing::info!(session_id = %session.id, user_id = %user.id, "checkout session created");

        session.url.ok_or(CheckoutError::MissingCheckoutUrl)
    }

    /// Complete checkout after the provider redirected back.
    ///
    /// Retrieves the session, requires it to be paid, then creates the order
    /// and clears the cart. A second call with the same session finds the
    /// existing order and returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotPaid` for unpaid sessions and
    /// `CheckoutError::EmptyCart` when the cart has nothing to materialize.
    pub async fn complete(&self, user: &User, session_id: &str) -> Result<Order, CheckoutError> {
        let session = self.stripe.retrieve_checkout_session(session_id).await?;

        if !session.is_paid() {
            return Err(CheckoutError::NotPaid);
        }

        let payment_intent = session
            .payment_intent
            .clone()
            .ok_or(CheckoutError::MissingPaymentIntent)?;

        // Idempotency: the success URL can be reloaded
        if let Some(existing) = self.orders.find_by_payment_intent(&payment_intent).await? {
            return Ok(existing);
        }

        let items = self.cart.items(user.id).await?;
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let order = self
            .orders
            .create_with_items(
                &build_order(user, &items, &payment_intent, &session),
                &build_order_items(&items),
            )
            .await?;

        self.cart.clear(user.id).await?;

        tracing::info!(
            order_number = %order.order_number,
            user_id = %user.id,
            "order created from checkout session"
        );
        Ok(order)
    }

    /// Apply a verified webhook event to the order it references.
    ///
    /// Unknown event types are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the status update fails.
    pub async fn apply_webhook_event(&self, event: &StripeEvent) -> Result<(), CheckoutError> {
        let Some(payment_intent_id) = event.payment_intent_id() else {
            tracing::warn!(event_type = %event.event_type, "webhook event without object id");
            return Ok(());
        };

        match event.event_type.as_str() {
            "payment_intent.succeeded" => {
                let updated = self
                    .orders
                    .set_payment_status(payment_intent_id, PaymentStatus::Paid, OrderStatus::Paid)
                    .await?;
                if updated {
                    tracing::info!(payment_intent_id, "order marked as paid via webhook");
                } else {
                    tracing::warn!(payment_intent_id, "no order found for payment intent");
                }
            }
            "payment_intent.payment_failed" => {
                let updated = self
                    .orders
                    .set_payment_status(
                        payment_intent_id,
                        PaymentStatus::Failed,
                        OrderStatus::Cancelled,
                    )
                    .await?;
                if updated {
                    tracing::info!(payment_intent_id, "order marked as failed via webhook");
                }
            }
            other => {
                tracing::debug!(event_type = %other, "unhandled webhook event type");
            }
        }

        Ok(())
    }
}

/// Assemble the order header from the cart and the paid session.
fn build_order(
    user: &User,
    items: &[CartItem],
    payment_intent: &str,
    session: &CheckoutSession,
) -> NewOrder {
    let currency = CurrencyCode::default();
    let subtotal = items.iter().fold(Money::zero(currency), |acc, item| {
        acc.checked_add(&item.line_total()).unwrap_or(acc)
    });
    let tax_amount = Money::zero(currency);
    let shipping_amount = Money::zero(currency);
    let total_amount = subtotal;

    NewOrder {
        user_id: user.id,
        status: OrderStatus::Paid,
        payment_status: PaymentStatus::Paid,
        subtotal,
        tax_amount,
        shipping_amount,
        total_amount,
        billing: BillingDetails {
            // The provider collected the full address; keep the contact summary
            first_name: user.username.clone(),
            last_name: String::new(),
            email: user.email.clone(),
            phone: String::new(),
            address_line1: "Address provided at checkout".to_owned(),
            city: String::new(),
            postal_code: String::new(),
            country: "US".to_owned(),
        },
        stripe_payment_intent_id: Some(payment_intent.to_owned()),
        stripe_session_id: Some(session.id.clone()),
    }
}

/// Snapshot cart lines into order lines.
fn build_order_items(items: &[CartItem]) -> Vec<NewOrderItem> {
    items
        .iter()
        .map(|item| NewOrderItem {
            product_id: item.product.id,
            product_name: item.product.name.clone(),
            product_sku: item.product.sku.clone().unwrap_or_default(),
            unit_price: item.product.price,
            quantity: item.quantity,
            total_price: item.line_total(),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bluewave_core::{CartItemId, Email, ProductId, ProductStatus, ProductType, UserRole};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn cart_item(name: &str, cents: i64, quantity: u32) -> CartItem {
        let product = crate::models::Product {
            id: ProductId::new(1),
            name: name.to_owned(),
            slug: "p".to_owned(),
            description: String::new(),
            short_description: "desc".to_owned(),
            environmental_notes: None,
            product_type: ProductType::DesalinationUnit,
            category_id: None,
            price: Money::from_minor_units(cents, CurrencyCode::USD),
            compare_at_price: None,
            sku: Some("SKU-1".to_owned()),
            stock_quantity: 10,
            low_stock_threshold: 2,
            status: ProductStatus::Active,
            is_featured: false,
            main_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        CartItem {
            id: CartItemId::new(1),
            user_id: UserId::new(7),
            product,
            quantity,
            price_when_added: Money::from_minor_units(cents, CurrencyCode::USD),
            added_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user() -> User {
        User {
            id: UserId::new(7),
            username: "casey".to_owned(),
            email: Email::parse("casey@example.com").unwrap(),
            role: UserRole::Customer,
            phone: None,
            company: None,
            is_active: true,
            date_joined: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn paid_session() -> CheckoutSession {
        serde_json::from_str(
            r#"{"id":"cs_1","url":null,"payment_status":"paid",
                "payment_intent":"pi_1","amount_total":10000,"currency":"usd"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_build_order_totals() {
        let items = vec![cart_item("Unit", 49_900, 1), cart_item("Filter", 2_500, 2)];
        let order = build_order(&user(), &items, "pi_1", &paid_session());

        assert_eq!(order.subtotal.to_minor_units().unwrap(), 54_900);
        assert_eq!(order.total_amount.to_minor_units().unwrap(), 54_900);
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.stripe_payment_intent_id.as_deref(), Some("pi_1"));
        assert_eq!(order.stripe_session_id.as_deref(), Some("cs_1"));
    }

    #[test]
    fn test_build_order_items_snapshots_product() {
        let items = vec![cart_item("Filter", 2_500, 3)];
        let lines = build_order_items(&items);

        assert_eq!(lines.len(), 1);
        let line = lines.first().unwrap();
        assert_eq!(line.product_name, "Filter");
        assert_eq!(line.product_sku, "SKU-1");
        assert_eq!(line.quantity, 3);
        assert_eq!(line.total_price.to_minor_units().unwrap(), 7_500);
        assert_eq!(line.unit_price.amount, Decimal::new(2_500, 2));
    }
}
