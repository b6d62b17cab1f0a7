//! Order repository.
//!
//! Orders and their lines are written in one transaction. Order numbers are
//! generated from the clock with a random suffix; the unique index backs a
//! single retry on collision.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use bluewave_core::{
    CurrencyCode, Email, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId,
    UserId,
};

use super::RepositoryError;
use crate::models::order::{BillingDetails, Order, OrderItem, generate_order_number};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: i32,
    status: String,
    payment_status: String,
    subtotal: Decimal,
    tax_amount: Decimal,
    shipping_amount: Decimal,
    total_amount: Decimal,
    billing_first_name: String,
    billing_last_name: String,
    billing_email: String,
    billing_phone: String,
    billing_address_line1: String,
    billing_city: String,
    billing_postal_code: String,
    billing_country: String,
    stripe_payment_intent_id: Option<String>,
    stripe_session_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
        })?;
        let payment_status: PaymentStatus = row.payment_status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid payment status in database: {e}"))
        })?;
        let email = Email::parse(&row.billing_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid billing email in database: {e}"))
        })?;

        let currency = CurrencyCode::default();
        Ok(Self {
            id: OrderId::new(row.id),
            order_number: row.order_number,
            user_id: UserId::new(row.user_id),
            status,
            payment_status,
            subtotal: Money::new(row.subtotal, currency),
            tax_amount: Money::new(row.tax_amount, currency),
            shipping_amount: Money::new(row.shipping_amount, currency),
            total_amount: Money::new(row.total_amount, currency),
            billing: BillingDetails {
                first_name: row.billing_first_name,
                last_name: row.billing_last_name,
                email,
                phone: row.billing_phone,
                address_line1: row.billing_address_line1,
                city: row.billing_city,
                postal_code: row.billing_postal_code,
                country: row.billing_country,
            },
            stripe_payment_intent_id: row.stripe_payment_intent_id,
            stripe_session_id: row.stripe_session_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: Uuid,
    product_id: i32,
    product_name: String,
    product_sku: String,
    unit_price: Decimal,
    quantity: i32,
    total_price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .map_err(|_| RepositoryError::DataCorruption("negative order quantity".to_owned()))?;
        let currency = CurrencyCode::default();

        Ok(Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            product_sku: row.product_sku,
            unit_price: Money::new(row.unit_price, currency),
            quantity,
            total_price: Money::new(row.total_price, currency),
        })
    }
}

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, payment_status, subtotal, \
     tax_amount, shipping_amount, total_amount, billing_first_name, billing_last_name, \
     billing_email, billing_phone, billing_address_line1, billing_city, \
     billing_postal_code, billing_country, stripe_payment_intent_id, stripe_session_id, \
     created_at, updated_at";

// =============================================================================
// Write Parameters
// =============================================================================

/// Fields for creating an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub total_amount: Money,
    pub billing: BillingDetails,
    pub stripe_payment_intent_id: Option<String>,
    pub stripe_session_id: Option<String>,
}

/// A line to attach to a new order (product snapshot).
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_sku: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub total_price: Money,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an order with its lines in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails. Order
    /// number collisions are retried once before surfacing as `Conflict`.
    pub async fn create_with_items(
        &self,
        new: &NewOrder,
        items: &[NewOrderItem],
    ) -> Result<Order, RepositoryError> {
        for attempt in 0..2 {
            let order_number = generate_order_number(Utc::now());
            match self.try_create(new, items, &order_number).await {
                Err(RepositoryError::Conflict(_)) if attempt == 0 => {}
                other => return other,
            }
        }
        Err(RepositoryError::Conflict(
            "could not allocate a unique order number".to_owned(),
        ))
    }

    async fn try_create(
        &self,
        new: &NewOrder,
        items: &[NewOrderItem],
        order_number: &str,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders
                 (id, order_number, user_id, status, payment_status, subtotal,
                  tax_amount, shipping_amount, total_amount, billing_first_name,
                  billing_last_name, billing_email, billing_phone,
                  billing_address_line1, billing_city, billing_postal_code,
                  billing_country, stripe_payment_intent_id, stripe_session_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                     $11, $12, $13, $14, $15, $16, $17, $18, $19)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(order_number)
        .bind(new.user_id.as_i32())
        .bind(new.status.to_string())
        .bind(new.payment_status.to_string())
        .bind(new.subtotal.amount)
        .bind(new.tax_amount.amount)
        .bind(new.shipping_amount.amount)
        .bind(new.total_amount.amount)
        .bind(&new.billing.first_name)
        .bind(&new.billing.last_name)
        .bind(new.billing.email.as_str())
        .bind(&new.billing.phone)
        .bind(&new.billing.address_line1)
        .bind(&new.billing.city)
        .bind(&new.billing.postal_code)
        .bind(&new.billing.country)
        .bind(&new.stripe_payment_intent_id)
        .bind(&new.stripe_session_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| super::map_unique_violation(e, "order number collision"))?;

        for item in items {
            sqlx::query(
                "INSERT INTO order_items
                     (order_id, product_id, product_name, product_sku,
                      unit_price, quantity, total_price)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(row.id)
            .bind(item.product_id.as_i32())
            .bind(&item.product_name)
            .bind(&item.product_sku)
            .bind(item.unit_price.amount)
            .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX))
            .bind(item.total_price.amount)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        row.try_into()
    }

    /// Find an order by the payment provider's payment intent reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE stripe_payment_intent_id = $1"
        ))
        .bind(payment_intent_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an order scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(order_id.as_uuid())
        .bind(user_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// List every order, newest first (admin view).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get the lines of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, product_name, product_sku,
                    unit_price, quantity, total_price
             FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id.as_uuid())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Update payment and order status for the order referencing a payment
    /// intent (webhook path).
    ///
    /// # Returns
    ///
    /// Returns `true` if an order was updated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_payment_status(
        &self,
        payment_intent_id: &str,
        payment_status: PaymentStatus,
        status: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET payment_status = $2, status = $3, updated_at = NOW()
             WHERE stripe_payment_intent_id = $1",
        )
        .bind(payment_intent_id)
        .bind(payment_status.to_string())
        .bind(status.to_string())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Update an order's lifecycle status (admin path).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn set_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(order_id.as_uuid())
        .bind(status.to_string())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
