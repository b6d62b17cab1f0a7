//! Stripe API request and response types.
//!
//! Requests are flattened into the bracketed form encoding Stripe expects
//! (`line_items[0][price_data][unit_amount]=1999`).

use serde::Deserialize;

/// A line item for a Checkout Session.
#[derive(Debug, Clone)]
pub struct LineItemParams {
    pub name: String,
    pub description: Option<String>,
    /// ISO 4217 lowercase currency code.
    pub currency: String,
    /// Amount in minor units (cents).
    pub unit_amount: i64,
    pub quantity: u32,
}

/// Parameters for creating a Checkout Session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub line_items: Vec<LineItemParams>,
    /// URL Stripe redirects to after payment; may contain the
    /// `{CHECKOUT_SESSION_ID}` placeholder.
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: String,
    /// Opaque metadata echoed back on retrieval and in webhooks.
    pub metadata: Vec<(String, String)>,
}

impl CheckoutSessionParams {
    /// Flatten into form key/value pairs.
    #[must_use]
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_owned(), "payment".to_owned()),
            ("payment_method_types[0]".to_owned(), "card".to_owned()),
            ("success_url".to_owned(), self.success_url.clone()),
            ("cancel_url".to_owned(), self.cancel_url.clone()),
            ("customer_email".to_owned(), self.customer_email.clone()),
        ];

        for (i, item) in self.line_items.iter().enumerate() {
            form.push((
                format!("line_items[{i}][price_data][currency]"),
                item.currency.clone(),
            ));
            form.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                item.name.clone(),
            ));
            if let Some(description) = &item.description
                && !description.is_empty()
            {
                form.push((
                    format!("line_items[{i}][price_data][product_data][description]"),
                    description.clone(),
                ));
            }
            form.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        }

        for (key, value) in &self.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }

        form
    }
}

/// A Checkout Session as returned by Stripe.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted payment page URL; present on freshly created sessions.
    pub url: Option<String>,
    /// "paid", "unpaid", or "no_payment_required".
    pub payment_status: String,
    pub payment_intent: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
}

impl CheckoutSession {
    /// Whether the session completed payment.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

/// Stripe's error envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

/// The object a webhook event refers to.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// ID of the payment intent the event refers to, when present.
    #[must_use]
    pub fn payment_intent_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_form_encoding() {
        let params = CheckoutSessionParams {
            line_items: vec![
                LineItemParams {
                    name: "Compact Unit".to_owned(),
                    description: Some("Personal desalination".to_owned()),
                    currency: "usd".to_owned(),
                    unit_amount: 49_900,
                    quantity: 1,
                },
                LineItemParams {
                    name: "Filter".to_owned(),
                    description: None,
                    currency: "usd".to_owned(),
                    unit_amount: 2_500,
                    quantity: 3,
                },
            ],
            success_url: "https://shop.example/checkout/success?session_id={CHECKOUT_SESSION_ID}"
                .to_owned(),
            cancel_url: "https://shop.example/cart".to_owned(),
            customer_email: "jordan@example.com".to_owned(),
            metadata: vec![("user_id".to_owned(), "42".to_owned())],
        };

        let form = params.to_form();
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("payment_method_types[0]"), Some("card"));
        assert_eq!(
            get("line_items[0][price_data][product_data][name]"),
            Some("Compact Unit")
        );
        assert_eq!(
            get("line_items[0][price_data][unit_amount]"),
            Some("49900")
        );
        assert_eq!(get("line_items[1][quantity]"), Some("3"));
        // No description entry for the second item
        assert_eq!(
            get("line_items[1][price_data][product_data][description]"),
            None
        );
        assert_eq!(get("metadata[user_id]"), Some("42"));
    }

    #[test]
    fn test_checkout_session_deserialization() {
        let json = r#"{
            "id": "cs_test_a1b2c3",
            "object": "checkout.session",
            "url": "https://checkout.stripe.com/c/pay/cs_test_a1b2c3",
            "payment_status": "unpaid",
            "payment_intent": null,
            "amount_total": 52400,
            "currency": "usd"
        }"#;

        let session: CheckoutSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.id, "cs_test_a1b2c3");
        assert!(!session.is_paid());
        assert_eq!(session.amount_total, Some(52_400));
    }

    #[test]
    fn test_event_payment_intent_extraction() {
        let json = r#"{
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_123", "object": "payment_intent" } }
        }"#;

        let event: StripeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.payment_intent_id(), Some("pi_123"));
    }
}
