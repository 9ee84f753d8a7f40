//! Stripe hosted-checkout client and webhook signature verification.

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::config::StripeConfig;
use crate::orders::Order;

const CHECKOUT_SESSIONS_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

/// Maximum accepted age of a webhook signature timestamp, in seconds.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("Stripe request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Stripe session response has no redirect URL")]
    MissingRedirectUrl,
    #[error("Order line '{title}' has an amount Stripe cannot represent")]
    Amount { title: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Malformed stripe-signature header")]
    MalformedHeader,
    #[error("Webhook signature timestamp outside tolerance")]
    Expired,
    #[error("Webhook signature mismatch")]
    Mismatch,
}

/// A created checkout session, as much of it as the storefront needs.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Client for the Stripe Checkout Sessions API.
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    config: StripeConfig,
}

impl StripeClient {
    #[must_use]
    pub fn new(config: StripeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Whether webhook delivery can be verified.
    #[must_use]
    pub fn has_webhook_secret(&self) -> bool {
        self.config.webhook_secret.is_some()
    }

    /// Create a hosted checkout session for a pending order.
    ///
    /// The order id travels in `metadata[orderId]` and in the success and
    /// cancel redirect URLs, so the webhook and the browser can both find
    /// their way back to the ledger entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, Stripe rejects it, or the
    /// response carries no redirect URL.
    pub async fn create_checkout_session(
        &self,
        order: &Order,
        base_url: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let form = session_form(order, base_url)?;

        let response = self
            .http
            .post(CHECKOUT_SESSIONS_URL)
            .bearer_auth(self.config.secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = response.json().await?;
        let url = session.url.ok_or(StripeError::MissingRedirectUrl)?;
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    /// Verify a `stripe-signature` header against the raw request body.
    ///
    /// # Errors
    ///
    /// Returns an error if no webhook secret is configured, the header is
    /// malformed, the timestamp is outside tolerance, or no `v1` signature
    /// matches.
    pub fn verify_webhook(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        let secret = self
            .config
            .webhook_secret
            .as_ref()
            .ok_or(SignatureError::Mismatch)?;
        verify_signature(
            payload,
            header,
            secret.expose_secret(),
            chrono::Utc::now().timestamp(),
        )
    }
}

fn session_form(order: &Order, base_url: &str) -> Result<Vec<(String, String)>, StripeError> {
    let order_id = order.id.to_string();
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("allow_promotion_codes".to_string(), "true".to_string()),
        (
            "success_url".to_string(),
            format!(
                "{base_url}/checkout-success.html?order_id={order_id}&session_id={{CHECKOUT_SESSION_ID}}"
            ),
        ),
        (
            "cancel_url".to_string(),
            format!("{base_url}/checkout-cancel.html?order_id={order_id}"),
        ),
        ("metadata[orderId]".to_string(), order_id),
    ];

    if let Some(email) = &order.customer_email {
        form.push(("customer_email".to_string(), email.as_str().to_string()));
    }

    for (i, item) in order.items.iter().enumerate() {
        let cents = (item.unit_price * Decimal::from(100))
            .round()
            .to_u64()
            .ok_or_else(|| StripeError::Amount {
                title: item.title.clone(),
            })?;

        form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        form.push((
            format!("line_items[{i}][price_data][currency]"),
            order.currency.to_lowercase(),
        ));
        form.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            cents.to_string(),
        ));
        form.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            item.title.clone(),
        ));
        // Stripe rejects relative image paths, so only pass absolute URLs.
        if item.image.starts_with("http://") || item.image.starts_with("https://") {
            form.push((
                format!("line_items[{i}][price_data][product_data][images][0]"),
                item.image.clone(),
            ));
        }
    }

    Ok(form)
}

/// Check a `t=...,v1=...` signature header against `payload`.
///
/// The signed message is `{t}.{payload}` under HMAC-SHA256. Any of the
/// `v1` entries may match. Comparison is constant time.
///
/// # Errors
///
/// Returns an error when the header cannot be parsed, the timestamp is
/// more than five minutes from `now`, or no signature matches.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse().map_err(|_| SignatureError::MalformedHeader)?);
            }
            Some(("v1", value)) => {
                signatures.push(hex::decode(value).map_err(|_| SignatureError::MalformedHeader)?);
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    for signature in &signatures {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| SignatureError::MalformedHeader)?;
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        if mac.verify_slice(signature).is_ok() {
            return Ok(());
        }
    }

    Err(SignatureError::Mismatch)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dele_dzina_core::{OrderId, OrderStatus};
    use crate::orders::OrderItem;

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn order_with_items(items: Vec<OrderItem>) -> Order {
        let now = chrono::Utc::now();
        Order {
            id: OrderId::generate(),
            status: OrderStatus::CheckoutPending,
            currency: "EUR".to_string(),
            subtotal: items.iter().map(|i| i.unit_price * Decimal::from(i.quantity)).sum(),
            items,
            customer_email: Some("anna@example.com".parse().unwrap()),
            stripe_session_id: None,
            stripe_payment_intent_id: None,
            note: String::new(),
            created_at: now,
            updated_at: now,
            paid_at: None,
        }
    }

    fn item(title: &str, unit_price: &str, image: &str) -> OrderItem {
        OrderItem {
            id: "p1".to_string(),
            title: title.to_string(),
            quantity: 2,
            unit_price: unit_price.parse().unwrap(),
            image: image.to_string(),
        }
    }

    #[test]
    fn test_verify_signature_accepts_valid() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(payload, "whsec_test", 1_700_000_000);
        assert_eq!(
            verify_signature(payload, &header, "whsec_test", 1_700_000_010),
            Ok(())
        );
    }

    #[test]
    fn test_verify_signature_rejects_tampered_payload() {
        let header = sign(b"original", "whsec_test", 1_700_000_000);
        assert_eq!(
            verify_signature(b"tampered", &header, "whsec_test", 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_verify_signature_rejects_wrong_secret() {
        let payload = b"payload";
        let header = sign(payload, "whsec_a", 1_700_000_000);
        assert_eq!(
            verify_signature(payload, &header, "whsec_b", 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_verify_signature_rejects_stale_timestamp() {
        let payload = b"payload";
        let header = sign(payload, "whsec_test", 1_700_000_000);
        assert_eq!(
            verify_signature(payload, &header, "whsec_test", 1_700_000_000 + 301),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn test_verify_signature_rejects_malformed_header() {
        assert_eq!(
            verify_signature(b"payload", "nonsense", "whsec_test", 0),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            verify_signature(b"payload", "t=abc,v1=00", "whsec_test", 0),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            verify_signature(b"payload", "t=1700000000", "whsec_test", 1_700_000_000),
            Err(SignatureError::MalformedHeader)
        );
    }

    #[test]
    fn test_verify_signature_accepts_any_matching_v1() {
        let payload = b"payload";
        let valid = sign(payload, "whsec_test", 1_700_000_000);
        let valid_sig = valid.split("v1=").nth(1).unwrap();
        let header = format!("t=1700000000,v1={},v1={valid_sig}", "00".repeat(32));
        assert_eq!(
            verify_signature(payload, &header, "whsec_test", 1_700_000_000),
            Ok(())
        );
    }

    #[test]
    fn test_session_form_amounts_in_cents() {
        let order = order_with_items(vec![item("Pull Premium", "49.90", "")]);
        let form = session_form(&order, "https://deledzina.shop").unwrap();

        let amount = form
            .iter()
            .find(|(k, _)| k == "line_items[0][price_data][unit_amount]")
            .map(|(_, v)| v.as_str());
        assert_eq!(amount, Some("4990"));

        let currency = form
            .iter()
            .find(|(k, _)| k == "line_items[0][price_data][currency]")
            .map(|(_, v)| v.as_str());
        assert_eq!(currency, Some("eur"));
    }

    #[test]
    fn test_session_form_redirects_carry_order_id() {
        let order = order_with_items(vec![item("Pull Premium", "49.90", "")]);
        let id = order.id.to_string();
        let form = session_form(&order, "https://deledzina.shop").unwrap();

        let success = form
            .iter()
            .find(|(k, _)| k == "success_url")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert_eq!(
            success,
            format!(
                "https://deledzina.shop/checkout-success.html?order_id={id}&session_id={{CHECKOUT_SESSION_ID}}"
            )
        );

        let metadata = form
            .iter()
            .find(|(k, _)| k == "metadata[orderId]")
            .map(|(_, v)| v.clone());
        assert_eq!(metadata, Some(id));
    }

    #[test]
    fn test_session_form_skips_relative_images() {
        let order = order_with_items(vec![
            item("A", "10.00", "/images/a.jpg"),
            item("B", "10.00", "https://cdn.example.com/b.jpg"),
        ]);
        let form = session_form(&order, "https://deledzina.shop").unwrap();

        assert!(!form
            .iter()
            .any(|(k, _)| k == "line_items[0][price_data][product_data][images][0]"));
        assert!(form
            .iter()
            .any(|(k, v)| k == "line_items[1][price_data][product_data][images][0]"
                && v == "https://cdn.example.com/b.jpg"));
    }
}
