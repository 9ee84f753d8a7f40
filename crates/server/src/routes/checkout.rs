//! Checkout session creation endpoint.

use axum::{Json, extract::State, http::HeaderMap};
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::instrument;

use crate::checkout::{self, CartLine};
use crate::error::AppError;
use crate::events;
use crate::orders::{self, Order};
use crate::services::stripe::StripeError;
use crate::state::AppState;
use dele_dzina_core::sanitize_text;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    #[serde(default)]
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

/// Validate the cart, persist a pending order, and open a Stripe hosted
/// checkout session.
///
/// The pending order is written to the ledger before Stripe is called, so
/// a crash mid-checkout leaves an auditable `checkout_pending` entry
/// rather than a charge with no order. If Stripe rejects the session the
/// order is cancelled in place.
#[instrument(skip(state, headers, payload))]
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CheckoutPayload>,
) -> Result<Json<Value>, AppError> {
    let stripe = state.stripe().ok_or(AppError::PaymentUnavailable)?;

    let email = checkout::parse_customer_email(payload.customer_email.as_deref())?;
    let products = crate::catalog::read_products(state.store()).await;
    let items = checkout::validate_cart(&payload.items, &products)?;
    let order = checkout::build_pending_order(items, email);
    let order_id = order.id;

    orders::push_pending(state.store(), order.clone()).await?;

    match stripe
        .create_checkout_session(&order, &state.config().base_url)
        .await
    {
        Ok(session) => {
            orders::set_session_id(state.store(), order_id, &session.id).await?;
            record_checkout_event(&state, &headers, "begin_checkout", &order, None).await;
            tracing::info!(order_id = %order_id, session_id = %session.id, "checkout session created");

            Ok(Json(json!({
                "id": session.id,
                "url": session.url,
                "orderId": order_id,
            })))
        }
        Err(err) => {
            let note = cancellation_note(&err);
            orders::mark_cancelled(state.store(), order_id, &note).await?;
            record_checkout_event(&state, &headers, "checkout_error", &order, Some(&note)).await;
            Err(err.into())
        }
    }
}

/// Cancellation note recorded on the order when the provider call fails.
/// The ledger truncates it; the full error still goes to the logs.
fn cancellation_note(err: &StripeError) -> String {
    format!("Stripe error: {err}")
}

/// Best-effort event bookkeeping; a failed write never fails the checkout.
async fn record_checkout_event(
    state: &AppState,
    headers: &HeaderMap,
    name: &str,
    order: &Order,
    message: Option<&str>,
) {
    let mut props = Map::new();
    props.insert("orderId".to_string(), json!(order.id));
    props.insert("itemCount".to_string(), json!(order.item_count()));
    props.insert("currency".to_string(), json!(order.currency.to_lowercase()));
    if let Some(value) = order.subtotal.to_f64() {
        props.insert("value".to_string(), json!(value));
    }
    if let Some(message) = message {
        props.insert("message".to_string(), json!(sanitize_text(message, 160)));
    }

    let meta = super::request_meta(headers, "/checkout", "");
    if let Err(err) = events::append_event(state.store(), name, props, Some(&meta)).await {
        tracing::warn!(error = %err, event = name, "failed to record checkout event");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::events::EventsDoc;
    use crate::orders::OrderItem;
    use crate::store::{DocKey, JsonStore};
    use secrecy::SecretString;

    fn test_state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://localhost:3000".to_string(),
            data_dir: dir.path().to_path_buf(),
            site_dir: dir.path().to_path_buf(),
            admin_token: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6"),
            stripe: None,
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
        };
        let store = JsonStore::new(dir.path());
        (dir, AppState::new(config, store))
    }

    fn pending_order() -> Order {
        checkout::build_pending_order(
            vec![OrderItem {
                id: "pull-premium".to_string(),
                title: "Pull Premium".to_string(),
                quantity: 2,
                unit_price: "49.90".parse().unwrap(),
                image: String::new(),
            }],
            None,
        )
    }

    #[test]
    fn test_cancellation_note_carries_provider_message() {
        let err = StripeError::Api {
            status: 402,
            message: "Your card was declined.".to_string(),
        };
        let note = cancellation_note(&err);
        assert!(note.starts_with("Stripe error:"));
        assert!(note.contains("Your card was declined."));
    }

    #[tokio::test]
    async fn test_cancelled_order_keeps_truncated_provider_error() {
        let (_dir, state) = test_state();
        let order = pending_order();
        let order_id = order.id;
        orders::push_pending(state.store(), order).await.unwrap();

        let err = StripeError::Api {
            status: 400,
            message: format!("Invalid currency\u{0}: {}", "x".repeat(300)),
        };
        orders::mark_cancelled(state.store(), order_id, &cancellation_note(&err))
            .await
            .unwrap();

        let stored = orders::find_order(state.store(), order_id).await.unwrap();
        assert!(stored.note.starts_with("Stripe error:"));
        assert!(stored.note.contains("Invalid currency"));
        assert!(stored.note.chars().count() <= 180);
        assert!(!stored.note.contains('\u{0}'));
    }

    #[tokio::test]
    async fn test_checkout_error_event_carries_sanitized_message() {
        let (_dir, state) = test_state();
        let order = pending_order();

        let note = format!("Stripe error: card_declined\u{0} {}", "x".repeat(300));
        record_checkout_event(&state, &HeaderMap::new(), "checkout_error", &order, Some(&note))
            .await;

        let doc: EventsDoc = state.store().read(DocKey::Events).await;
        let event = doc.events.first().unwrap();
        assert_eq!(event.event_name, "checkout_error");

        let message = event.props.get("message").and_then(Value::as_str).unwrap();
        assert!(message.starts_with("Stripe error: card_declined"));
        assert!(message.chars().count() <= 160);
        assert!(!message.contains('\u{0}'));
    }

    #[tokio::test]
    async fn test_begin_checkout_event_props() {
        let (_dir, state) = test_state();
        let order = pending_order();

        record_checkout_event(&state, &HeaderMap::new(), "begin_checkout", &order, None).await;

        let doc: EventsDoc = state.store().read(DocKey::Events).await;
        let event = doc.events.first().unwrap();
        assert_eq!(
            event.props.get("currency").and_then(Value::as_str),
            Some("eur")
        );
        assert_eq!(event.props.get("itemCount"), Some(&json!(2)));
        assert!(!event.props.contains_key("message"));
    }
}
