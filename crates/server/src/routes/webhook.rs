//! Stripe webhook endpoint.
//!
//! Signature verification runs over the raw request body, so this handler
//! takes `Bytes` rather than a typed extractor. Replayed deliveries are
//! absorbed by the ledger's paid-status guard.

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use dele_dzina_core::OrderId;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::instrument;

use crate::error::AppError;
use crate::events;
use crate::orders;
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: SessionObject,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    // string id normally, expanded object when the endpoint requests it
    #[serde(default)]
    payment_intent: Option<Value>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl SessionObject {
    fn payment_intent_id(&self) -> Option<&str> {
        match self.payment_intent.as_ref()? {
            Value::String(id) => Some(id),
            Value::Object(obj) => obj.get("id").and_then(Value::as_str),
            _ => None,
        }
    }

    fn order_id(&self) -> Option<OrderId> {
        self.metadata
            .get("orderId")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
    }
}

/// Receive and reconcile a Stripe webhook delivery.
///
/// Unverifiable deliveries are rejected with 400 so Stripe retries them.
/// Verified events the server does not act on still get 200, otherwise
/// Stripe would retry them forever.
#[instrument(skip_all)]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let stripe = state
        .stripe()
        .filter(|client| client.has_webhook_secret())
        .ok_or_else(|| AppError::BadRequest("Webhook signing is not configured".to_string()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing stripe-signature header".to_string()))?;

    stripe
        .verify_webhook(&body, signature)
        .map_err(|err| AppError::BadRequest(err.to_string()))?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest("Malformed webhook payload".to_string()))?;

    if event.kind == "checkout.session.completed" {
        reconcile_completed_session(&state, &event.data.object).await?;
    } else {
        tracing::debug!(kind = %event.kind, "ignoring webhook event");
    }

    Ok(Json(json!({ "received": true })))
}

async fn reconcile_completed_session(
    state: &AppState,
    session: &SessionObject,
) -> Result<(), AppError> {
    let Some(order_id) = session.order_id() else {
        tracing::warn!(session_id = %session.id, "completed session carries no order id");
        return Ok(());
    };

    let paid = orders::mark_paid(
        state.store(),
        order_id,
        session.payment_intent_id(),
        Some(&session.id),
    )
    .await?;

    let Some(order) = paid else {
        // unknown order or a replayed delivery; both are no-ops
        tracing::info!(order_id = %order_id, "webhook delivery did not change the ledger");
        return Ok(());
    };

    tracing::info!(order_id = %order_id, "order marked paid");

    let mut props = Map::new();
    props.insert("orderId".to_string(), json!(order.id));
    props.insert("source".to_string(), json!("stripe_webhook"));
    #[allow(clippy::cast_precision_loss)]
    let value = session.amount_total.map_or_else(
        || rust_decimal::prelude::ToPrimitive::to_f64(&order.subtotal),
        |cents| Some(cents as f64 / 100.0),
    );
    if let Some(value) = value {
        props.insert("value".to_string(), json!(value));
    }
    let currency = session
        .currency
        .clone()
        .unwrap_or_else(|| order.currency.to_lowercase());
    props.insert("currency".to_string(), json!(currency));
    if let Err(err) = events::append_event(state.store(), "purchase", props, None).await {
        tracing::warn!(error = %err, "failed to record purchase event");
    }

    if let Some(mailer) = state.mailer() {
        mailer.notify_status(&order).await;
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_object_parses_string_payment_intent() {
        let session: SessionObject = serde_json::from_value(json!({
            "id": "cs_test_123",
            "payment_intent": "pi_456",
            "metadata": { "orderId": "8f14e45f-ceea-4f3a-9c6b-1a2b3c4d5e6f" }
        }))
        .unwrap();

        assert_eq!(session.payment_intent_id(), Some("pi_456"));
        assert!(session.order_id().is_some());
    }

    #[test]
    fn test_session_object_parses_expanded_payment_intent() {
        let session: SessionObject = serde_json::from_value(json!({
            "id": "cs_test_123",
            "payment_intent": { "id": "pi_456", "status": "succeeded" }
        }))
        .unwrap();

        assert_eq!(session.payment_intent_id(), Some("pi_456"));
        assert!(session.order_id().is_none());
    }

    #[test]
    fn test_session_object_tolerates_missing_fields() {
        let session: SessionObject =
            serde_json::from_value(json!({ "id": "cs_test_123" })).unwrap();
        assert_eq!(session.payment_intent_id(), None);
        assert!(session.order_id().is_none());
    }
}
