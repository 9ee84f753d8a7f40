//! Token-gated admin endpoints.

use axum::{
    Json,
    extract::{Path, State},
};
use dele_dzina_core::{OrderId, OrderStatus};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::instrument;

use crate::catalog::{self, RawProduct};
use crate::content;
use crate::error::AppError;
use crate::events::EventsDoc;
use crate::middleware::auth::RequireAdminToken;
use crate::newsletter;
use crate::orders;
use crate::state::AppState;
use crate::store::DocKey;

/// Statuses that count toward recognized revenue.
fn is_revenue(status: OrderStatus) -> bool {
    !matches!(
        status,
        OrderStatus::CheckoutPending | OrderStatus::Cancelled
    )
}

/// Everything the admin panel needs to render its dashboard: the full
/// catalog, the ledger, the site document, plus a few counters.
pub async fn overview(_auth: RequireAdminToken, State(state): State<AppState>) -> Json<Value> {
    let all_orders = orders::list_orders(state.store()).await;
    let revenue: Decimal = all_orders
        .iter()
        .filter(|order| is_revenue(order.status))
        .map(|order| order.subtotal)
        .sum();
    let subscribers = newsletter::subscriber_count(state.store()).await;
    let events: EventsDoc = state.store().read(DocKey::Events).await;
    let products = catalog::read_products(state.store()).await;
    let site = content::read_site(state.store()).await;

    Json(json!({
        "products": products,
        "orders": all_orders,
        "site": site,
        "revenue": revenue,
        "subscribers": subscribers,
        "eventsCount": events.events.len(),
    }))
}

/// Full order ledger, newest first.
pub async fn orders(_auth: RequireAdminToken, State(state): State<AppState>) -> Json<Value> {
    let all_orders = orders::list_orders(state.store()).await;
    Json(json!({ "orders": all_orders }))
}

#[derive(Debug, Deserialize)]
pub struct OrderUpdatePayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Update an order's status and/or fulfilment note.
///
/// A status change to a customer-visible state triggers a notification
/// email; re-saving the same status does not.
#[instrument(skip(state, payload), fields(order_id = %id))]
pub async fn update_order(
    _auth: RequireAdminToken,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<OrderUpdatePayload>,
) -> Result<Json<Value>, AppError> {
    let order_id: OrderId = id
        .parse()
        .map_err(|_| AppError::NotFound(format!("order {id}")))?;

    let status = payload
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(|_| AppError::BadRequest("Unknown order status".to_string()))?;

    let updated = orders::admin_update(state.store(), order_id, status, payload.note.as_deref())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    let status_changed = updated.order.status != updated.previous_status;
    if status_changed && updated.order.status.notifies_customer() {
        if let Some(mailer) = state.mailer() {
            mailer.notify_status(&updated.order).await;
        }
    }

    tracing::info!(
        status = %updated.order.status,
        changed = status_changed,
        "order updated"
    );

    Ok(Json(json!({ "order": updated.order })))
}

#[derive(Debug, Deserialize)]
pub struct ProductsPayload {
    #[serde(default)]
    pub items: Vec<RawProduct>,
}

/// Replace the product catalog with a normalized version of `items`.
pub async fn replace_products(
    _auth: RequireAdminToken,
    State(state): State<AppState>,
    Json(payload): Json<ProductsPayload>,
) -> Result<Json<Value>, AppError> {
    let items = catalog::replace_products(state.store(), &payload.items).await?;
    tracing::info!(count = items.len(), "product catalog replaced");
    Ok(Json(json!({ "ok": true, "items": items })))
}

/// Merge incoming site content fields over the stored document.
pub async fn replace_site(
    _auth: RequireAdminToken,
    State(state): State<AppState>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<content::SiteDoc>, AppError> {
    let updated = content::replace_site(state.store(), payload).await?;
    tracing::info!("site content updated");
    Ok(Json(updated))
}
