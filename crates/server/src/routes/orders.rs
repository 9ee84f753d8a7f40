//! Public order summary endpoint, used by the checkout result pages.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use dele_dzina_core::{OrderId, OrderStatus};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::AppError;
use crate::orders::{self, Order};
use crate::state::AppState;

/// What the success and cancel pages are allowed to see. No line items,
/// no customer email, no note, no Stripe identifiers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: OrderId,
    pub status: OrderStatus,
    pub currency: String,
    pub subtotal: Decimal,
    pub item_count: u32,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<Order> for OrderSummary {
    fn from(order: Order) -> Self {
        Self {
            item_count: order.item_count(),
            id: order.id,
            status: order.status,
            currency: order.currency,
            subtotal: order.subtotal,
            created_at: order.created_at,
            paid_at: order.paid_at,
        }
    }
}

/// Look up a public order summary by id.
pub async fn summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderSummary>, AppError> {
    let order_id: OrderId = id
        .parse()
        .map_err(|_| AppError::NotFound(format!("order {id}")))?;

    let order = orders::find_order(state.store(), order_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    Ok(Json(order.into()))
}
