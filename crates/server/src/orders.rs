//! Order ledger.
//!
//! Orders live newest-first in a single JSON document. Records are only
//! ever appended or updated in place, never deleted - a cancelled checkout
//! stays on the ledger for audit. The wire format keeps the historical
//! camelCase keys so existing data files load unchanged.

use chrono::{DateTime, Utc};
use dele_dzina_core::{Email, OrderId, OrderStatus, sanitize_text};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::store::{DocKey, JsonStore, StoreError};

/// Maximum length of an admin/order note.
pub const MAX_NOTE_LEN: usize = 280;

/// The persisted order ledger (`orders.json`).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OrdersDoc {
    #[serde(default)]
    pub orders: Vec<Order>,
}

/// One order record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub currency: String,
    /// Fixed at creation from catalog prices at that instant; never
    /// recomputed afterwards.
    pub subtotal: Decimal,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub customer_email: Option<Email>,
    #[serde(default)]
    pub stripe_session_id: Option<String>,
    #[serde(default)]
    pub stripe_payment_intent_id: Option<String>,
    #[serde(default)]
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Total quantity across all line items.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// One order line, priced at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub image: String,
}

/// Outcome of an admin-driven order update.
#[derive(Debug, Clone)]
pub struct AdminUpdate {
    pub order: Order,
    pub previous_status: OrderStatus,
}

/// Read the full ledger, newest first.
pub async fn list_orders(store: &JsonStore) -> Vec<Order> {
    let doc: OrdersDoc = store.read(DocKey::Orders).await;
    doc.orders
}

/// Find one order by id.
pub async fn find_order(store: &JsonStore, id: OrderId) -> Option<Order> {
    list_orders(store)
        .await
        .into_iter()
        .find(|order| order.id == id)
}

/// Prepend a freshly created pending order to the ledger.
///
/// # Errors
///
/// Returns an error if the ledger cannot be written.
pub async fn push_pending(store: &JsonStore, order: Order) -> Result<(), StoreError> {
    store
        .update(DocKey::Orders, |doc: &mut OrdersDoc| {
            doc.orders.insert(0, order);
        })
        .await
}

/// Record the hosted-checkout session reference on a pending order.
///
/// # Errors
///
/// Returns an error if the ledger cannot be written.
pub async fn set_session_id(
    store: &JsonStore,
    id: OrderId,
    session_id: &str,
) -> Result<(), StoreError> {
    store
        .update(DocKey::Orders, |doc: &mut OrdersDoc| {
            if let Some(order) = doc.orders.iter_mut().find(|order| order.id == id) {
                order.stripe_session_id = Some(session_id.to_string());
                order.updated_at = Utc::now();
            }
        })
        .await
}

/// Mark an order cancelled after a failed checkout-session creation.
///
/// The record is retained for audit; the note is truncated and stripped of
/// control characters.
///
/// # Errors
///
/// Returns an error if the ledger cannot be written.
pub async fn mark_cancelled(store: &JsonStore, id: OrderId, note: &str) -> Result<(), StoreError> {
    let note = sanitize_text(note, 180);
    store
        .update(DocKey::Orders, move |doc: &mut OrdersDoc| {
            if let Some(order) = doc.orders.iter_mut().find(|order| order.id == id) {
                order.status = OrderStatus::Cancelled;
                order.note = note;
                order.updated_at = Utc::now();
            }
        })
        .await
}

/// Transition an order to `paid` from a verified payment-completed event.
///
/// Returns the updated order only when a transition actually happened.
/// Unknown ids and orders that are already `paid` return `None`, which is
/// what makes webhook replays harmless: the caller sends notifications and
/// tracking events only for `Some`.
///
/// # Errors
///
/// Returns an error if the ledger cannot be written.
pub async fn mark_paid(
    store: &JsonStore,
    id: OrderId,
    payment_intent_id: Option<&str>,
    session_id: Option<&str>,
) -> Result<Option<Order>, StoreError> {
    store
        .update(DocKey::Orders, |doc: &mut OrdersDoc| {
            let order = doc.orders.iter_mut().find(|order| order.id == id)?;
            if order.status == OrderStatus::Paid {
                return None;
            }

            let now = Utc::now();
            order.status = OrderStatus::Paid;
            order.stripe_payment_intent_id = payment_intent_id.map(ToOwned::to_owned);
            if let Some(session_id) = session_id {
                order.stripe_session_id = Some(session_id.to_string());
            }
            order.paid_at = Some(now);
            order.updated_at = now;
            Some(order.clone())
        })
        .await
}

/// Apply an admin-driven status/note update.
///
/// Any status in the enum may overwrite any other; that unconstrained
/// override is a documented administrative decision. Returns `None` when
/// the order id is unknown.
///
/// # Errors
///
/// Returns an error if the ledger cannot be written.
pub async fn admin_update(
    store: &JsonStore,
    id: OrderId,
    status: Option<OrderStatus>,
    note: Option<&str>,
) -> Result<Option<AdminUpdate>, StoreError> {
    let note = note.map(|n| sanitize_text(n, MAX_NOTE_LEN));
    store
        .update(DocKey::Orders, move |doc: &mut OrdersDoc| {
            let order = doc.orders.iter_mut().find(|order| order.id == id)?;
            let previous_status = order.status;

            if let Some(status) = status {
                order.status = status;
            }
            if let Some(note) = note {
                order.note = note;
            }
            order.updated_at = Utc::now();

            Some(AdminUpdate {
                order: order.clone(),
                previous_status,
            })
        })
        .await
}
