//! Checkout orchestration: cart validation and pending-order creation.
//!
//! The rules here are all-or-nothing: any invalid line aborts the whole
//! request before an order record exists. The pending order is persisted
//! before the hosted-checkout call is attempted, so a crash mid-checkout
//! still leaves an auditable `checkout_pending` record. The Stripe call
//! itself and the follow-up bookkeeping live in the route handler.

use chrono::Utc;
use dele_dzina_core::{Email, OrderId, OrderStatus};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::catalog::Product;
use crate::orders::{Order, OrderItem};

/// Inclusive quantity bounds for one cart line.
pub const MIN_QUANTITY: u32 = 1;
/// Inclusive quantity bounds for one cart line.
pub const MAX_QUANTITY: u32 = 20;

/// One line of the incoming cart payload.
///
/// Quantity arrives as a JSON number; fractional values are rejected during
/// validation rather than silently truncated.
#[derive(Debug, Clone, Deserialize)]
pub struct CartLine {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub quantity: f64,
}

/// Why a checkout request was rejected before any order was created.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("The cart is empty.")]
    EmptyCart,

    #[error("Invalid customer email.")]
    InvalidEmail,

    #[error("Invalid product or quantity.")]
    InvalidLine,

    #[error("Product not found: {id}")]
    UnknownProduct { id: String },

    #[error("Product \"{title}\" has no valid price.")]
    UnpricedProduct { title: String },
}

/// Validate and normalize the optional customer email.
///
/// Blank input means "no email"; present-but-malformed input rejects the
/// request.
///
/// # Errors
///
/// Returns [`CartError::InvalidEmail`] when a non-blank value does not
/// parse.
pub fn parse_customer_email(raw: Option<&str>) -> Result<Option<Email>, CartError> {
    let trimmed = raw.unwrap_or_default().trim().to_lowercase();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Email::parse(&trimmed)
        .map(Some)
        .map_err(|_| CartError::InvalidEmail)
}

/// Validate every cart line against the catalog and price the order lines.
///
/// Each line needs an integer quantity in `[1, 20]` and must reference an
/// existing, active product with a strictly positive price. Any violation
/// aborts the whole cart.
///
/// # Errors
///
/// Returns the first violation found; no partial result is produced.
pub fn validate_cart(lines: &[CartLine], products: &[Product]) -> Result<Vec<OrderItem>, CartError> {
    if lines.is_empty() {
        return Err(CartError::EmptyCart);
    }

    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let quantity = integral_quantity(line.quantity).ok_or(CartError::InvalidLine)?;
        if line.id.is_empty() || !(MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) {
            return Err(CartError::InvalidLine);
        }

        let product = products
            .iter()
            .find(|p| p.id == line.id && p.active)
            .ok_or_else(|| CartError::UnknownProduct {
                id: line.id.clone(),
            })?;

        if product.price <= Decimal::ZERO {
            return Err(CartError::UnpricedProduct {
                title: product.title.clone(),
            });
        }

        items.push(OrderItem {
            id: product.id.clone(),
            title: product.title.clone(),
            quantity,
            unit_price: product.price,
            image: product.image.clone(),
        });
    }

    Ok(items)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // range checked
fn integral_quantity(raw: f64) -> Option<u32> {
    if !raw.is_finite() || raw.fract() != 0.0 || !(0.0..=f64::from(u32::MAX)).contains(&raw) {
        return None;
    }
    Some(raw as u32)
}

/// Exact subtotal over priced lines; no rounding beyond the 2-decimal unit
/// prices themselves.
#[must_use]
pub fn subtotal(items: &[OrderItem]) -> Decimal {
    items
        .iter()
        .map(|item| item.unit_price * Decimal::from(item.quantity))
        .sum()
}

/// Build the pending order that is persisted before the payment call.
#[must_use]
pub fn build_pending_order(items: Vec<OrderItem>, customer_email: Option<Email>) -> Order {
    let now = Utc::now();
    Order {
        id: OrderId::generate(),
        status: OrderStatus::CheckoutPending,
        currency: "EUR".to_string(),
        subtotal: subtotal(&items),
        items,
        customer_email,
        stripe_session_id: None,
        stripe_payment_intent_id: None,
        note: String::new(),
        created_at: now,
        updated_at: now,
        paid_at: None,
    }
}
