//! Order status enum.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// The wire representation is the literal snake_case string
/// (`checkout_pending`, `paid`, ...). The intended path is
/// `checkout_pending -> paid -> processing -> shipped -> delivered`, with
/// `cancelled` reachable from anywhere. Admin updates may set any status
/// from any status; that override is deliberate and not validated further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    CheckoutPending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in intended-path order.
    pub const ALL: [Self; 6] = [
        Self::CheckoutPending,
        Self::Paid,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Human label used in customer-facing notifications.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CheckoutPending => "awaiting payment",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether a transition *into* this status notifies the customer.
    ///
    /// Every status except `checkout_pending` qualifies; the pending state
    /// is internal bookkeeping created before the payment redirect.
    #[must_use]
    pub const fn notifies_customer(self) -> bool {
        !matches!(self, Self::CheckoutPending)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CheckoutPending => "checkout_pending",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checkout_pending" => Ok(Self::CheckoutPending),
            "paid" => Ok(Self::Paid),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
