//! Transactional email for order status changes, via the Resend API.
//!
//! Notifications are best effort. A failed send is logged and the order
//! update proceeds; the ledger is never blocked on the email provider.

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::orders::Order;

const SEND_URL: &str = "https://api.resend.com/emails";

/// Line items shown in the email body before collapsing the rest.
const MAX_BODY_ITEMS: usize = 6;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("email API error ({status}): {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Client for outbound order notifications.
#[derive(Debug, Clone)]
pub struct Mailer {
    http: reqwest::Client,
    config: EmailConfig,
}

impl Mailer {
    #[must_use]
    pub fn new(config: EmailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Send a status notification for `order`, if it carries a customer
    /// email and the status is one customers are told about.
    ///
    /// Failures are logged, never returned.
    pub async fn notify_status(&self, order: &Order) {
        if !order.status.notifies_customer() {
            return;
        }
        let Some(email) = &order.customer_email else {
            return;
        };

        let (subject, body) = compose(order);
        if let Err(err) = self.send(email.as_str(), &subject, &body).await {
            tracing::warn!(
                order_id = %order.id,
                status = %order.status,
                error = %err,
                "order notification email failed"
            );
        } else {
            tracing::info!(order_id = %order.id, status = %order.status, "order notification sent");
        }
    }

    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), EmailError> {
        let response = self
            .http
            .post(SEND_URL)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&OutgoingEmail {
                from: &self.config.from_address,
                to: [to],
                subject,
                text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Build the subject and plain-text body for an order status email.
///
/// The subject carries the status label and the short order reference; the
/// body lists up to [`MAX_BODY_ITEMS`] line items, the total in the shop's
/// locale formatting and the full order id for support lookups.
#[must_use]
pub fn compose(order: &Order) -> (String, String) {
    let short_id = short_id(&order.id.to_string());
    let label = order.status.label();
    let subject = format!("Order {short_id}: {label}");

    let mut lines = vec![
        "Hello,".to_string(),
        String::new(),
        format!("Your order {short_id} is now {label}."),
        String::new(),
    ];

    for item in order.items.iter().take(MAX_BODY_ITEMS) {
        lines.push(format!(
            "- {} x {} ({} €)",
            item.quantity,
            item.title,
            euros(item.unit_price)
        ));
    }
    let hidden = order.items.len().saturating_sub(MAX_BODY_ITEMS);
    if hidden > 0 {
        lines.push(format!("... and {hidden} more items"));
    }

    lines.push(String::new());
    lines.push(format!("Total: {} €", euros(order.subtotal)));
    lines.push(String::new());
    lines.push(format!("Order reference: {}", order.id));
    lines.push(String::new());
    lines.push("Thank you,".to_string());
    lines.push("Délé Dzina".to_string());

    (subject, lines.join("\n"))
}

/// First segment of the order UUID, enough for customer reference.
fn short_id(id: &str) -> String {
    id.split('-').next().unwrap_or(id).to_uppercase()
}

/// Decimal amount in French notation ("99,80").
fn euros(amount: Decimal) -> String {
    format!("{amount:.2}").replace('.', ",")
}
