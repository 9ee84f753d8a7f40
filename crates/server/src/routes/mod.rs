//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /api/health                  - Health check
//! GET  /api/site                    - Editable site content
//! GET  /api/products                - Active product catalog
//! GET  /api/orders/{id}/summary     - Public order summary (success page)
//! POST /api/newsletter              - Newsletter signup
//! POST /api/track                   - Analytics event ingestion
//! POST /api/create-checkout-session - Start a Stripe hosted checkout
//! POST /api/stripe/webhook          - Stripe webhook (signature verified)
//!
//! # Admin (x-admin-token header)
//! GET   /api/admin/overview         - Dashboard counters
//! GET   /api/admin/orders           - Full order ledger
//! PATCH /api/admin/orders/{id}      - Update order status / note
//! PUT   /api/admin/products         - Replace the product catalog
//! PUT   /api/admin/site             - Merge site content fields
//! ```

pub mod admin;
pub mod checkout;
pub mod newsletter;
pub mod orders;
pub mod products;
pub mod site;
pub mod track;
pub mod webhook;

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::{get, patch, post, put},
};
use serde_json::{Value, json};

use crate::events::RequestMeta;
use crate::state::AppState;

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(admin::overview))
        .route("/orders", get(admin::orders))
        .route("/orders/{id}", patch(admin::update_order))
        .route("/products", put(admin::replace_products))
        .route("/site", put(admin::replace_site))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/site", get(site::show))
        .route("/products", get(products::list))
        .route("/orders/{id}/summary", get(orders::summary))
        .route("/newsletter", post(newsletter::subscribe))
        .route("/track", post(track::record))
        .route("/create-checkout-session", post(checkout::create))
        .route("/stripe/webhook", post(webhook::receive))
        .nest("/admin", admin_routes())
}

/// Health check endpoint, including which integrations are configured.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "stripeConfigured": state.config().stripe.is_some(),
        "adminConfigured": true,
        "timestamp": chrono::Utc::now(),
    }))
}

/// Build the request context used to fingerprint analytics events.
///
/// The client address comes from `x-forwarded-for` (first hop) since the
/// server always sits behind a proxy in production.
pub(crate) fn request_meta(headers: &HeaderMap, path: &str, referrer: &str) -> RequestMeta {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map_or_else(|| "unknown".to_string(), |value| value.trim().to_string());
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    RequestMeta {
        path: path.to_string(),
        referrer: referrer.to_string(),
        ip,
        user_agent,
    }
}
