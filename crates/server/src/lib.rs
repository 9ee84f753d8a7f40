//! Délé Dzina storefront server library.
//!
//! This crate provides the server functionality as a library, allowing the
//! router and the order pipeline to be exercised from integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod checkout;
pub mod config;
pub mod content;
pub mod error;
pub mod events;
pub mod middleware;
pub mod newsletter;
pub mod orders;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use axum::Router;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::state::AppState;

/// Build the full application router: the JSON API under `/api` and the
/// static storefront assets at the root.
pub fn app(state: AppState) -> Router {
    let site_dir = state.config().site_dir.clone();

    Router::new()
        .nest("/api", routes::routes())
        .fallback_service(ServeDir::new(site_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
