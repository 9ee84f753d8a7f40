//! Public product catalog endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::catalog;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default)]
    pub include_inactive: Option<String>,
}

/// Return the normalized product catalog.
///
/// Only active products by default; the admin panel passes
/// `?includeInactive=1` to edit the full catalog.
pub async fn list(State(state): State<AppState>, Query(params): Query<ListParams>) -> Json<Value> {
    let mut items = catalog::read_products(state.store()).await;
    if params.include_inactive.as_deref() != Some("1") {
        items.retain(|product| product.active);
    }
    Json(json!({ "items": items }))
}
