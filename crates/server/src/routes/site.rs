//! Public site content endpoint.

use axum::{Json, extract::State};

use crate::content::{self, SiteDoc};
use crate::state::AppState;

/// Return the editable site content document.
pub async fn show(State(state): State<AppState>) -> Json<SiteDoc> {
    Json(content::read_site(state.store()).await)
}
