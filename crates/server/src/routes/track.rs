//! Analytics event ingestion endpoint.

use axum::{Json, extract::State, http::HeaderMap};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::AppError;
use crate::events;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPayload {
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub props: Option<Value>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub referrer: String,
}

/// Record one client-side event, if its name is on the allow-list.
/// Names are matched case-insensitively and stored lowercased.
pub async fn record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TrackPayload>,
) -> Result<Json<Value>, AppError> {
    let name = payload.event_name.trim().to_lowercase();
    if !events::is_trackable(&name) {
        return Err(AppError::BadRequest("Unknown event".to_string()));
    }

    let props = events::sanitize_props(payload.props.as_ref());
    let meta = super::request_meta(&headers, &payload.path, &payload.referrer);
    events::append_event(state.store(), &name, props, Some(&meta)).await?;

    Ok(Json(json!({ "ok": true })))
}
