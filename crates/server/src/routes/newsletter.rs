//! Newsletter subscription endpoint.

use axum::{Json, extract::State, http::HeaderMap};
use dele_dzina_core::Email;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::instrument;

use crate::error::AppError;
use crate::events;
use crate::newsletter::{self, SubscribeOutcome};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscribePayload {
    #[serde(default)]
    pub email: String,
}

/// Subscribe an email address to the newsletter.
///
/// Duplicates are reported as success so the form never leaks whether an
/// address is already on the list. Only a first-time signup records a
/// `newsletter_signup` event.
#[instrument(skip(state, headers, payload))]
pub async fn subscribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SubscribePayload>,
) -> Result<Json<Value>, AppError> {
    let normalized = payload.email.trim().to_lowercase();
    let email: Email = normalized
        .parse()
        .map_err(|_| AppError::BadRequest("Please enter a valid email address".to_string()))?;

    let domain = email.domain().to_string();
    let outcome = newsletter::subscribe(state.store(), email).await?;

    if outcome == SubscribeOutcome::Added {
        let mut props = Map::new();
        props.insert("emailDomain".to_string(), json!(domain));
        let meta = super::request_meta(&headers, "/newsletter", "");
        events::append_event(state.store(), "newsletter_signup", props, Some(&meta)).await?;
        tracing::info!("newsletter subscriber added");
    }

    Ok(Json(json!({ "ok": true })))
}
