//! Tracked analytics events.
//!
//! Events are append-only, newest first, and the document is capped at the
//! 5000 most recent entries. Event names come from a fixed allow-list and
//! props are a shallow, sanitized string/number/bool map - nothing nested
//! ever reaches disk. Requests are identified only by a truncated hash of
//! ip + user agent.

use chrono::{DateTime, Utc};
use dele_dzina_core::sanitize_text;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::store::{DocKey, JsonStore, StoreError};

/// Event names accepted from the public track endpoint.
pub const TRACKABLE_EVENTS: &[&str] = &[
    "page_view",
    "add_to_cart",
    "remove_from_cart",
    "begin_checkout",
    "checkout_error",
    "purchase",
    "newsletter_signup",
];

/// Cap on retained events; older entries are evicted.
pub const MAX_EVENTS: usize = 5000;

/// Cap on props per event.
pub const MAX_PROPS: usize = 20;

/// The persisted events document (`events.json`).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EventsDoc {
    #[serde(default)]
    pub events: Vec<TrackedEvent>,
}

/// One tracked event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEvent {
    pub id: Uuid,
    pub event_name: String,
    #[serde(default)]
    pub props: Map<String, Value>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub referrer: String,
    pub user_agent_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Request context attached to client-originated events.
///
/// Server-originated events (webhook bookkeeping) have no meta and hash to
/// the literal `"system"`.
#[derive(Debug, Default, Clone)]
pub struct RequestMeta {
    pub path: String,
    pub referrer: String,
    pub ip: String,
    pub user_agent: String,
}

impl RequestMeta {
    /// Truncated SHA-256 over `ip::user_agent`; enough to correlate a
    /// session without storing either value.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(format!("{}::{}", self.ip, self.user_agent).as_bytes());
        let mut hash = hex::encode(digest);
        hash.truncate(16);
        hash
    }
}

/// Whether `name` is on the tracking allow-list.
#[must_use]
pub fn is_trackable(name: &str) -> bool {
    TRACKABLE_EVENTS.contains(&name)
}

/// Reduce arbitrary client props to a shallow sanitized map.
///
/// Keeps at most [`MAX_PROPS`] entries; keys are capped at 40 chars,
/// string values at 160, numbers rounded to 4 decimal places, booleans
/// passed through. Everything else (null, arrays, objects) is dropped.
#[must_use]
pub fn sanitize_props(input: Option<&Value>) -> Map<String, Value> {
    let mut result = Map::new();
    let Some(Value::Object(entries)) = input else {
        return result;
    };

    for (key, value) in entries.iter().take(MAX_PROPS) {
        let safe_key = sanitize_text(key, 40);
        if safe_key.is_empty() {
            continue;
        }

        let safe_value = match value {
            Value::Number(n) => n
                .as_f64()
                .filter(|v| v.is_finite())
                .and_then(|v| serde_json::Number::from_f64((v * 10_000.0).round() / 10_000.0))
                .map(Value::Number),
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) => Some(Value::String(sanitize_text(s, 160))),
            _ => None,
        };

        if let Some(safe_value) = safe_value {
            result.insert(safe_key, safe_value);
        }
    }

    result
}

/// Append one event, evicting the oldest entries past [`MAX_EVENTS`].
///
/// # Errors
///
/// Returns an error if the events document cannot be written.
pub async fn append_event(
    store: &JsonStore,
    event_name: &str,
    props: Map<String, Value>,
    meta: Option<&RequestMeta>,
) -> Result<(), StoreError> {
    let event = TrackedEvent {
        id: Uuid::new_v4(),
        event_name: sanitize_text(event_name, 40),
        props,
        path: meta.map_or_else(String::new, |m| sanitize_text(&m.path, 160)),
        referrer: meta.map_or_else(String::new, |m| sanitize_text(&m.referrer, 200)),
        user_agent_hash: meta.map_or_else(|| "system".to_string(), RequestMeta::fingerprint),
        created_at: Utc::now(),
    };

    store
        .update(DocKey::Events, |doc: &mut EventsDoc| {
            push_capped(doc, event, MAX_EVENTS);
        })
        .await
}

fn push_capped(doc: &mut EventsDoc, event: TrackedEvent, cap: usize) {
    doc.events.insert(0, event);
    doc.events.truncate(cap);
}
