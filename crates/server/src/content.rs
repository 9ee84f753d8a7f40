//! Editable site content (`site.json`).
//!
//! The document is a flat map of copy fields plus a bounded list of social
//! links. Admin updates are merged over the previous document, so a partial
//! payload never wipes fields it does not mention.

use dele_dzina_core::sanitize_text;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::{DocKey, JsonStore, StoreError};

/// Cap on any single text field.
pub const MAX_FIELD_LEN: usize = 400;

/// Cap on social link entries.
pub const MAX_SOCIALS: usize = 12;

/// The persisted site document. Fields the admin panel never set stay
/// untouched, so the shape is an open map rather than a fixed struct.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteDoc(pub Map<String, Value>);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialLink {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub url: String,
}

/// Merge `incoming` over `previous`, sanitizing every accepted value.
///
/// String fields are control-stripped and capped at [`MAX_FIELD_LEN`].
/// The `socials` field is rebuilt from scratch when present: entries with
/// a blank name are dropped and the list is capped at [`MAX_SOCIALS`].
/// Values of any other shape are ignored and the previous value survives.
#[must_use]
pub fn merge(previous: &SiteDoc, incoming: &Map<String, Value>) -> SiteDoc {
    let mut merged = previous.0.clone();

    for (key, value) in incoming {
        let safe_key = sanitize_text(key, 60);
        if safe_key.is_empty() {
            continue;
        }

        if safe_key == "socials" {
            if let Value::Array(entries) = value {
                merged.insert(safe_key, Value::Array(sanitize_socials(entries)));
            }
            continue;
        }

        if let Value::String(text) = value {
            merged.insert(safe_key, Value::String(sanitize_text(text, MAX_FIELD_LEN)));
        }
    }

    SiteDoc(merged)
}

fn sanitize_socials(entries: &[Value]) -> Vec<Value> {
    entries
        .iter()
        .filter_map(|entry| {
            let link: SocialLink = serde_json::from_value(entry.clone()).ok()?;
            let name = sanitize_text(&link.name, 60);
            if name.is_empty() {
                return None;
            }
            serde_json::to_value(SocialLink {
                name,
                handle: sanitize_text(&link.handle, 80),
                url: sanitize_text(&link.url, 200),
            })
            .ok()
        })
        .take(MAX_SOCIALS)
        .collect()
}

/// Read the current site document.
pub async fn read_site(store: &JsonStore) -> SiteDoc {
    store.read(DocKey::Site).await
}

/// Merge `incoming` into the stored document and return the result.
///
/// # Errors
///
/// Returns an error if the site document cannot be written.
pub async fn replace_site(
    store: &JsonStore,
    incoming: Map<String, Value>,
) -> Result<SiteDoc, StoreError> {
    store
        .update(DocKey::Site, move |doc: &mut SiteDoc| {
            *doc = merge(doc, &incoming);
            doc.clone()
        })
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn site(value: Value) -> SiteDoc {
        serde_json::from_value(value).unwrap()
    }

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_merge_keeps_unmentioned_fields() {
        let previous = site(json!({ "heroTitle": "Hiver 2025", "aboutText": "..." }));
        let merged = merge(&previous, &obj(json!({ "heroTitle": "Été 2026" })));

        assert_eq!(merged.0.get("heroTitle"), Some(&json!("Été 2026")));
        assert_eq!(merged.0.get("aboutText"), Some(&json!("...")));
    }

    #[test]
    fn test_merge_caps_and_strips_text() {
        let previous = SiteDoc::default();
        let long = "x".repeat(1000);
        let merged = merge(
            &previous,
            &obj(json!({ "aboutText": long, "heroTitle": "  ok\u{0007}  " })),
        );

        let about = merged.0.get("aboutText").unwrap().as_str().unwrap();
        assert_eq!(about.chars().count(), MAX_FIELD_LEN);
        assert_eq!(merged.0.get("heroTitle"), Some(&json!("ok")));
    }

    #[test]
    fn test_merge_ignores_non_string_values() {
        let previous = site(json!({ "heroTitle": "keep" }));
        let merged = merge(&previous, &obj(json!({ "heroTitle": { "nested": 1 } })));
        assert_eq!(merged.0.get("heroTitle"), Some(&json!("keep")));
    }

    #[test]
    fn test_merge_rebuilds_socials() {
        let previous = site(json!({ "socials": [{ "name": "Old", "handle": "", "url": "" }] }));
        let merged = merge(
            &previous,
            &obj(json!({
                "socials": [
                    { "name": "Instagram", "handle": "@deledzina", "url": "https://instagram.com/deledzina" },
                    { "name": "", "handle": "dropped", "url": "" },
                    "not-an-object"
                ]
            })),
        );

        let socials = merged.0.get("socials").unwrap().as_array().unwrap();
        assert_eq!(socials.len(), 1);
        assert_eq!(
            socials.first().unwrap().get("name"),
            Some(&json!("Instagram"))
        );
    }

    #[test]
    fn test_merge_caps_social_count() {
        let entries: Vec<Value> = (0..30)
            .map(|i| json!({ "name": format!("s{i}"), "handle": "", "url": "" }))
            .collect();
        let merged = merge(&SiteDoc::default(), &obj(json!({ "socials": entries })));
        let socials = merged.0.get("socials").unwrap().as_array().unwrap();
        assert_eq!(socials.len(), MAX_SOCIALS);
    }

    #[tokio::test]
    async fn test_replace_site_persists_merge() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        replace_site(&store, obj(json!({ "heroTitle": "A" })))
            .await
            .unwrap();
        let updated = replace_site(&store, obj(json!({ "aboutText": "B" })))
            .await
            .unwrap();

        assert_eq!(updated.0.get("heroTitle"), Some(&json!("A")));
        assert_eq!(updated.0.get("aboutText"), Some(&json!("B")));
    }
}
