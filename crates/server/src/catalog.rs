//! Product catalog normalization.
//!
//! The catalog document is authored through the admin panel as a whole-file
//! replace, so every read normalizes the raw records: slug ids, clamped
//! 2-decimal prices, defaulted titles and active flags. Normalization is a
//! fixed point - running it over an already-normalized catalog changes
//! nothing.

use dele_dzina_core::{parse_price, slugify};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{DocKey, JsonStore, StoreError};

/// The persisted catalog document (`collections.json`).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CatalogDoc {
    #[serde(default)]
    pub items: Vec<RawProduct>,
}

/// A raw catalog record as authored in the admin panel.
///
/// Every field is optional; `normalize` supplies the defaults. The document
/// has no versioning field, so unknown keys are simply ignored.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// A normalized product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Slug identifier, unique within the catalog.
    pub id: String,
    pub title: String,
    pub description: String,
    /// URL or site-relative path.
    pub image: String,
    /// Non-negative, rounded to 2 decimal places.
    pub price: Decimal,
    pub tag: String,
    pub active: bool,
}

/// Normalize one raw record at its catalog position.
///
/// - `title` defaults to `"Product {index+1}"` when blank.
/// - `id` is the slug of the explicit id, the explicit slug, or the title,
///   falling back to `"product-{index+1}"` when slugify yields nothing.
/// - `price` accepts numbers or locale-formatted strings, clamped to >= 0.
/// - `active` defaults to true unless explicitly `false`.
#[must_use]
pub fn normalize(raw: &RawProduct, index: usize) -> Product {
    let title = raw
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map_or_else(|| format!("Product {}", index + 1), ToOwned::to_owned);

    let source_id = [raw.id.as_deref(), raw.slug.as_deref(), Some(title.as_str())]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default();

    let slug = slugify(source_id);
    let id = if slug.is_empty() {
        format!("product-{}", index + 1)
    } else {
        slug
    };

    Product {
        id,
        title,
        description: trimmed(raw.description.as_deref()),
        image: trimmed(raw.image.as_deref()),
        price: parse_price(&raw.price),
        tag: trimmed(raw.tag.as_deref()),
        active: raw.active != Some(false),
    }
}

fn trimmed(value: Option<&str>) -> String {
    value.unwrap_or_default().trim().to_string()
}

/// Read the catalog, normalized. Missing or corrupt files yield an empty
/// catalog.
pub async fn read_products(store: &JsonStore) -> Vec<Product> {
    let doc: CatalogDoc = store.read(DocKey::Collections).await;
    doc.items
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize(raw, index))
        .collect()
}

/// Replace the whole catalog with `items`, persisting the normalized form.
///
/// Products absent from the payload are gone; that whole-document overwrite
/// is the admin panel's contract.
///
/// # Errors
///
/// Returns an error if the catalog document cannot be written.
pub async fn replace_products(
    store: &JsonStore,
    items: &[RawProduct],
) -> Result<Vec<Product>, StoreError> {
    let normalized: Vec<Product> = items
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize(raw, index))
        .collect();

    store
        .write(
            DocKey::Collections,
            &serde_json::json!({ "items": normalized }),
        )
        .await?;

    Ok(normalized)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawProduct {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_full_record() {
        let product = normalize(
            &raw(json!({
                "id": "Pull Premium",
                "title": "  Pull Premium  ",
                "description": " Laine mérinos ",
                "image": "https://cdn.example.com/pull.webp",
                "price": "49,90 €",
                "tag": "Nouveau",
                "active": true
            })),
            0,
        );

        assert_eq!(product.id, "pull-premium");
        assert_eq!(product.title, "Pull Premium");
        assert_eq!(product.description, "Laine mérinos");
        assert_eq!(product.price, Decimal::new(4990, 2));
        assert_eq!(product.tag, "Nouveau");
        assert!(product.active);
    }

    #[test]
    fn test_normalize_blank_title_defaults_by_position() {
        let product = normalize(&raw(json!({ "title": "   " })), 2);
        assert_eq!(product.title, "Product 3");
        assert_eq!(product.id, "product-3");
    }

    #[test]
    fn test_normalize_id_falls_back_to_slug_then_title() {
        let from_slug = normalize(&raw(json!({ "slug": "Robe Wax", "title": "Autre" })), 0);
        assert_eq!(from_slug.id, "robe-wax");

        let from_title = normalize(&raw(json!({ "title": "Déjà Vu" })), 0);
        assert_eq!(from_title.id, "deja-vu");
    }

    #[test]
    fn test_normalize_unsluggable_id_falls_back_to_position() {
        let product = normalize(&raw(json!({ "id": "!!!", "title": "???" })), 4);
        assert_eq!(product.id, "product-5");
    }

    #[test]
    fn test_normalize_active_defaults_true() {
        assert!(normalize(&raw(json!({ "title": "A" })), 0).active);
        assert!(!normalize(&raw(json!({ "title": "A", "active": false })), 0).active);
    }

    #[test]
    fn test_normalize_is_fixed_point() {
        let first = normalize(
            &raw(json!({
                "title": "Bélélé Foé",
                "price": "129,00 €",
                "image": " /img/foe.webp ",
                "tag": "Édition limitée"
            })),
            1,
        );

        // Re-normalize the serialized form, as a catalog re-save would.
        let reread: RawProduct =
            serde_json::from_value(serde_json::to_value(&first).unwrap()).unwrap();
        let second = normalize(&reread, 1);

        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_replace_then_read_products() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        let items: Vec<RawProduct> = vec![
            raw(json!({ "title": "Pull Premium", "price": 49.90 })),
            raw(json!({ "title": "Robe Wax", "price": "89,00 €", "active": false })),
        ];
        let written = replace_products(&store, &items).await.unwrap();
        assert_eq!(written.len(), 2);

        let products = read_products(&store).await;
        assert_eq!(products, written);
        assert_eq!(products.first().unwrap().id, "pull-premium");
        assert!(!products.get(1).unwrap().active);
    }

    #[tokio::test]
    async fn test_read_products_empty_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        assert!(read_products(&store).await.is_empty());
    }
}
