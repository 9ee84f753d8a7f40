//! Newsletter subscriber list.

use chrono::{DateTime, Utc};
use dele_dzina_core::Email;
use serde::{Deserialize, Serialize};

use crate::store::{DocKey, JsonStore, StoreError};

/// The persisted newsletter document (`newsletter.json`).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NewsletterDoc {
    #[serde(default)]
    pub subscribers: Vec<Subscriber>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub email: Email,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a subscribe attempt. Both are reported to the caller as
/// success; the distinction only drives event bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Added,
    AlreadySubscribed,
}

/// Add `email` to the subscriber list if not already present.
///
/// Duplicate detection is case-insensitive on the stored address.
///
/// # Errors
///
/// Returns an error if the newsletter document cannot be written.
pub async fn subscribe(store: &JsonStore, email: Email) -> Result<SubscribeOutcome, StoreError> {
    store
        .update(DocKey::Newsletter, move |doc: &mut NewsletterDoc| {
            let normalized = email.as_str().to_lowercase();
            let exists = doc
                .subscribers
                .iter()
                .any(|s| s.email.as_str().to_lowercase() == normalized);
            if exists {
                return SubscribeOutcome::AlreadySubscribed;
            }
            doc.subscribers.insert(
                0,
                Subscriber {
                    email,
                    created_at: Utc::now(),
                },
            );
            SubscribeOutcome::Added
        })
        .await
}

/// Number of subscribers on file.
pub async fn subscriber_count(store: &JsonStore) -> usize {
    let doc: NewsletterDoc = store.read(DocKey::Newsletter).await;
    doc.subscribers.len()
}
