//! Flat-file JSON document store.
//!
//! Every document (catalog, site content, orders, newsletter, events) is one
//! whole JSON file under the data directory. Reads fall back to the
//! document's default when the file is missing or corrupt. Writes land in a
//! temp file and are renamed into place so a crash never leaves a truncated
//! document.
//!
//! Read-modify-write cycles go through [`JsonStore::update`], which holds a
//! per-document async mutex for the whole cycle. The original deployment let
//! concurrent updates race (last write wins); serializing per key removes
//! that lost-update window without pretending to be a database. Plain reads
//! stay lock-free.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors that can occur when persisting a document.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document failed to serialize.
    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: DocKey,
        source: serde_json::Error,
    },

    /// Filesystem write failed.
    #[error("failed to write {key}: {source}")]
    Io {
        key: DocKey,
        source: std::io::Error,
    },
}

/// The closed set of documents the store manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocKey {
    /// Product catalog (`collections.json`).
    Collections,
    /// Site content key/value document (`site.json`).
    Site,
    /// Order ledger (`orders.json`).
    Orders,
    /// Newsletter subscribers (`newsletter.json`).
    Newsletter,
    /// Tracked analytics events (`events.json`).
    Events,
}

impl DocKey {
    /// All document keys.
    pub const ALL: [Self; 5] = [
        Self::Collections,
        Self::Site,
        Self::Orders,
        Self::Newsletter,
        Self::Events,
    ];

    /// File name of the document under the data directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Collections => "collections.json",
            Self::Site => "site.json",
            Self::Orders => "orders.json",
            Self::Newsletter => "newsletter.json",
            Self::Events => "events.json",
        }
    }

    const fn lock_index(self) -> usize {
        match self {
            Self::Collections => 0,
            Self::Site => 1,
            Self::Orders => 2,
            Self::Newsletter => 3,
            Self::Events => 4,
        }
    }
}

impl std::fmt::Display for DocKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Whole-file JSON persistence with per-document write serialization.
///
/// Cheaply cloneable; clones share the same lock set.
#[derive(Clone)]
pub struct JsonStore {
    dir: PathBuf,
    locks: Arc<[Mutex<()>; 5]>,
}

impl JsonStore {
    /// Create a store rooted at `dir`. No I/O happens until first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Arc::new([
                Mutex::new(()),
                Mutex::new(()),
                Mutex::new(()),
                Mutex::new(()),
                Mutex::new(()),
            ]),
        }
    }

    /// Create the data directory and seed the list documents that the
    /// handlers append to, so a fresh deployment starts from empty ledgers.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or a seed file cannot be created.
    pub async fn bootstrap(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                key: DocKey::Orders,
                source,
            })?;

        let seeds = [
            (DocKey::Orders, serde_json::json!({ "orders": [] })),
            (DocKey::Newsletter, serde_json::json!({ "subscribers": [] })),
            (DocKey::Events, serde_json::json!({ "events": [] })),
        ];

        for (key, seed) in seeds {
            let path = self.dir.join(key.file_name());
            let exists = tokio::fs::try_exists(&path)
                .await
                .map_err(|source| StoreError::Io { key, source })?;
            if !exists {
                self.write_unlocked(key, &seed).await?;
            }
        }

        Ok(())
    }

    /// Read a document, falling back to `T::default()` when the file is
    /// missing or does not parse. A corrupt file is logged and never fails
    /// the request.
    pub async fn read<T>(&self, key: DocKey) -> T
    where
        T: DeserializeOwned + Default,
    {
        let path = self.dir.join(key.file_name());
        let Ok(raw) = tokio::fs::read(&path).await else {
            return T::default();
        };

        match serde_json::from_slice(&raw) {
            Ok(doc) => doc,
            Err(error) => {
                tracing::warn!(%key, %error, "corrupt document, using fallback");
                T::default()
            }
        }
    }

    /// Overwrite a document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the filesystem write fails.
    pub async fn write<T>(&self, key: DocKey, value: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let _guard = self.lock(key).await;
        self.write_unlocked(key, value).await
    }

    /// Atomically apply `f` to a document: read, mutate, write back, all
    /// while holding the document's lock. Returns whatever `f` returns.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the updated document fails.
    pub async fn update<T, R, F>(&self, key: DocKey, f: F) -> Result<R, StoreError>
    where
        T: DeserializeOwned + Default + Serialize,
        F: FnOnce(&mut T) -> R,
    {
        let _guard = self.lock(key).await;
        let mut doc: T = self.read(key).await;
        let result = f(&mut doc);
        self.write_unlocked(key, &doc).await?;
        Ok(result)
    }

    #[allow(clippy::indexing_slicing)] // lock_index is always < 5
    async fn lock(&self, key: DocKey) -> tokio::sync::MutexGuard<'_, ()> {
        self.locks[key.lock_index()].lock().await
    }

    async fn write_unlocked<T>(&self, key: DocKey, value: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let mut payload =
            serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
                key,
                source,
            })?;
        payload.push(b'\n');

        let path = self.dir.join(key.file_name());
        let tmp = self.dir.join(format!("{}.tmp", key.file_name()));
        tokio::fs::write(&tmp, &payload)
            .await
            .map_err(|source| StoreError::Io { key, source })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io { key, source })?;

        Ok(())
    }
}
