use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    Hash,
    blob::{BlobError, BlobResult},
    store::{Store, StoreError, StoreResult},
};

use super::paths;

/// Inputs at least this large are hashed on the blocking pool.
const BLOCKING_HASH_THRESHOLD: usize = 1 << 16;

/// Content-addressed, deduplicating blob layer on top of a generic `Store`.
///
/// Every blob lives at a path derived from its BLAKE3 hash. Reads re-hash
/// the stored bytes and refuse to hand out data that no longer matches its
/// key. Blobs are never removed by this type.
#[derive(Debug, Clone)]
pub struct ContentStore {
    store: Arc<dyn Store>,
    /// Serializes the exists-check and the insert of [`ContentStore::store`].
    insert_lock: Arc<Mutex<()>>,
}

impl ContentStore {
    pub fn new<S>(store: S) -> Self
    where
        S: Store + 'static,
    {
        Self::from_arc(Arc::new(store))
    }

    /// Wraps a backend that is shared with other owners.
    pub fn from_arc(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            insert_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The backend this store writes into.
    pub fn backend(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn blob_path_for_hash(&self, hash: Hash) -> String {
        paths::blob_path_for_hash(hash, &self.store.features())
    }

    /// Stores `bytes` and returns their hash.
    ///
    /// Storing content that is already present does not touch the backend.
    pub async fn store(&self, bytes: Bytes) -> StoreResult<Hash> {
        let hash = if bytes.len() >= BLOCKING_HASH_THRESHOLD {
            let to_hash = bytes.clone();
            tokio::task::spawn_blocking(move || Hash::new(&to_hash)).await?
        } else {
            Hash::new(&bytes)
        };

        let path = self.blob_path_for_hash(hash);
        let _guard = self.insert_lock.lock().await;
        if self.store.exists(&path).await? {
            tracing::debug!(hash = %hash.fmt_short(), "content store: dedup hit");
            return Ok(hash);
        }
        self.store.put_bytes(&path, bytes).await?;
        tracing::debug!(hash = %hash.fmt_short(), "content store: stored new blob");
        Ok(hash)
    }

    /// Fetches the blob for `hash`, verifying it still hashes to `hash`.
    ///
    /// Returns `Ok(None)` when no blob is stored under `hash`.
    pub async fn retrieve(&self, hash: Hash) -> BlobResult<Option<Bytes>> {
        let bytes = match self.store.read_bytes(&self.blob_path_for_hash(hash)).await {
            Ok(bytes) => bytes,
            Err(err) if StoreError::is_not_found(&err) => return Ok(None),
            Err(err) => return Err(BlobError::Store(err)),
        };

        let actual = Hash::new(&bytes);
        if actual != hash {
            tracing::error!(
                expected = %hash,
                actual = %actual,
                "content store: integrity violation"
            );
            return Err(BlobError::IntegrityViolation {
                expected: hash,
                actual,
            });
        }
        Ok(Some(bytes))
    }

    /// Presence check without verification.
    pub async fn exists(&self, hash: Hash) -> StoreResult<bool> {
        self.store.exists(&self.blob_path_for_hash(hash)).await
    }

    pub async fn size(&self, hash: Hash) -> StoreResult<u64> {
        self.store.size(&self.blob_path_for_hash(hash)).await
    }

    /// All blob hashes currently held, in backend listing order.
    pub async fn list_hashes(&self) -> StoreResult<Vec<Hash>> {
        let features = self.store.features();
        let mut hashes = Vec::new();
        let mut stream = self.store.list().await?;

        while let Some(item) = stream.next().await {
            let path = item?;
            if let Some(hash) = paths::hash_from_blob_path(&path, &features) {
                hashes.push(hash);
            }
        }

        Ok(hashes)
    }

    /// Number of distinct blobs held.
    pub async fn len(&self) -> StoreResult<usize> {
        Ok(self.list_hashes().await?.len())
    }

    pub async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }
}
