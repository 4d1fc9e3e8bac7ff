use bytes::Bytes;
use cafs_core::store::{PathStream, StoreError, StoreFeatures, StoreResult};
use dashmap::DashMap;
use futures::stream;
use serde::{Deserialize, Serialize};

use std::io;

/// Layout hints for [`MemoryStore`]; everything else is implicit.
///
/// Values must fit TOML's signed 64-bit integers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MemoryStoreConfig {
    pub case_sensitive: bool,
    pub recommended_max_dir_size: u64,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            recommended_max_dir_size: 1_000_000,
        }
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    files: DashMap<String, Bytes>,
    features: StoreFeatures,
}

impl MemoryStore {
    /// Creates a new, empty `MemoryStore`.
    pub fn new() -> Self {
        Self::create(MemoryStoreConfig::default())
    }

    pub fn create(config: MemoryStoreConfig) -> Self {
        Self {
            files: DashMap::new(),
            features: StoreFeatures {
                case_sensitive: config.case_sensitive,
                recommended_max_dir_size: config.recommended_max_dir_size,
            },
        }
    }

    pub fn to_content_store(self) -> cafs_core::ContentStore {
        cafs_core::ContentStore::new(self)
    }

    /// Number of objects held, regardless of path.
    pub fn object_count(&self) -> usize {
        self.files.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl cafs_core::store::Store for MemoryStore {
    fn features(&self) -> StoreFeatures {
        self.features
    }

    async fn exists(&self, path: &str) -> StoreResult<bool> {
        Ok(self.files.contains_key(path))
    }

    async fn put_bytes(&self, path: &str, bytes: Bytes) -> StoreResult<()> {
        self.files.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn read_bytes(&self, path: &str) -> StoreResult<Bytes> {
        // Bytes clones are reference counted; the guard is released here.
        let file = self.files.get(path).ok_or(StoreError::NotFound)?;
        Ok(file.value().clone())
    }

    async fn size(&self, path: &str) -> StoreResult<u64> {
        let file = self.files.get(path).ok_or(StoreError::NotFound)?;
        Ok(file.len() as u64)
    }

    async fn list(&self) -> StoreResult<PathStream> {
        let keys: Vec<Result<String, io::Error>> = self
            .files
            .iter()
            .map(|entry| Ok(entry.key().clone()))
            .collect();
        Ok(Box::new(stream::iter(keys)))
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        self.files.remove(path).ok_or(StoreError::NotFound)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafs_core::testutil::StoreTests;

    #[tokio::test]
    async fn store_conformance() {
        let store = MemoryStore::new();
        StoreTests::new(&store).run_all().await.unwrap();
        assert_eq!(store.object_count(), 0, "suite should clean up after itself");
    }

    #[tokio::test]
    async fn store_conformance_fanned_out() {
        let store = MemoryStore::create(MemoryStoreConfig {
            case_sensitive: false,
            recommended_max_dir_size: 1000,
        });
        StoreTests::with_prefix(&store, "fanned/")
            .run_all()
            .await
            .unwrap();
    }
}
