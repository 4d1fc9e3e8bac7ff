//! File level operations over metadata plus content.

use bytes::Bytes;
use cafs_core::ContentStore;
use cafs_store_memory::MemoryStore;

use crate::{
    FSResult,
    api::MetadataService,
    config::FsConfig,
    error::FsError,
    meta::{DirectoryEntry, FileMetadata},
};

/// A file system whose namespace lives in a [`MetadataService`] and whose
/// file bodies live in a [`ContentStore`].
///
/// Writes store content first and commit metadata second, so committed
/// metadata never references content that was not stored.
#[derive(Clone, Debug)]
pub struct FileSystem {
    metadata: MetadataService,
    content: ContentStore,
}

impl FileSystem {
    pub fn new(metadata: MetadataService, content: ContentStore) -> Self {
        Self { metadata, content }
    }

    pub fn open(config: &FsConfig, content: ContentStore) -> Self {
        Self::new(MetadataService::open(config), content)
    }

    /// Everything in memory. Must be called from within a tokio runtime.
    pub fn in_memory(config: &FsConfig) -> Self {
        Self::open(config, MemoryStore::new().to_content_store())
    }

    pub fn metadata(&self) -> &MetadataService {
        &self.metadata
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    /// Stores `bytes`, then commits a file entry at `path` referencing them.
    ///
    /// Returns `false` if the metadata commit is rejected. The stored blob
    /// is kept either way; identical content written later reuses it.
    pub async fn create_file(&self, path: &str, bytes: impl Into<Bytes>) -> FSResult<bool> {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        let hash = self.content.store(bytes).await?;
        let created = self.metadata.create_file(path, hash, size).await?;
        if created {
            tracing::debug!(path, hash = %hash.fmt_short(), size, "file created");
        } else {
            tracing::debug!(path, hash = %hash.fmt_short(), "file not created, blob retained");
        }
        Ok(created)
    }

    /// Contents of the file at `path`; `None` if there is no such file or
    /// the path names a directory.
    ///
    /// Fails with [`FsError::MissingContent`] if the metadata references a
    /// blob the store no longer has, and with
    /// [`cafs_core::BlobError::IntegrityViolation`] if the blob is corrupt.
    pub async fn read_file(&self, path: &str) -> FSResult<Option<Bytes>> {
        let Some(meta) = self.metadata.get_metadata(path).await? else {
            return Ok(None);
        };
        let Some(hash) = meta.content_hash() else {
            return Ok(None);
        };
        match self.content.retrieve(hash).await? {
            Some(bytes) => Ok(Some(bytes)),
            None => {
                tracing::error!(path, %hash, "metadata references missing content");
                Err(FsError::MissingContent {
                    path: meta.path().to_string(),
                    hash,
                }
                .into())
            }
        }
    }

    pub async fn create_directory(&self, path: &str) -> FSResult<bool> {
        self.metadata.create_directory(path).await
    }

    /// Removes the entry at `path`. The blob of a deleted file stays in the
    /// content store.
    pub async fn delete(&self, path: &str) -> FSResult<bool> {
        self.metadata.delete(path).await
    }

    pub async fn stat(&self, path: &str) -> FSResult<Option<FileMetadata>> {
        self.metadata.get_metadata(path).await
    }

    /// Entries directly under `path`, sorted by path.
    pub async fn list_directory(&self, path: &str) -> FSResult<Vec<DirectoryEntry>> {
        let children = self.metadata.list_children(path).await?;
        Ok(children.iter().map(DirectoryEntry::from).collect())
    }
}
