use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

pub type StoreResult<T, E = anyhow::Error> = std::result::Result<T, E>;

/// Errors a backend reports in a form callers branch on.
///
/// Backends return them wrapped in [`anyhow::Error`]; use
/// [`StoreError::is_not_found`] to test for absence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object not found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_not_found(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<StoreError>(), Some(StoreError::NotFound))
    }
}

pub type PathStream = Box<dyn Stream<Item = Result<String, std::io::Error>> + Send + Unpin + 'static>;

/// Raw byte storage addressed by slash separated relative paths.
///
/// Implementations know nothing about hashing; the content-addressed layer
/// lives in [`crate::ContentStore`].
#[async_trait]
pub trait Store: std::fmt::Debug + Send + Sync + 'static {
    fn features(&self) -> StoreFeatures;

    async fn exists(&self, path: &str) -> StoreResult<bool>;

    /// Writes `bytes` at `path`, replacing any previous object.
    async fn put_bytes(&self, path: &str, bytes: Bytes) -> StoreResult<()>;

    /// Reads the whole object at `path`. Absence is `StoreError::NotFound`.
    async fn read_bytes(&self, path: &str) -> StoreResult<Bytes>;

    async fn size(&self, path: &str) -> StoreResult<u64>;

    /// Every object path currently held by the backend.
    async fn list(&self) -> StoreResult<PathStream>;

    async fn delete(&self, path: &str) -> StoreResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreFeatures {
    pub case_sensitive: bool,
    pub recommended_max_dir_size: u64,
}
