pub mod paths;
pub mod store;

use crate::Hash;

/// Failures surfaced by [`store::ContentStore`] reads.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// The bytes stored under `expected` no longer hash to `expected`.
    /// Never recoverable by retrying; the stored copy is corrupt.
    #[error("content integrity violation: expected {expected}, stored bytes hash to {actual}")]
    IntegrityViolation { expected: Hash, actual: Hash },
    #[error("storage backend failure: {0}")]
    Store(#[from] anyhow::Error),
}

pub type BlobResult<T> = Result<T, BlobError>;
