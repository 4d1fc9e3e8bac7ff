use cafs_core::Hash;

/// Failures of the file system layer that are not ordinary rejections.
///
/// They travel inside [`anyhow::Error`]; match with `downcast_ref`.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Committed metadata points at content the store does not hold.
    #[error("{path} references content {hash} which is missing from the content store")]
    MissingContent { path: String, hash: Hash },
    #[error("the metadata service has shut down")]
    ServiceClosed,
}
