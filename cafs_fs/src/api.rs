//! The metadata service API.

use cafs_core::Hash;

use crate::{
    FSResult,
    actor::{ActorMessage, CommitOutcome, MetadataActorHandle, ServiceStatus},
    config::FsConfig,
    log::LogEntry,
    meta::FileMetadata,
    op::OpRequest,
    replicate::{Replicator, SingleNodeReplicator},
    state::NamespaceStateMachine,
};

/// Linearizable namespace backed by the operation log.
///
/// Every write is one commit cycle; when a write returns `true` its effect
/// is already visible to every subsequent read through any clone of this
/// handle. Writes return `false` for expected failures (missing parent,
/// path collision, missing target, not the leader) and `Err` only when the
/// service itself is gone or replication failed.
#[derive(Clone, Debug)]
pub struct MetadataService {
    actor: MetadataActorHandle,
}

impl MetadataService {
    /// Starts a service with a single-node replicator built from `config`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// ```rust,no_run
    /// use cafs_fs::{FsConfig, MetadataService};
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// let meta = MetadataService::open(&FsConfig::default());
    /// assert!(meta.create_directory("/projects").await?);
    /// assert!(meta.get_metadata("/projects").await?.is_some());
    /// # Ok(()) }
    /// ```
    pub fn open(config: &FsConfig) -> Self {
        let replicator = if config.leader {
            SingleNodeReplicator::leader(config.node_id.clone(), config.term)
        } else {
            SingleNodeReplicator::follower(config.node_id.clone(), config.term)
        };
        Self::with_replicator(config, Box::new(replicator))
    }

    /// Starts a service that commits through `replicator`.
    pub fn with_replicator(config: &FsConfig, replicator: Box<dyn Replicator>) -> Self {
        tracing::debug!(
            node = %replicator.node_id(),
            term = replicator.current_term(),
            leader = replicator.is_leader(),
            "starting metadata service"
        );
        let state = NamespaceStateMachine::new(config.delete_policy);
        let actor = MetadataActorHandle::spawn(replicator, state, config.queue_capacity);
        Self { actor }
    }

    /// Runs one commit cycle and reports the detailed outcome.
    pub async fn submit(&self, request: OpRequest) -> FSResult<CommitOutcome> {
        self.actor
            .request(|responder| ActorMessage::Propose { request, responder })
            .await?
    }

    pub async fn create_file(&self, path: &str, content_hash: Hash, size: u64) -> FSResult<bool> {
        let outcome = self
            .submit(OpRequest::CreateFile {
                path: path.to_owned(),
                content_hash,
                size,
            })
            .await?;
        Ok(outcome.is_committed())
    }

    pub async fn create_directory(&self, path: &str) -> FSResult<bool> {
        let outcome = self
            .submit(OpRequest::CreateDirectory {
                path: path.to_owned(),
            })
            .await?;
        Ok(outcome.is_committed())
    }

    pub async fn delete(&self, path: &str) -> FSResult<bool> {
        let outcome = self
            .submit(OpRequest::Delete {
                path: path.to_owned(),
            })
            .await?;
        Ok(outcome.is_committed())
    }

    /// Metadata for `path`, or `None` when absent or not a valid path.
    pub async fn get_metadata(&self, path: &str) -> FSResult<Option<FileMetadata>> {
        let path = path.to_owned();
        self.actor
            .request(|responder| ActorMessage::GetMetadata { path, responder })
            .await
    }

    /// Direct children of `path` sorted by path. Empty when `path` is
    /// absent or is a file.
    pub async fn list_children(&self, path: &str) -> FSResult<Vec<FileMetadata>> {
        let path = path.to_owned();
        self.actor
            .request(|responder| ActorMessage::ListChildren { path, responder })
            .await
    }

    /// A copy of the whole log, oldest entry first.
    pub async fn log_entries(&self) -> FSResult<Vec<LogEntry>> {
        self.actor
            .request(|responder| ActorMessage::LogEntries { responder })
            .await
    }

    pub async fn commit_index(&self) -> FSResult<Option<u64>> {
        Ok(self.status().await?.commit_index)
    }

    pub async fn status(&self) -> FSResult<ServiceStatus> {
        self.actor
            .request(|responder| ActorMessage::Status { responder })
            .await
    }

    /// Stops the actor after the requests queued before this call.
    ///
    /// Shutting down a service that is already closed fails with
    /// [`crate::FsError::ServiceClosed`].
    pub async fn shutdown(&self) -> FSResult<()> {
        self.actor.shutdown().await
    }
}
