//! The metadata actor: sole owner of the operation log and the namespace.
//!
//! Requests arrive over a bounded FIFO channel and are handled one at a
//! time, so every commit cycle and every read runs inside the same
//! exclusive section and callers are served in arrival order.

use crate::{
    FSResult,
    error::FsError,
    log::{LogEntry, OperationLog},
    meta::FileMetadata,
    op::OpRequest,
    path::NsPath,
    replicate::Replicator,
    state::{NamespaceStateMachine, Rejection},
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Result of one commit cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { index: u64, term: u64 },
    Rejected(Rejection),
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            CommitOutcome::Rejected(r) => Some(r),
            CommitOutcome::Committed { .. } => None,
        }
    }
}

/// Point-in-time summary of a metadata service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub node_id: String,
    pub term: u64,
    pub is_leader: bool,
    pub log_len: usize,
    pub commit_index: Option<u64>,
    /// Live namespace entries, root included.
    pub entry_count: usize,
}

#[derive(Debug)]
pub(crate) enum ActorMessage {
    Propose {
        request: OpRequest,
        responder: oneshot::Sender<FSResult<CommitOutcome>>,
    },
    GetMetadata {
        path: String,
        responder: oneshot::Sender<Option<FileMetadata>>,
    },
    ListChildren {
        path: String,
        responder: oneshot::Sender<Vec<FileMetadata>>,
    },
    LogEntries {
        responder: oneshot::Sender<Vec<LogEntry>>,
    },
    Status {
        responder: oneshot::Sender<ServiceStatus>,
    },
    Shutdown {
        responder: oneshot::Sender<()>,
    },
}

struct MetadataActor {
    receiver: mpsc::Receiver<ActorMessage>,
    replicator: Box<dyn Replicator>,
    log: OperationLog,
    state: NamespaceStateMachine,
    /// Latest timestamp handed out, so commit times never go backwards.
    last_timestamp: DateTime<Utc>,
}

impl MetadataActor {
    async fn run(&mut self) {
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ActorMessage::Shutdown { responder } => {
                    tracing::debug!(node = %self.replicator.node_id(), "metadata actor shutting down");
                    let _ = responder.send(());
                    break;
                }
                msg => self.process_msg(msg).await,
            }
        }
    }

    async fn process_msg(&mut self, msg: ActorMessage) {
        match msg {
            ActorMessage::Propose { request, responder } => {
                let result = self.propose(request).await;
                if let Err(err) = &result {
                    tracing::error!("commit cycle failed: {err:#}");
                }
                let _ = responder.send(result);
            }
            ActorMessage::GetMetadata { path, responder } => {
                let meta = NsPath::parse(&path)
                    .ok()
                    .and_then(|path| self.state.get(&path).cloned());
                let _ = responder.send(meta);
            }
            ActorMessage::ListChildren { path, responder } => {
                let children = NsPath::parse(&path)
                    .map(|path| self.state.list_children(&path))
                    .unwrap_or_default();
                let _ = responder.send(children);
            }
            ActorMessage::LogEntries { responder } => {
                let _ = responder.send(self.log.entries().to_vec());
            }
            ActorMessage::Status { responder } => {
                let _ = responder.send(ServiceStatus {
                    node_id: self.replicator.node_id().to_owned(),
                    term: self.replicator.current_term(),
                    is_leader: self.replicator.is_leader(),
                    log_len: self.log.len(),
                    commit_index: self.log.commit_index(),
                    entry_count: self.state.len(),
                });
            }
            ActorMessage::Shutdown { .. } => {
                // Handled in run loop
            }
        }
    }

    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now().max(self.last_timestamp);
        self.last_timestamp = now;
        now
    }

    /// One full commit cycle: propose, validate, replicate, apply, commit.
    ///
    /// Any rejection leaves both the log and the namespace as they were.
    async fn propose(&mut self, request: OpRequest) -> FSResult<CommitOutcome> {
        if !self.replicator.is_leader() {
            tracing::warn!(path = request.path(), "rejecting proposal: not the leader");
            return Ok(CommitOutcome::Rejected(Rejection::NotLeader));
        }

        let timestamp = self.next_timestamp();
        let operation = match request.into_operation(timestamp) {
            Ok(op) => op,
            Err(err) => {
                tracing::warn!("rejecting proposal: {err}");
                return Ok(CommitOutcome::Rejected(Rejection::InvalidPath(err)));
            }
        };

        let term = self.replicator.current_term();
        let index = self.log.append_proposed(term, operation)?;
        let entry = self
            .log
            .get(index)
            .context("proposed entry vanished from the log")?;

        if let Err(rejection) = self.state.validate(&entry.operation) {
            tracing::warn!(
                op = entry.operation.name(),
                path = %entry.operation.path(),
                "rejecting proposal: {rejection}"
            );
            self.log.discard(index)?;
            return Ok(CommitOutcome::Rejected(rejection));
        }

        if let Err(err) = self.replicator.replicate(entry).await {
            self.log.discard(index)?;
            return Err(err.context(format!("replicating log entry {index}")));
        }

        if let Err(rejection) = self.state.apply(&entry.operation) {
            // validate() passed on the same state, so this is unreachable
            // unless apply and validate disagree
            tracing::error!("validated operation failed to apply: {rejection}");
            self.log.discard(index)?;
            return Ok(CommitOutcome::Rejected(rejection));
        }
        self.state.mark_applied(index);
        let entry = self.log.commit(index)?;

        tracing::debug!(
            index,
            term,
            op = entry.operation.name(),
            path = %entry.operation.path(),
            "committed"
        );
        Ok(CommitOutcome::Committed { index, term })
    }
}

/// A handle for communicating with the metadata actor. Cheap to clone and
/// safe to share across tasks.
#[derive(Clone, Debug)]
pub(crate) struct MetadataActorHandle {
    sender: mpsc::Sender<ActorMessage>,
}

impl MetadataActorHandle {
    /// Spawns the actor on the current tokio runtime.
    pub(crate) fn spawn(
        replicator: Box<dyn Replicator>,
        state: NamespaceStateMachine,
        queue_capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let last_timestamp = state
            .root()
            .map(|root| root.created_time())
            .unwrap_or_else(Utc::now);
        let mut actor = MetadataActor {
            receiver,
            replicator,
            log: OperationLog::new(),
            state,
            last_timestamp,
        };

        tokio::spawn(async move {
            actor.run().await;
        });

        Self { sender }
    }

    pub(crate) async fn send_msg(&self, msg: ActorMessage) -> FSResult<()> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| FsError::ServiceClosed)?;
        Ok(())
    }

    /// Sends the message built by `make` and waits for its reply.
    pub(crate) async fn request<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> ActorMessage,
    ) -> FSResult<R> {
        let (responder, receiver) = oneshot::channel();
        self.send_msg(make(responder)).await?;
        receiver.await.map_err(|_| FsError::ServiceClosed.into())
    }

    /// Fails with [`FsError::ServiceClosed`] if the actor already stopped.
    pub(crate) async fn shutdown(&self) -> FSResult<()> {
        self.request(|responder| ActorMessage::Shutdown { responder })
            .await
    }
}
