//! The commit abstraction between the metadata service and replication.
//!
//! A leader appends a proposal, hands it to [`Replicator::replicate`] and
//! only applies and commits it once that returns `Ok`, i.e. once a
//! majority holds the entry. Followers apply committed entries in log
//! order through [`crate::NamespaceStateMachine::apply_entry`].

use async_trait::async_trait;

use crate::{FSResult, log::LogEntry};

#[async_trait]
pub trait Replicator: std::fmt::Debug + Send + Sync + 'static {
    fn node_id(&self) -> &str;

    /// Whether this node currently accepts proposals.
    fn is_leader(&self) -> bool;

    /// Term stamped on new entries. Never decreases.
    fn current_term(&self) -> u64;

    /// Returns once `entry` is held by a majority of members. An error
    /// discards the proposal.
    async fn replicate(&self, entry: &LogEntry) -> FSResult<()>;
}

/// A cluster of one: this node is the whole majority.
#[derive(Debug, Clone)]
pub struct SingleNodeReplicator {
    node_id: String,
    term: u64,
    leader: bool,
}

impl SingleNodeReplicator {
    pub fn leader(node_id: impl Into<String>, term: u64) -> Self {
        Self {
            node_id: node_id.into(),
            term,
            leader: true,
        }
    }

    /// A node that rejects every proposal.
    pub fn follower(node_id: impl Into<String>, term: u64) -> Self {
        Self {
            node_id: node_id.into(),
            term,
            leader: false,
        }
    }
}

#[async_trait]
impl Replicator for SingleNodeReplicator {
    fn node_id(&self) -> &str {
        &self.node_id
    }

    fn is_leader(&self) -> bool {
        self.leader
    }

    fn current_term(&self) -> u64 {
        self.term
    }

    async fn replicate(&self, entry: &LogEntry) -> FSResult<()> {
        tracing::trace!(
            node = %self.node_id,
            index = entry.index,
            term = entry.term,
            "replicated to local majority"
        );
        Ok(())
    }
}
