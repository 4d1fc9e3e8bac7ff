use serde::{Deserialize, Serialize};

use crate::state::DeletePolicy;

/// Settings for one metadata service instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FsConfig {
    pub node_id: String,
    /// Term stamped on every log entry written by this node.
    pub term: u64,
    /// Whether this node accepts writes.
    pub leader: bool,
    pub delete_policy: DeletePolicy,
    /// Bound of the request queue in front of the metadata actor.
    pub queue_capacity: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            node_id: "node-1".to_owned(),
            term: 1,
            leader: true,
            delete_policy: DeletePolicy::default(),
            queue_capacity: 1024,
        }
    }
}
