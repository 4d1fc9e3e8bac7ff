//! # cafs file system
//!
//! A hierarchical namespace kept by a replicated operation log, with file
//! bodies held in a deduplicating content-addressed store.
//!
//! ## Layers
//! 1. `path`, `meta`, `op`, `log` – data model (serde encodable).
//! 2. `state` – deterministic namespace state machine and its invariants.
//! 3. `replicate` – the commit abstraction; a single node is its own
//!    majority, a real consensus backend plugs in behind the same trait.
//! 4. `actor` / `api` – [`MetadataService`], one actor task that owns log
//!    and namespace and runs every commit cycle to completion in turn.
//! 5. `facade` – [`FileSystem`], content store plus metadata.

mod actor;
mod api;
pub mod config;
pub mod error;
mod facade;
pub mod log;
pub mod meta;
pub mod op;
pub mod path;
pub mod replicate;
pub mod state;

pub use actor::{CommitOutcome, ServiceStatus};
pub use api::MetadataService;
pub use config::FsConfig;
pub use error::FsError;
pub use facade::FileSystem;
pub use crate::log::{EntryState, LogEntry, OperationLog};
pub use meta::{DirectoryEntry, EntryKind, FileMetadata};
pub use op::{OpKind, OpRequest, Operation};
pub use path::{NsPath, PathError};
pub use replicate::{Replicator, SingleNodeReplicator};
pub use state::{DeletePolicy, NamespaceStateMachine, Rejection, ReplayError};

/// Crate-wide result alias that bubbles up [`anyhow::Error`].
pub type FSResult<T> = anyhow::Result<T>;
