//! Namespace mutations, as proposed to the log.

use cafs_core::Hash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{meta::FileMetadata, path::NsPath};

/// Variant specific payload of an [`Operation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpKind {
    CreateFile { metadata: FileMetadata },
    /// Metadata is synthesized when the operation is applied.
    CreateDirectory,
    Delete,
}

/// An intent to mutate the namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    op_id: Uuid,
    path: NsPath,
    kind: OpKind,
    timestamp: DateTime<Utc>,
}

impl Operation {
    /// The target path is taken from `metadata`. `metadata` must describe a
    /// file; directories go through [`Operation::create_directory`].
    pub fn create_file(metadata: FileMetadata, timestamp: DateTime<Utc>) -> Self {
        debug_assert!(!metadata.is_directory());
        Self {
            op_id: Uuid::new_v4(),
            path: metadata.path().clone(),
            kind: OpKind::CreateFile { metadata },
            timestamp,
        }
    }

    pub fn create_directory(path: NsPath, timestamp: DateTime<Utc>) -> Self {
        Self {
            op_id: Uuid::new_v4(),
            path,
            kind: OpKind::CreateDirectory,
            timestamp,
        }
    }

    pub fn delete(path: NsPath, timestamp: DateTime<Utc>) -> Self {
        Self {
            op_id: Uuid::new_v4(),
            path,
            kind: OpKind::Delete,
            timestamp,
        }
    }

    pub fn op_id(&self) -> Uuid {
        self.op_id
    }

    pub fn path(&self) -> &NsPath {
        &self.path
    }

    pub fn kind(&self) -> &OpKind {
        &self.kind
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            OpKind::CreateFile { .. } => "create_file",
            OpKind::CreateDirectory => "create_directory",
            OpKind::Delete => "delete",
        }
    }
}

/// What a caller asks the metadata service to do. Paths are raw strings;
/// the service canonicalizes them and stamps the commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpRequest {
    CreateFile {
        path: String,
        content_hash: Hash,
        size: u64,
    },
    CreateDirectory {
        path: String,
    },
    Delete {
        path: String,
    },
}

impl OpRequest {
    pub fn path(&self) -> &str {
        match self {
            OpRequest::CreateFile { path, .. }
            | OpRequest::CreateDirectory { path }
            | OpRequest::Delete { path } => path,
        }
    }

    /// Builds the operation for this request, stamped with `timestamp`.
    pub fn into_operation(
        self,
        timestamp: DateTime<Utc>,
    ) -> Result<Operation, crate::path::PathError> {
        let op = match self {
            OpRequest::CreateFile {
                path,
                content_hash,
                size,
            } => {
                let path = NsPath::parse(&path)?;
                Operation::create_file(
                    FileMetadata::file(path, content_hash, size, timestamp),
                    timestamp,
                )
            }
            OpRequest::CreateDirectory { path } => {
                Operation::create_directory(NsPath::parse(&path)?, timestamp)
            }
            OpRequest::Delete { path } => Operation::delete(NsPath::parse(&path)?, timestamp),
        };
        Ok(op)
    }
}
