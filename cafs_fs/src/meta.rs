//! Namespace node metadata.

use std::fmt;

use cafs_core::Hash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::NsPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Directory => f.write_str("directory"),
        }
    }
}

/// A committed node of the namespace.
///
/// Only [`FileMetadata::file`] and [`FileMetadata::directory`] build one,
/// so a content hash is present exactly when the node is a file and
/// directories always have size 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    path: NsPath,
    content_hash: Option<Hash>,
    size: u64,
    created_time: DateTime<Utc>,
}

impl FileMetadata {
    pub fn file(path: NsPath, content_hash: Hash, size: u64, created_time: DateTime<Utc>) -> Self {
        Self {
            path,
            content_hash: Some(content_hash),
            size,
            created_time,
        }
    }

    pub fn directory(path: NsPath, created_time: DateTime<Utc>) -> Self {
        Self {
            path,
            content_hash: None,
            size: 0,
            created_time,
        }
    }

    pub fn path(&self) -> &NsPath {
        &self.path
    }

    /// `None` for directories.
    pub fn content_hash(&self) -> Option<Hash> {
        self.content_hash
    }

    /// Hex digest, or the empty string for directories.
    pub fn content_hash_hex(&self) -> String {
        self.content_hash.map(|h| h.to_hex()).unwrap_or_default()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn created_time(&self) -> DateTime<Utc> {
        self.created_time
    }

    pub fn is_directory(&self) -> bool {
        self.content_hash.is_none()
    }

    pub fn kind(&self) -> EntryKind {
        if self.is_directory() {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }
}

/// One row of a directory listing, as handed out by the facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    pub created: DateTime<Utc>,
}

impl From<&FileMetadata> for DirectoryEntry {
    fn from(meta: &FileMetadata) -> Self {
        Self {
            name: meta.path().name().to_owned(),
            path: meta.path().to_string(),
            kind: meta.kind(),
            size: meta.size(),
            created: meta.created_time(),
        }
    }
}
