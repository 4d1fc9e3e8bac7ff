//! The namespace state machine.
//!
//! Holds the authoritative `path -> FileMetadata` mapping and applies
//! operations deterministically. After every successful apply:
//!
//! 1. every path except the root has an existing directory as parent,
//! 2. no two entries share a path,
//! 3. a delete removed exactly one entry,
//! 4. an entry has a content hash iff it is a file.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    log::LogEntry,
    meta::FileMetadata,
    op::{OpKind, Operation},
    path::{NsPath, PathError},
};

/// Why a proposal was turned down. All of these are ordinary outcomes the
/// caller is expected to branch on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("parent directory {0} does not exist")]
    ParentMissing(NsPath),
    #[error("parent {0} is not a directory")]
    ParentNotDirectory(NsPath),
    #[error("{0} already exists")]
    PathExists(NsPath),
    #[error("{0} does not exist")]
    NotFound(NsPath),
    #[error("the root directory cannot be removed")]
    RootImmutable,
    #[error("directory {0} is not empty")]
    DirectoryNotEmpty(NsPath),
    #[error("this node is not accepting writes")]
    NotLeader,
}

/// What a delete does with a directory that still has children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Non-empty directories cannot be deleted.
    #[default]
    RejectNonEmpty,
    /// Remove exactly the named entry and leave descendants in place.
    /// Descendants then have no parent, so invariant 1 no longer holds.
    Unchecked,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    #[error("log entry {index} is not committed")]
    Uncommitted { index: u64 },
    #[error("log entry {index} is out of order, expected {expected}")]
    OutOfOrder { index: u64, expected: u64 },
    #[error("log entry {index} does not apply: {rejection}")]
    Diverged { index: u64, rejection: Rejection },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceStateMachine {
    entries: HashMap<NsPath, FileMetadata>,
    /// Child paths by parent directory, kept sorted for listings.
    children: HashMap<NsPath, BTreeSet<NsPath>>,
    delete_policy: DeletePolicy,
    /// Index of the last log entry applied through [`Self::apply_entry`].
    last_applied: Option<u64>,
}

impl NamespaceStateMachine {
    pub fn new(delete_policy: DeletePolicy) -> Self {
        Self::with_root_time(delete_policy, Utc::now())
    }

    /// A namespace holding only the root, created at `root_created`.
    pub fn with_root_time(delete_policy: DeletePolicy, root_created: DateTime<Utc>) -> Self {
        let root = NsPath::root();
        let mut entries = HashMap::new();
        entries.insert(
            root.clone(),
            FileMetadata::directory(root.clone(), root_created),
        );
        let mut children = HashMap::new();
        children.insert(root, BTreeSet::new());
        Self {
            entries,
            children,
            delete_policy,
            last_applied: None,
        }
    }

    /// Rebuilds a namespace from committed log entries, in order.
    pub fn replay<'a>(
        delete_policy: DeletePolicy,
        root_created: DateTime<Utc>,
        entries: impl IntoIterator<Item = &'a LogEntry>,
    ) -> Result<Self, ReplayError> {
        let mut state = Self::with_root_time(delete_policy, root_created);
        for entry in entries {
            state.apply_entry(entry)?;
        }
        ::log::debug!(
            "replayed namespace up to {:?}, {} entries",
            state.last_applied,
            state.entries.len()
        );
        Ok(state)
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    pub fn root(&self) -> Option<&FileMetadata> {
        self.entries.get(&NsPath::root())
    }

    pub fn get(&self, path: &NsPath) -> Option<&FileMetadata> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &NsPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of live entries, root included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        // the root is always present
        false
    }

    pub fn last_applied(&self) -> Option<u64> {
        self.last_applied
    }

    /// Direct children of `path`, sorted by path. Empty when `path` is
    /// absent or not a directory.
    pub fn list_children(&self, path: &NsPath) -> Vec<FileMetadata> {
        match self.entries.get(path) {
            Some(meta) if meta.is_directory() => {}
            _ => return Vec::new(),
        }
        self.children
            .get(path)
            .map(|kids| {
                kids.iter()
                    .filter_map(|child| self.entries.get(child).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Checks `op` against the current namespace without changing it.
    pub fn validate(&self, op: &Operation) -> Result<(), Rejection> {
        let path = op.path();
        match op.kind() {
            OpKind::CreateFile { .. } | OpKind::CreateDirectory => {
                if self.entries.contains_key(path) {
                    return Err(Rejection::PathExists(path.clone()));
                }
                let parent = path.parent();
                match self.entries.get(&parent) {
                    None => Err(Rejection::ParentMissing(parent)),
                    Some(meta) if !meta.is_directory() => {
                        Err(Rejection::ParentNotDirectory(parent))
                    }
                    Some(_) => Ok(()),
                }
            }
            OpKind::Delete => {
                if path.is_root() {
                    return Err(Rejection::RootImmutable);
                }
                if !self.entries.contains_key(path) {
                    return Err(Rejection::NotFound(path.clone()));
                }
                if self.delete_policy == DeletePolicy::RejectNonEmpty
                    && self.children.get(path).is_some_and(|kids| !kids.is_empty())
                {
                    return Err(Rejection::DirectoryNotEmpty(path.clone()));
                }
                Ok(())
            }
        }
    }

    /// Validates and applies `op`. On rejection nothing changes.
    pub fn apply(&mut self, op: &Operation) -> Result<(), Rejection> {
        self.validate(op)?;
        let path = op.path().clone();
        match op.kind() {
            OpKind::CreateFile { metadata } => {
                self.insert(path, metadata.clone());
            }
            OpKind::CreateDirectory => {
                let metadata = FileMetadata::directory(path.clone(), op.timestamp());
                self.children.entry(path.clone()).or_default();
                self.insert(path, metadata);
            }
            OpKind::Delete => {
                self.entries.remove(&path);
                if let Some(siblings) = self.children.get_mut(&path.parent()) {
                    siblings.remove(&path);
                }
                // Under `Unchecked` descendants outlive their directory and
                // keep their index, so a directory recreated here lists them.
                if self.children.get(&path).is_some_and(BTreeSet::is_empty) {
                    self.children.remove(&path);
                }
            }
        }
        Ok(())
    }

    /// Applies an already committed entry, as a follower would.
    pub fn apply_entry(&mut self, entry: &LogEntry) -> Result<(), ReplayError> {
        if !entry.is_committed() {
            return Err(ReplayError::Uncommitted { index: entry.index });
        }
        let expected = self.last_applied.map_or(0, |i| i + 1);
        if entry.index != expected {
            return Err(ReplayError::OutOfOrder {
                index: entry.index,
                expected,
            });
        }
        self.apply(&entry.operation)
            .map_err(|rejection| ReplayError::Diverged {
                index: entry.index,
                rejection,
            })?;
        self.last_applied = Some(entry.index);
        Ok(())
    }

    /// Records that the leader applied the entry at `index` directly.
    pub(crate) fn mark_applied(&mut self, index: u64) {
        self.last_applied = Some(index);
    }

    fn insert(&mut self, path: NsPath, metadata: FileMetadata) {
        self.children
            .entry(path.parent())
            .or_default()
            .insert(path.clone());
        self.entries.insert(path, metadata);
    }

    /// Checks the structural invariants, returning a description of the
    /// first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let root = NsPath::root();
        match self.entries.get(&root) {
            Some(meta) if meta.is_directory() => {}
            _ => return Err("root directory missing".into()),
        }
        for (path, meta) in &self.entries {
            if meta.path() != path {
                return Err(format!("{path} keyed under a different path"));
            }
            if meta.is_directory() && meta.size() != 0 {
                return Err(format!("directory {path} has non-zero size"));
            }
            if path.is_root() {
                continue;
            }
            match self.entries.get(&path.parent()) {
                Some(parent) if parent.is_directory() => {}
                Some(_) => return Err(format!("parent of {path} is not a directory")),
                None => return Err(format!("parent of {path} is missing")),
            }
            let indexed = self
                .children
                .get(&path.parent())
                .is_some_and(|kids| kids.contains(path));
            if !indexed {
                return Err(format!("{path} missing from its parent's child index"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::OperationLog;
    use cafs_core::Hash;

    fn p(s: &str) -> NsPath {
        NsPath::parse(s).unwrap()
    }

    fn mkdir(path: &str) -> Operation {
        Operation::create_directory(p(path), Utc::now())
    }

    fn touch(path: &str, body: &[u8]) -> Operation {
        let now = Utc::now();
        Operation::create_file(
            FileMetadata::file(p(path), Hash::new(body), body.len() as u64, now),
            now,
        )
    }

    fn rm(path: &str) -> Operation {
        Operation::delete(p(path), Utc::now())
    }

    #[test]
    fn starts_with_root_only() {
        let state = NamespaceStateMachine::new(DeletePolicy::default());
        assert_eq!(state.len(), 1);
        assert!(state.root().unwrap().is_directory());
        assert!(state.list_children(&NsPath::root()).is_empty());
        state.check_invariants().unwrap();
    }

    #[test]
    fn create_requires_parent() {
        let mut state = NamespaceStateMachine::new(DeletePolicy::default());
        assert_eq!(
            state.apply(&mkdir("/a/b")),
            Err(Rejection::ParentMissing(p("/a")))
        );
        assert_eq!(state.len(), 1);

        state.apply(&mkdir("/a")).unwrap();
        state.apply(&mkdir("/a/b")).unwrap();
        state.check_invariants().unwrap();
    }

    #[test]
    fn parent_must_be_a_directory() {
        let mut state = NamespaceStateMachine::new(DeletePolicy::default());
        state.apply(&touch("/f", b"x")).unwrap();
        assert_eq!(
            state.apply(&touch("/f/g", b"y")),
            Err(Rejection::ParentNotDirectory(p("/f")))
        );
    }

    #[test]
    fn duplicate_paths_are_rejected_and_original_kept() {
        let mut state = NamespaceStateMachine::new(DeletePolicy::default());
        state.apply(&touch("/f", b"first")).unwrap();
        let before = state.get(&p("/f")).cloned();

        assert_eq!(
            state.apply(&touch("/f", b"second")),
            Err(Rejection::PathExists(p("/f")))
        );
        assert_eq!(
            state.apply(&mkdir("/f")),
            Err(Rejection::PathExists(p("/f")))
        );
        assert_eq!(state.get(&p("/f")).cloned(), before);
        assert_eq!(
            state.apply(&mkdir("/")),
            Err(Rejection::PathExists(NsPath::root()))
        );
    }

    #[test]
    fn directory_metadata_is_synthesized() {
        let mut state = NamespaceStateMachine::new(DeletePolicy::default());
        let op = mkdir("/d");
        state.apply(&op).unwrap();
        let meta = state.get(&p("/d")).unwrap();
        assert!(meta.is_directory());
        assert_eq!(meta.size(), 0);
        assert_eq!(meta.created_time(), op.timestamp());
    }

    #[test]
    fn delete_semantics() {
        let mut state = NamespaceStateMachine::new(DeletePolicy::RejectNonEmpty);
        assert_eq!(state.apply(&rm("/")), Err(Rejection::RootImmutable));
        assert_eq!(state.apply(&rm("/nope")), Err(Rejection::NotFound(p("/nope"))));

        state.apply(&mkdir("/d")).unwrap();
        state.apply(&touch("/d/f", b"x")).unwrap();
        assert_eq!(
            state.apply(&rm("/d")),
            Err(Rejection::DirectoryNotEmpty(p("/d")))
        );

        state.apply(&rm("/d/f")).unwrap();
        assert!(state.get(&p("/d/f")).is_none());
        assert!(state.list_children(&p("/d")).is_empty());
        state.apply(&rm("/d")).unwrap();
        assert_eq!(state.len(), 1);
        state.check_invariants().unwrap();
    }

    #[test]
    fn unchecked_delete_leaves_descendants() {
        let mut state = NamespaceStateMachine::new(DeletePolicy::Unchecked);
        state.apply(&mkdir("/d")).unwrap();
        state.apply(&touch("/d/f", b"x")).unwrap();
        state.apply(&rm("/d")).unwrap();

        assert!(state.get(&p("/d")).is_none());
        assert!(state.get(&p("/d/f")).is_some());
        assert!(state.check_invariants().is_err());
        assert!(state.list_children(&p("/d")).is_empty());

        // a directory recreated at the same path adopts the survivors
        state.apply(&mkdir("/d")).unwrap();
        let listed: Vec<_> = state
            .list_children(&p("/d"))
            .iter()
            .map(|m| m.path().to_string())
            .collect();
        assert_eq!(listed, vec!["/d/f"]);
        state.check_invariants().unwrap();

        // deleting the survivor leaves the recreated directory empty
        state.apply(&rm("/d/f")).unwrap();
        assert!(state.list_children(&p("/d")).is_empty());
    }

    #[test]
    fn listing_is_sorted_and_direct_only() {
        let mut state = NamespaceStateMachine::new(DeletePolicy::default());
        state.apply(&mkdir("/p")).unwrap();
        state.apply(&touch("/p/zeta", b"z")).unwrap();
        state.apply(&mkdir("/p/alpha")).unwrap();
        state.apply(&touch("/p/alpha/inner", b"i")).unwrap();
        state.apply(&touch("/p/beta", b"b")).unwrap();

        let names: Vec<_> = state
            .list_children(&p("/p"))
            .iter()
            .map(|m| m.path().to_string())
            .collect();
        assert_eq!(names, vec!["/p/alpha", "/p/beta", "/p/zeta"]);

        assert!(state.list_children(&p("/p/zeta")).is_empty());
        assert!(state.list_children(&p("/missing")).is_empty());
    }

    #[test]
    fn replay_rebuilds_identical_namespace() {
        let root_created = Utc::now();
        let mut leader = NamespaceStateMachine::with_root_time(DeletePolicy::default(), root_created);
        let mut log = OperationLog::new();

        for op in [
            mkdir("/a"),
            touch("/a/x", b"x"),
            mkdir("/a/b"),
            rm("/a/x"),
            touch("/a/b/y", b"y"),
        ] {
            let index = log.append_proposed(1, op).unwrap();
            leader.apply(&log.get(index).unwrap().operation).unwrap();
            leader.mark_applied(index);
            log.commit(index).unwrap();
        }

        let follower =
            NamespaceStateMachine::replay(DeletePolicy::default(), root_created, log.committed())
                .unwrap();
        assert_eq!(follower, leader);
        assert_eq!(follower.last_applied(), Some(4));
    }

    #[test]
    fn replay_refuses_gaps_and_proposals() {
        let mut log = OperationLog::new();
        let idx = log.append_proposed(1, mkdir("/a")).unwrap();
        let proposed = log.get(idx).unwrap().clone();

        let mut state = NamespaceStateMachine::new(DeletePolicy::default());
        assert_eq!(
            state.apply_entry(&proposed),
            Err(ReplayError::Uncommitted { index: 0 })
        );

        let mut skipped = proposed.clone();
        skipped.index = 3;
        skipped.state = crate::log::EntryState::Committed;
        assert_eq!(
            state.apply_entry(&skipped),
            Err(ReplayError::OutOfOrder {
                index: 3,
                expected: 0
            })
        );
    }
}
