//! Append-only operation log.
//!
//! The log only ever holds committed entries plus, transiently, a single
//! trailing `Proposed` entry while the commit cycle for it is running.
//! A proposal that fails is removed, never kept as a failed record.

use serde::{Deserialize, Serialize};

use crate::op::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Proposed,
    Committed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position in the log; doubles as the durable sequence number.
    pub index: u64,
    pub term: u64,
    pub operation: Operation,
    pub state: EntryState,
}

impl LogEntry {
    pub fn is_committed(&self) -> bool {
        self.state == EntryState::Committed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    #[error("entry {0} is not the tail of the log")]
    NotTail(u64),
    #[error("entry {0} is not in the proposed state")]
    NotProposed(u64),
    #[error("a proposal is already in flight at index {0}")]
    ProposalInFlight(u64),
    #[error("term {term} is older than the last entry's term {last}")]
    StaleTerm { term: u64, last: u64 },
}

#[derive(Debug, Default, Clone)]
pub struct OperationLog {
    entries: Vec<LogEntry>,
    commit_index: Option<u64>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `operation` as a `Proposed` entry at index = current length.
    ///
    /// Terms never decrease along the log.
    pub fn append_proposed(&mut self, term: u64, operation: Operation) -> Result<u64, LogError> {
        if let Some(last) = self.entries.last() {
            if last.state == EntryState::Proposed {
                return Err(LogError::ProposalInFlight(last.index));
            }
            if term < last.term {
                return Err(LogError::StaleTerm {
                    term,
                    last: last.term,
                });
            }
        }
        let index = self.entries.len() as u64;
        self.entries.push(LogEntry {
            index,
            term,
            operation,
            state: EntryState::Proposed,
        });
        Ok(index)
    }

    /// Marks the trailing proposal committed and advances the commit index.
    pub fn commit(&mut self, index: u64) -> Result<&LogEntry, LogError> {
        let entry = self.proposed_tail_mut(index)?;
        entry.state = EntryState::Committed;
        self.commit_index = Some(index);
        Ok(&self.entries[index as usize])
    }

    /// Removes the trailing proposal entirely.
    pub fn discard(&mut self, index: u64) -> Result<LogEntry, LogError> {
        self.proposed_tail_mut(index)?;
        self.entries.pop().ok_or(LogError::NotTail(index))
    }

    fn proposed_tail_mut(&mut self, index: u64) -> Result<&mut LogEntry, LogError> {
        let entry = self.entries.last_mut().ok_or(LogError::NotTail(index))?;
        if entry.index != index {
            return Err(LogError::NotTail(index));
        }
        if entry.state != EntryState::Proposed {
            return Err(LogError::NotProposed(index));
        }
        Ok(entry)
    }

    pub fn get(&self, index: u64) -> Option<&LogEntry> {
        self.entries.get(index as usize)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries up to and including the commit index.
    pub fn committed(&self) -> &[LogEntry] {
        match self.commit_index {
            Some(idx) => &self.entries[..=idx as usize],
            None => &[],
        }
    }

    pub fn commit_index(&self) -> Option<u64> {
        self.commit_index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_term(&self) -> Option<u64> {
        self.entries.last().map(|e| e.term)
    }
}
