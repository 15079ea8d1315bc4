//! Block records and the pure helpers that operate on a retained sequence.
//!
//! A [`BlockRecord`] is one observed block plus what the monitor knows about
//! it: whether it entered or left the canonical view, the logs attached to
//! it, and whether it has passed the caller's confirmation policy.
//!
//! [`RecordsExt`] works on any slice of records, typically one obtained from
//! [`ChainWindow::snapshot`](super::ChainWindow::snapshot). It takes no locks.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::block::{Block, Log};
use crate::hash::H256;

/// Whether a record represents a block entering or leaving the canonical view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockEvent {
    Added,
    Removed,
}

impl fmt::Display for BlockEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => f.write_str("added"),
            Self::Removed => f.write_str("removed"),
        }
    }
}

/// One observed block plus monitor-assigned metadata.
///
/// The block body is immutable once decoded and is shared between the live
/// window and any copies. `logs` is owned per record, so cloning a record
/// never aliases the log buffer of the original.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockRecord {
    pub block: Arc<Block>,
    pub event: BlockEvent,
    pub logs: Vec<Log>,
    pub confirmed: bool,
}

impl BlockRecord {
    pub fn new(
        block: impl Into<Arc<Block>>,
        event: BlockEvent,
        logs: Vec<Log>,
        confirmed: bool,
    ) -> Self {
        Self {
            block: block.into(),
            event,
            logs,
            confirmed,
        }
    }

    /// A freshly added, unconfirmed record without logs.
    pub fn added(block: impl Into<Arc<Block>>) -> Self {
        Self::new(block, BlockEvent::Added, Vec::new(), false)
    }

    /// A freshly removed, unconfirmed record without logs.
    pub fn removed(block: impl Into<Arc<Block>>) -> Self {
        Self::new(block, BlockEvent::Removed, Vec::new(), false)
    }

    pub fn hash(&self) -> H256 {
        self.block.hash()
    }

    pub fn parent_hash(&self) -> H256 {
        self.block.parent_hash()
    }

    pub fn number(&self) -> u64 {
        self.block.number()
    }

    pub fn timestamp(&self) -> u64 {
        self.block.timestamp()
    }
}

/// Read-only queries over an ordered (tail → head) sequence of records.
pub trait RecordsExt {
    /// Most recently appended record, if any.
    fn head(&self) -> Option<&BlockRecord>;

    /// Oldest retained record, if any.
    fn tail(&self) -> Option<&BlockRecord>;

    /// Most recent record tagged [`BlockEvent::Added`].
    fn latest_canonical(&self) -> Option<&BlockRecord>;

    /// `true` iff every record is confirmed. Vacuously true when empty.
    fn all_confirmed(&self) -> bool;

    /// `true` iff any record is tagged [`BlockEvent::Removed`], i.e. a reorg
    /// touched the retained range.
    fn has_removal(&self) -> bool;

    /// Index of the most recent record with the given hash, optionally
    /// restricted to one event tag.
    fn find_index(&self, hash: &H256, event: Option<BlockEvent>) -> Option<usize>;

    /// Most recent record with the given hash, optionally restricted to one
    /// event tag.
    fn find(&self, hash: &H256, event: Option<BlockEvent>) -> Option<&BlockRecord>;

    /// `true` if a record with `block`'s hash and `event` exists and also
    /// sits at the same chain position (parent hash and number).
    fn event_exists(&self, block: &Block, event: BlockEvent) -> bool;
}

impl RecordsExt for [BlockRecord] {
    fn head(&self) -> Option<&BlockRecord> {
        self.last()
    }

    fn tail(&self) -> Option<&BlockRecord> {
        self.first()
    }

    fn latest_canonical(&self) -> Option<&BlockRecord> {
        self.iter().rev().find(|r| r.event == BlockEvent::Added)
    }

    fn all_confirmed(&self) -> bool {
        self.iter().all(|r| r.confirmed)
    }

    fn has_removal(&self) -> bool {
        self.iter().any(|r| r.event == BlockEvent::Removed)
    }

    fn find_index(&self, hash: &H256, event: Option<BlockEvent>) -> Option<usize> {
        self.iter()
            .rposition(|r| r.hash() == *hash && event.map_or(true, |e| r.event == e))
    }

    fn find(&self, hash: &H256, event: Option<BlockEvent>) -> Option<&BlockRecord> {
        self.find_index(hash, event).map(|i| &self[i])
    }

    fn event_exists(&self, block: &Block, event: BlockEvent) -> bool {
        self.find(&block.hash(), Some(event))
            .is_some_and(|r| r.parent_hash() == block.parent_hash() && r.number() == block.number())
    }
}
