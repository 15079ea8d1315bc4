//! Bounded, reorg-aware window over the recent canonical chain.
//!
//! The window is a stack of [`BlockRecord`]s ordered tail (oldest) to head
//! (newest). The feed observer pushes a record when a block enters or leaves
//! the canonical view and pops records while rolling back to a common
//! ancestor. Every push must be a valid successor of the current head; the
//! window never decides on its own that a reorg is happening.
//!
//! ## Concurrency
//!
//! All state sits behind a single `parking_lot::Mutex`. Every public method
//! holds it for its whole body and does nothing but in-memory work while it
//! does, so one producer and any number of readers can share an
//! `Arc<ChainWindow>` without further coordination.
//!
//! Records handed out (`head`, `tail`, `snapshot`, the finders) are clones:
//! the immutable block body is shared, logs are copied, so later mutation of
//! the live window is never observable through them.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::block::{Block, Log, Transaction};
use super::error::WindowError;
use super::record::{BlockEvent, BlockRecord, RecordsExt};
use crate::config::WindowConfig;
use crate::hash::H256;

/// Everything guarded by the window lock.
#[derive(Debug, Default)]
struct WindowState {
    /// Retained records, tail at the front, head at the back.
    records: VecDeque<BlockRecord>,
    /// Smoothed seconds between consecutive appends. Zero until seeded.
    average_block_time: f64,
}

impl WindowState {
    /// Retained records as one tail-to-head slice, for [`RecordsExt`] queries.
    fn as_slice(&mut self) -> &mut [BlockRecord] {
        self.records.make_contiguous()
    }

    fn find_mut(&mut self, hash: &H256, event: BlockEvent) -> Option<&mut BlockRecord> {
        let records = self.as_slice();
        let index = records.find_index(hash, Some(event))?;
        records.get_mut(index)
    }

    /// Continuity check against the current head. Passes trivially when empty.
    fn validate_successor(&self, next: &Block) -> Result<(), WindowError> {
        let Some(head) = self.records.back() else {
            return Ok(());
        };

        if next.parent_hash() != head.hash() {
            return Err(WindowError::UnexpectedParentHash {
                expected: head.hash(),
                got: next.parent_hash(),
            });
        }

        let expected = head
            .number()
            .checked_add(1)
            .ok_or(WindowError::BlockNumberExhausted {
                head: head.number(),
                got: next.number(),
            })?;
        if next.number() != expected {
            return Err(WindowError::UnexpectedBlockNumber {
                expected,
                got: next.number(),
            });
        }

        Ok(())
    }

    fn update_average(&mut self, next: &Block) {
        let Some(head) = self.records.back() else {
            return;
        };
        // A timestamp that goes backwards counts as zero elapsed time.
        let elapsed = next.timestamp().saturating_sub(head.timestamp()) as f64;
        self.average_block_time = if self.average_block_time == 0.0 {
            elapsed
        } else {
            (self.average_block_time + elapsed) / 2.0
        };
    }
}

/// Bounded in-memory window over the most recently observed blocks.
pub struct ChainWindow {
    state: Mutex<WindowState>,
    retention_limit: usize,
}

impl fmt::Debug for ChainWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ChainWindow")
            .field("len", &state.records.len())
            .field("retention_limit", &self.retention_limit)
            .field("average_block_time", &state.average_block_time)
            .finish()
    }
}

/// One `<- [number] hash` line per record, tail first.
impl fmt::Display for ChainWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        for record in &state.records {
            writeln!(f, "<- [{}] {}", record.number(), record.hash())?;
        }
        Ok(())
    }
}

impl ChainWindow {
    /// Creates an empty window retaining at most `retention_limit` records.
    ///
    /// A limit of zero is raised to one so the head is always retained.
    pub fn new(retention_limit: usize) -> Self {
        let retention_limit = retention_limit.max(1);
        Self {
            state: Mutex::new(WindowState {
                records: VecDeque::with_capacity(retention_limit),
                average_block_time: 0.0,
            }),
            retention_limit,
        }
    }

    /// Creates an empty window from a validated [`WindowConfig`].
    pub fn with_config(config: &WindowConfig) -> Self {
        Self::new(config.retention_limit)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Appends `block` at the head.
    ///
    /// When the window is non-empty the block must point at the current head
    /// (`UnexpectedParentHash`) and carry the next number
    /// (`UnexpectedBlockNumber`). The check is the same for both event tags.
    /// On failure nothing changes, the average block time included.
    ///
    /// On success the average block time is updated from the timestamp delta
    /// to the previous head and, if the window is over its limit, the tail
    /// record is dropped.
    pub fn append(
        &self,
        block: impl Into<Arc<Block>>,
        event: BlockEvent,
        logs: Vec<Log>,
        confirmed: bool,
    ) -> Result<(), WindowError> {
        self.push(BlockRecord::new(block, event, logs, confirmed))
    }

    /// Appends an already assembled record. Same contract as [`append`](Self::append).
    pub fn push(&self, record: BlockRecord) -> Result<(), WindowError> {
        let mut state = self.state.lock();

        if let Err(err) = state.validate_successor(&record.block) {
            warn!(
                number = record.number(),
                hash = %record.hash(),
                event = %record.event,
                error = %err,
                "rejected block append"
            );
            return Err(err);
        }

        state.update_average(&record.block);

        debug!(
            number = record.number(),
            hash = %record.hash(),
            event = %record.event,
            "block appended"
        );
        state.records.push_back(record);

        while state.records.len() > self.retention_limit {
            if let Some(evicted) = state.records.pop_front() {
                trace!(number = evicted.number(), hash = %evicted.hash(), "evicted tail record");
            }
        }

        Ok(())
    }

    /// Removes and returns the head record, or `None` when empty.
    ///
    /// No validation: this is the rollback primitive the observer uses to
    /// unwind to a common ancestor before appending the new canonical segment.
    /// The average block time is left as is.
    pub fn unwind(&self) -> Option<BlockRecord> {
        let record = self.state.lock().records.pop_back()?;
        debug!(
            number = record.number(),
            hash = %record.hash(),
            event = %record.event,
            "block unwound"
        );
        Some(record)
    }

    /// Drops every record and clears the average block time.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let dropped = state.records.len();
        state.records.clear();
        state.average_block_time = 0.0;
        debug!(dropped, "window reset");
    }

    /// Sets the confirmation flag on the most recent record with this hash
    /// and event. Returns `false` if no such record is retained.
    pub fn mark_confirmed(&self, hash: &H256, event: BlockEvent) -> bool {
        match self.state.lock().find_mut(hash, event) {
            Some(record) => {
                record.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Replaces the logs of the most recent record with this hash and event.
    /// Returns `false` if no such record is retained.
    pub fn attach_logs(&self, hash: &H256, event: BlockEvent, logs: Vec<Log>) -> bool {
        match self.state.lock().find_mut(hash, event) {
            Some(record) => {
                record.logs = logs;
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Most recently appended record.
    pub fn head(&self) -> Option<BlockRecord> {
        self.state.lock().records.back().cloned()
    }

    /// Oldest retained record.
    pub fn tail(&self) -> Option<BlockRecord> {
        self.state.lock().records.front().cloned()
    }

    /// Copy of every retained record, tail to head.
    pub fn snapshot(&self) -> Vec<BlockRecord> {
        self.state.lock().records.iter().cloned().collect()
    }

    /// Most recent record with `hash`; if `event` is given it must match too.
    pub fn find_by_hash(&self, hash: &H256, event: Option<BlockEvent>) -> Option<BlockRecord> {
        self.state.lock().as_slice().find(hash, event).cloned()
    }

    /// Most recent record with exactly this number and event.
    ///
    /// The event is mandatory: after a reorg the same number appears under
    /// both tags.
    pub fn find_by_number(&self, number: u64, event: BlockEvent) -> Option<BlockRecord> {
        self.state
            .lock()
            .records
            .iter()
            .rev()
            .find(|r| r.number() == number && r.event == event)
            .cloned()
    }

    /// First transaction with `hash`, scanning records head to tail.
    pub fn find_transaction(&self, hash: &H256) -> Option<Transaction> {
        let state = self.state.lock();
        state
            .records
            .iter()
            .rev()
            .flat_map(|r| r.block.transactions.iter())
            .find(|tx| tx.hash == *hash)
            .cloned()
    }

    /// `true` if a record for `block` with `event` is retained at the same
    /// chain position (hash, parent hash and number all agree).
    pub fn record_exists_with_tag(&self, block: &Block, event: BlockEvent) -> bool {
        self.state.lock().as_slice().event_exists(block, event)
    }

    /// Smoothed seconds between blocks; zero until two appends with a
    /// positive delta have been seen.
    pub fn average_block_time(&self) -> f64 {
        self.state.lock().average_block_time
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    pub fn retention_limit(&self) -> usize {
        self.retention_limit
    }

    /// Emits every retained record at debug level, tail first.
    pub fn trace_blocks(&self) {
        let state = self.state.lock();
        for record in &state.records {
            debug!(
                number = record.number(),
                hash = %record.hash(),
                event = %record.event,
                confirmed = record.confirmed,
                "window record"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::block::BlockHeader;

    fn chain_from(start: &Block, len: usize, elapsed: u64) -> Vec<Block> {
        let mut blocks = Vec::with_capacity(len);
        let mut parent = start.clone();
        for _ in 0..len {
            let next = Block::child_of(&parent, elapsed, vec![]);
            blocks.push(next.clone());
            parent = next;
        }
        blocks
    }

    fn add(window: &ChainWindow, block: &Block) {
        window
            .append(block.clone(), BlockEvent::Added, vec![], false)
            .expect("append");
    }

    fn sample_log(byte: u8) -> Log {
        Log {
            address: "0xfeed".into(),
            topics: vec![H256([byte; 32])],
            data: vec![byte],
            transaction_hash: H256([byte; 32]),
            log_index: byte as u64,
            removed: false,
        }
    }

    #[test]
    fn empty_window_queries_are_absent() {
        let window = ChainWindow::new(10);
        assert!(window.head().is_none());
        assert!(window.tail().is_none());
        assert!(window.find_by_hash(&H256::ZERO, None).is_none());
        assert!(window.find_by_number(0, BlockEvent::Added).is_none());
        assert!(window.find_transaction(&H256::ZERO).is_none());
        assert!(window.unwind().is_none());
        assert!(window.snapshot().is_empty());
        assert_eq!(window.average_block_time(), 0.0);
    }

    #[test]
    fn first_append_is_unconditional() {
        let window = ChainWindow::new(10);
        // Any block is accepted onto an empty window, genesis or not.
        let b = Block::build_with_salt(500, H256([9; 32]), 1_000, vec![], b"x");
        add(&window, &b);
        assert_eq!(window.head().unwrap().hash(), b.hash());
        assert_eq!(window.average_block_time(), 0.0);
    }

    #[test]
    fn rejects_wrong_parent_hash() {
        let window = ChainWindow::new(10);
        let g = Block::genesis(0);
        add(&window, &g);

        let orphan = Block::build_with_salt(1, H256([7; 32]), 12, vec![], b"");
        let err = window
            .append(orphan, BlockEvent::Added, vec![], false)
            .unwrap_err();
        assert_eq!(
            err,
            WindowError::UnexpectedParentHash {
                expected: g.hash(),
                got: H256([7; 32]),
            }
        );
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn rejects_wrong_block_number() {
        let window = ChainWindow::new(10);
        let g = Block::genesis(0);
        add(&window, &g);

        let skip = Block::build_with_salt(2, g.hash(), 12, vec![], b"");
        let err = window
            .append(skip, BlockEvent::Added, vec![], false)
            .unwrap_err();
        assert_eq!(
            err,
            WindowError::UnexpectedBlockNumber {
                expected: 1,
                got: 2
            }
        );
    }

    #[test]
    fn rejects_successor_of_max_numbered_head() {
        let window = ChainWindow::new(10);
        let last = Block::build_with_salt(u64::MAX, H256::ZERO, 0, vec![], b"");
        add(&window, &last);

        // Number 0 pointing at the head must not pass as a wrapped successor.
        let wrapped = Block::build_with_salt(0, last.hash(), 12, vec![], b"");
        let err = window
            .append(wrapped, BlockEvent::Added, vec![], false)
            .unwrap_err();
        assert_eq!(
            err,
            WindowError::BlockNumberExhausted {
                head: u64::MAX,
                got: 0
            }
        );
        assert_eq!(window.len(), 1);
        assert_eq!(window.head().unwrap().hash(), last.hash());
        assert_eq!(window.average_block_time(), 0.0);
    }

    #[test]
    fn removed_tag_is_validated_like_added() {
        let window = ChainWindow::new(10);
        let g = Block::genesis(0);
        add(&window, &g);

        let stray = Block::build_with_salt(1, H256([3; 32]), 12, vec![], b"");
        assert!(window
            .append(stray, BlockEvent::Removed, vec![], false)
            .is_err());
    }

    #[test]
    fn rejection_leaves_state_untouched() {
        let window = ChainWindow::new(10);
        let g = Block::genesis(0);
        add(&window, &g);
        for b in chain_from(&g, 3, 10) {
            add(&window, &b);
        }
        let before_snapshot = window.snapshot();
        let before_avg = window.average_block_time();

        let bad = Block::build_with_salt(4, H256([1; 32]), 10_000, vec![], b"");
        assert!(window.append(bad, BlockEvent::Added, vec![], false).is_err());

        assert_eq!(window.snapshot(), before_snapshot);
        assert_eq!(window.average_block_time().to_bits(), before_avg.to_bits());
    }

    #[test]
    fn average_block_time_formula() {
        let window = ChainWindow::new(10);
        let a = Block::genesis(1_000);
        let b = Block::child_of(&a, 10, vec![]);
        let c = Block::child_of(&b, 30, vec![]);

        add(&window, &a);
        assert_eq!(window.average_block_time(), 0.0);
        add(&window, &b);
        assert_eq!(window.average_block_time(), 10.0);
        add(&window, &c);
        assert_eq!(window.average_block_time(), 20.0);
    }

    #[test]
    fn zero_delta_does_not_seed_average() {
        let window = ChainWindow::new(10);
        let a = Block::genesis(100);
        let b = Block::child_of(&a, 0, vec![]);
        let c = Block::child_of(&b, 6, vec![]);
        add(&window, &a);
        add(&window, &b);
        assert_eq!(window.average_block_time(), 0.0);
        add(&window, &c);
        assert_eq!(window.average_block_time(), 6.0);
    }

    #[test]
    fn backwards_timestamp_counts_as_zero() {
        let window = ChainWindow::new(10);
        let a = Block::genesis(100);
        let b = Block::build_with_salt(1, a.hash(), 40, vec![], b"");
        add(&window, &a);
        add(&window, &b);
        assert_eq!(window.average_block_time(), 0.0);
    }

    #[test]
    fn retention_evicts_oldest_first() {
        let window = ChainWindow::new(3);
        let g = Block::genesis(0);
        add(&window, &g);
        let rest = chain_from(&g, 4, 12);
        for b in &rest {
            add(&window, b);
            assert!(window.len() <= 3);
        }

        let snapshot = window.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.tail().unwrap().number(), 2);
        assert_eq!(snapshot.head().unwrap().number(), 4);
        assert!(window.find_by_hash(&g.hash(), None).is_none());
    }

    #[test]
    fn zero_retention_is_raised_to_one() {
        let window = ChainWindow::new(0);
        assert_eq!(window.retention_limit(), 1);
        let g = Block::genesis(0);
        add(&window, &g);
        add(&window, &Block::child_of(&g, 1, vec![]));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn unwind_after_append_restores_previous_state() {
        let window = ChainWindow::new(10);
        let g = Block::genesis(0);
        add(&window, &g);
        let before = window.snapshot();

        let b = Block::child_of(&g, 12, vec![]);
        window
            .append(b.clone(), BlockEvent::Added, vec![sample_log(1)], true)
            .unwrap();

        let popped = window.unwind().expect("record");
        assert_eq!(*popped.block, b);
        assert_eq!(popped.event, BlockEvent::Added);
        assert_eq!(popped.logs, vec![sample_log(1)]);
        assert!(popped.confirmed);
        assert_eq!(window.snapshot(), before);
    }

    #[test]
    fn reset_clears_records_and_average() {
        let window = ChainWindow::new(10);
        let g = Block::genesis(0);
        add(&window, &g);
        add(&window, &Block::child_of(&g, 5, vec![]));
        assert!(window.average_block_time() > 0.0);

        window.reset();
        assert!(window.is_empty());
        assert!(window.head().is_none());
        assert_eq!(window.average_block_time(), 0.0);

        // Continuity restarts from scratch after a reset.
        add(&window, &Block::genesis(99));
    }

    #[test]
    fn head_and_tail() {
        let window = ChainWindow::new(10);
        let g = Block::genesis(0);
        add(&window, &g);
        let rest = chain_from(&g, 2, 12);
        for b in &rest {
            add(&window, b);
        }
        assert_eq!(window.tail().unwrap().hash(), g.hash());
        assert_eq!(window.head().unwrap().hash(), rest[1].hash());
    }

    #[test]
    fn find_by_hash_prefers_most_recent() {
        let window = ChainWindow::new(10);
        let g = Block::genesis(0);
        add(&window, &g);

        // Feed hashes are opaque, so the same hash can be reported at two
        // consecutive positions under different tags.
        let shared = H256([0x42; 32]);
        let first = Block::with_header(
            BlockHeader {
                number: 1,
                hash: shared,
                parent_hash: g.hash(),
                timestamp: 12,
            },
            vec![],
        );
        let second = Block::with_header(
            BlockHeader {
                number: 2,
                hash: shared,
                parent_hash: shared,
                timestamp: 24,
            },
            vec![],
        );
        window
            .append(first.clone(), BlockEvent::Added, vec![], false)
            .unwrap();
        window
            .append(second.clone(), BlockEvent::Removed, vec![], false)
            .unwrap();

        let found = window.find_by_hash(&shared, None).unwrap();
        assert_eq!(found.event, BlockEvent::Removed);
        assert_eq!(found.number(), 2);

        let added = window.find_by_hash(&shared, Some(BlockEvent::Added)).unwrap();
        assert_eq!(added.number(), 1);

        // The hash matches an Added record, but not at this chain position.
        assert!(window.record_exists_with_tag(&first, BlockEvent::Added));
        assert!(!window.record_exists_with_tag(&second, BlockEvent::Added));
    }

    #[test]
    fn find_by_number_requires_matching_event() {
        let window = ChainWindow::new(10);
        let g = Block::genesis(0);
        let b = Block::child_of(&g, 12, vec![]);
        add(&window, &g);
        add(&window, &b);

        assert_eq!(
            window.find_by_number(1, BlockEvent::Added).unwrap().hash(),
            b.hash()
        );
        assert!(window.find_by_number(1, BlockEvent::Removed).is_none());
        assert!(window.find_by_number(2, BlockEvent::Added).is_none());
    }

    #[test]
    fn find_transaction_scans_all_blocks() {
        let window = ChainWindow::new(10);
        let g = Block::genesis(0);
        let tx1 = Transaction::transfer("alice", "bob", 10, 0);
        let tx2 = Transaction::transfer("bob", "carol", 5, 0);
        let b1 = Block::child_of(&g, 12, vec![tx1.clone()]);
        let b2 = Block::child_of(&b1, 12, vec![tx2.clone()]);
        add(&window, &g);
        add(&window, &b1);
        add(&window, &b2);

        assert_eq!(window.find_transaction(&tx1.hash), Some(tx1));
        assert_eq!(window.find_transaction(&tx2.hash), Some(tx2));
        assert!(window.find_transaction(&H256([0xEE; 32])).is_none());
    }

    #[test]
    fn record_exists_with_tag_checks_position() {
        let window = ChainWindow::new(10);
        let g = Block::genesis(0);
        let b = Block::child_of(&g, 12, vec![]);
        add(&window, &g);
        add(&window, &b);

        assert!(window.record_exists_with_tag(&b, BlockEvent::Added));
        assert!(!window.record_exists_with_tag(&b, BlockEvent::Removed));

        let mut moved = b.clone();
        moved.header.parent_hash = H256([5; 32]);
        assert!(!window.record_exists_with_tag(&moved, BlockEvent::Added));
    }

    #[test]
    fn snapshot_is_isolated_from_later_mutation() {
        let window = ChainWindow::new(10);
        let g = Block::genesis(0);
        window
            .append(g.clone(), BlockEvent::Added, vec![sample_log(1)], false)
            .unwrap();

        let snapshot = window.snapshot();

        assert!(window.mark_confirmed(&g.hash(), BlockEvent::Added));
        assert!(window.attach_logs(&g.hash(), BlockEvent::Added, vec![sample_log(2), sample_log(3)]));
        add(&window, &Block::child_of(&g, 1, vec![]));

        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot[0].confirmed);
        assert_eq!(snapshot[0].logs, vec![sample_log(1)]);

        let live = window.head().unwrap();
        assert_eq!(live.number(), 1);
        assert_eq!(window.tail().unwrap().logs.len(), 2);
        assert!(window.tail().unwrap().confirmed);
    }

    #[test]
    fn mark_confirmed_reports_missing_record() {
        let window = ChainWindow::new(10);
        assert!(!window.mark_confirmed(&H256::ZERO, BlockEvent::Added));
        assert!(!window.attach_logs(&H256::ZERO, BlockEvent::Added, vec![]));
    }

    #[test]
    fn display_lists_records_tail_first() {
        let window = ChainWindow::new(10);
        let g = Block::genesis(0);
        let b = Block::child_of(&g, 12, vec![]);
        add(&window, &g);
        add(&window, &b);

        let rendered = window.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("<- [0] {}", g.hash()));
        assert_eq!(lines[1], format!("<- [1] {}", b.hash()));
    }

    #[test]
    fn lookups_survive_ring_wraparound() {
        let window = ChainWindow::new(4);
        let g = Block::genesis(0);
        add(&window, &g);
        let rest = chain_from(&g, 9, 12);
        for block in &rest {
            add(&window, block);
        }
        // Unwind and re-append so the ring buffer is no longer laid out
        // tail-first before the lookups run.
        window.unwind();
        add(&window, &rest[8]);

        let kept = &rest[5..];
        for block in kept {
            assert_eq!(
                window
                    .find_by_hash(&block.hash(), Some(BlockEvent::Added))
                    .unwrap()
                    .number(),
                block.number()
            );
            assert!(window.record_exists_with_tag(block, BlockEvent::Added));
        }
        assert!(window.find_by_hash(&rest[4].hash(), None).is_none());

        assert!(window.mark_confirmed(&rest[6].hash(), BlockEvent::Added));
        let numbers: Vec<(u64, bool)> = window
            .snapshot()
            .iter()
            .map(|r| (r.number(), r.confirmed))
            .collect();
        assert_eq!(numbers, vec![(6, false), (7, true), (8, false), (9, false)]);
    }
}
