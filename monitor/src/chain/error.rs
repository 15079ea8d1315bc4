//! Errors returned by window mutations.

use thiserror::Error;

use crate::hash::H256;

/// Why an append was refused. The window is left untouched in every case;
/// the caller resolves the mismatch (typically by unwinding) and retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// The new block does not point at the current head.
    #[error("unexpected parent hash: head is {expected}, block points at {got}")]
    UnexpectedParentHash { expected: H256, got: H256 },

    /// The new block's number does not immediately follow the head's.
    #[error("unexpected block number: expected {expected}, got {got}")]
    UnexpectedBlockNumber { expected: u64, got: u64 },

    /// The head already carries the largest representable block number.
    #[error("block number space exhausted: head is #{head}, got #{got}")]
    BlockNumberExhausted { head: u64, got: u64 },
}
