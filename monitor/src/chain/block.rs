//! # Block Structure
//!
//! A decoded chain block as reported by the block-feed observer: a header
//! that links the block to its parent, plus the ordered transaction list.
//!
//! ## Block Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  BlockHeader                                │
//! │  ├── number: u64                            │
//! │  ├── hash: H256                             │
//! │  ├── parent_hash: H256                      │
//! │  └── timestamp: u64       (unix seconds)    │
//! ├─────────────────────────────────────────────┤
//! │  transactions: Vec<Transaction>             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Blocks from a feed carry the hash the node reported and are never
//! re-hashed here. The constructors below compute a BLAKE3 header hash over
//! `number || parent_hash || timestamp || tx hashes` so synthetic chains get
//! unique, deterministic identities.

use serde::{Deserialize, Serialize};

use crate::hash::{blake3_hash_multi, hex_bytes, H256};

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A transaction included in a block. Identity is `hash`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: H256,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub value: u64,
    #[serde(default)]
    pub nonce: u64,
}

impl Transaction {
    /// Build a transfer and derive its hash from the sender, receiver,
    /// value and nonce.
    pub fn transfer(from: &str, to: &str, value: u64, nonce: u64) -> Self {
        let hash = blake3_hash_multi(&[
            from.as_bytes(),
            to.as_bytes(),
            &value.to_le_bytes(),
            &nonce.to_le_bytes(),
        ]);
        Self {
            hash,
            from: from.to_string(),
            to: Some(to.to_string()),
            value,
            nonce,
        }
    }
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// An event-log entry emitted while executing a block's transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<H256>,
    #[serde(default, with = "hex_bytes")]
    pub data: Vec<u8>,
    pub transaction_hash: H256,
    #[serde(default)]
    pub log_index: u64,
    /// Set by nodes on logs delivered again because their block was reorged out.
    #[serde(default)]
    pub removed: bool,
}

// ---------------------------------------------------------------------------
// BlockHeader
// ---------------------------------------------------------------------------

/// Chain linkage and timing for a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block number (genesis = 0).
    pub number: u64,
    /// Hash reported for this block.
    pub hash: H256,
    /// Hash of the parent block. Zero for genesis.
    pub parent_hash: H256,
    /// Unix timestamp (seconds) the block was produced at.
    pub timestamp: u64,
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A full decoded block: header + ordered transaction list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Wrap an externally decoded header and transaction list.
    pub fn with_header(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    /// A synthetic genesis block at `timestamp`.
    pub fn genesis(timestamp: u64) -> Self {
        Self::build(0, H256::ZERO, timestamp, Vec::new())
    }

    /// A synthetic block extending `parent`, produced `elapsed` seconds later.
    ///
    /// Number and timestamp saturate at `u64::MAX`; a window rejects such a
    /// child of a max-numbered parent instead of accepting a wrapped one.
    pub fn child_of(parent: &Block, elapsed: u64, transactions: Vec<Transaction>) -> Self {
        Self::build(
            parent.number().saturating_add(1),
            parent.hash(),
            parent.timestamp().saturating_add(elapsed),
            transactions,
        )
    }

    /// A synthetic block with explicit linkage. `salt` distinguishes sibling
    /// blocks that share a parent, number and timestamp (competing forks).
    pub fn build_with_salt(
        number: u64,
        parent_hash: H256,
        timestamp: u64,
        transactions: Vec<Transaction>,
        salt: &[u8],
    ) -> Self {
        let hash = compute_header_hash(number, &parent_hash, timestamp, &transactions, salt);
        Self {
            header: BlockHeader {
                number,
                hash,
                parent_hash,
                timestamp,
            },
            transactions,
        }
    }

    fn build(number: u64, parent_hash: H256, timestamp: u64, transactions: Vec<Transaction>) -> Self {
        Self::build_with_salt(number, parent_hash, timestamp, transactions, &[])
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn hash(&self) -> H256 {
        self.header.hash
    }

    pub fn parent_hash(&self) -> H256 {
        self.header.parent_hash
    }

    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    /// Return the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Returns `true` if `self` is the direct successor of `parent`.
    pub fn extends(&self, parent: &Block) -> bool {
        self.parent_hash() == parent.hash() && self.number() == parent.number() + 1
    }
}

/// Two blocks are the same chain position when hash, number and parent hash
/// all agree. Absent blocks never compare equal.
pub fn is_block_eq(a: Option<&Block>, b: Option<&Block>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            a.hash() == b.hash() && a.number() == b.number() && a.parent_hash() == b.parent_hash()
        }
        _ => false,
    }
}

fn compute_header_hash(
    number: u64,
    parent_hash: &H256,
    timestamp: u64,
    transactions: &[Transaction],
    salt: &[u8],
) -> H256 {
    let number_bytes = number.to_le_bytes();
    let timestamp_bytes = timestamp.to_le_bytes();
    let mut parts: Vec<&[u8]> = Vec::with_capacity(4 + transactions.len());
    parts.push(&number_bytes);
    parts.push(parent_hash.as_bytes());
    parts.push(&timestamp_bytes);
    for tx in transactions {
        parts.push(tx.hash.as_bytes());
    }
    parts.push(salt);
    blake3_hash_multi(&parts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
