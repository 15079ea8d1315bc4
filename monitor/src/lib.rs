// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # chainwatch — Core Library
//!
//! A bounded, reorg-aware window over the recent history of a blockchain's
//! canonical chain. An external block-feed observer appends blocks as they
//! arrive and unwinds them while resolving a reorg; any number of consumers
//! read the head and tail, look blocks and transactions up by hash, and read
//! a smoothed estimate of the time between blocks.
//!
//! ## Architecture
//!
//! - **chain** — Blocks, records and the [`ChainWindow`] itself.
//! - **feed** — JSON-lines scripted feeds and a replay driver.
//! - **hash** — The 32-byte digest type and BLAKE3 helpers.
//! - **config** — Retention constants and [`WindowConfig`].
//!
//! ## What this crate does not do
//!
//! It never talks to a node, never persists anything, and never decides that
//! a reorg is happening. It only refuses appends that do not link to the
//! current head, and leaves the unwinding to the caller.
//!
//! ```
//! use chainwatch_monitor::chain::{Block, BlockEvent, ChainWindow};
//!
//! let window = ChainWindow::new(64);
//! let genesis = Block::genesis(1_700_000_000);
//! let next = Block::child_of(&genesis, 12, vec![]);
//!
//! window.append(genesis, BlockEvent::Added, vec![], false).unwrap();
//! window.append(next.clone(), BlockEvent::Added, vec![], false).unwrap();
//!
//! assert_eq!(window.head().unwrap().hash(), next.hash());
//! assert_eq!(window.average_block_time(), 12.0);
//! ```

pub mod chain;
pub mod config;
pub mod feed;
pub mod hash;

pub use chain::{BlockEvent, BlockRecord, ChainWindow, RecordsExt, WindowError};
pub use config::WindowConfig;
pub use hash::H256;
