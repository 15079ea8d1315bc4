//! # Chain Module
//!
//! The in-memory view of the recent canonical chain.
//!
//! ## Architecture
//!
//! ```text
//! block.rs   — Decoded block, transaction and log types
//! record.rs  — BlockRecord (block + event tag + logs + confirmation) and
//!              lock-free helpers over record sequences
//! window.rs  — ChainWindow: bounded, locked stack of records
//! error.rs   — Append rejection reasons
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! feed observer ──append/unwind──▶ ChainWindow ──snapshot──▶ [BlockRecord]
//!                                      │                        │
//!                                  find_* / head              RecordsExt
//! ```
//!
//! The window enforces parent/number continuity on every append and nothing
//! else. Deciding that a reorg happened, and how deep, belongs to the
//! observer that drives it.

pub mod block;
pub mod error;
pub mod record;
pub mod window;

pub use block::{is_block_eq, Block, BlockHeader, Log, Transaction};
pub use error::WindowError;
pub use record::{BlockEvent, BlockRecord, RecordsExt};
pub use window::ChainWindow;
