//! # CLI Interface
//!
//! Defines the command-line argument structure for `chainwatch-node` using
//! `clap` derive. Supports three subcommands: `replay`, `demo`, and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use chainwatch_monitor::config::DEFAULT_RETENTION_LIMIT;

/// chainwatch replay tool.
///
/// Drives a bounded chain window from a scripted block feed and reports the
/// resulting head, tail, average block time and reorg state.
#[derive(Parser, Debug)]
#[command(
    name = "chainwatch-node",
    about = "Replay block feeds through a reorg-aware chain window",
    version,
    propagate_version = true
)]
pub struct ChainwatchCli {
    /// Log output format: "pretty" or "json".
    #[arg(long, global = true, env = "CHAINWATCH_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a JSON-lines feed file through a fresh window.
    Replay(ReplayArgs),
    /// Build a synthetic chain with one reorg and replay it.
    Demo(DemoArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `replay` subcommand.
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Path to the feed file (one JSON event per line).
    #[arg(long, short = 'f', env = "CHAINWATCH_FEED")]
    pub feed: PathBuf,

    /// Maximum number of records the window retains.
    #[arg(long, short = 'r', env = "CHAINWATCH_RETENTION", default_value_t = DEFAULT_RETENTION_LIMIT)]
    pub retention: usize,

    /// Count rejected appends and carry on instead of stopping at the first.
    #[arg(long)]
    pub keep_going: bool,

    /// Print the Prometheus text exposition after the summary.
    #[arg(long)]
    pub print_metrics: bool,

    /// Print every retained record after the summary.
    #[arg(long)]
    pub print_blocks: bool,
}

/// Arguments for the `demo` subcommand.
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Number of blocks on the initial chain after genesis.
    #[arg(long, default_value_t = 20)]
    pub blocks: u64,

    /// How many head blocks the competing branch replaces.
    #[arg(long, default_value_t = 3)]
    pub reorg_depth: u64,

    /// Seconds between synthetic blocks.
    #[arg(long, default_value_t = 12)]
    pub block_time: u64,

    /// Maximum number of records the window retains.
    #[arg(long, short = 'r', env = "CHAINWATCH_RETENTION", default_value_t = DEFAULT_RETENTION_LIMIT)]
    pub retention: usize,

    /// Print the Prometheus text exposition after the summary.
    #[arg(long)]
    pub print_metrics: bool,
}
