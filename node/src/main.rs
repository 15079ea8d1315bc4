// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # chainwatch Node
//!
//! Entry point for the `chainwatch-node` binary. Parses CLI arguments,
//! initializes logging and metrics, drives a [`ChainWindow`] from a block
//! feed, and prints what the window ended up holding.
//!
//! The binary supports three subcommands:
//!
//! - `replay`  — replay a JSON-lines feed file
//! - `demo`    — synthesise a chain with one reorg and replay it
//! - `version` — print build version information
//!
//! Reorg handling is spelled out in the feed: an `unwind` event pops the
//! head, an `append` pushes a successor. Nothing here second-guesses that.

mod cli;
mod logging;
mod metrics;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;

use chainwatch_monitor::chain::{Block, BlockEvent, ChainWindow, RecordsExt};
use chainwatch_monitor::config::WindowConfig;
use chainwatch_monitor::feed::{self, FeedEvent, ReplayReport};

use cli::{ChainwatchCli, Commands};
use logging::LogFormat;
use metrics::WindowMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ChainwatchCli::parse();

    match cli.command {
        Commands::Replay(args) => {
            logging::init_logging(
                logging::DEFAULT_LOG_DIRECTIVES,
                LogFormat::from_str_lossy(&cli.log_format),
            );
            run_replay(args).await
        }
        Commands::Demo(args) => {
            logging::init_logging(
                logging::DEFAULT_LOG_DIRECTIVES,
                LogFormat::from_str_lossy(&cli.log_format),
            );
            run_demo(args)
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Replays a feed file and prints the summary.
async fn run_replay(args: cli::ReplayArgs) -> Result<()> {
    let config = WindowConfig::with_retention(args.retention);
    let metrics = WindowMetrics::new().context("failed to register metrics")?;

    let (window, report) = replay_file(&args.feed, &config, args.keep_going, &metrics).await?;

    print_summary(&window, &report);
    if args.print_blocks {
        print!("{}", window);
    }
    if args.print_metrics {
        println!("{}", metrics.encode().context("failed to encode metrics")?);
    }
    Ok(())
}

/// Reads, parses and replays `path` into a fresh window built from `config`.
async fn replay_file(
    path: &Path,
    config: &WindowConfig,
    keep_going: bool,
    metrics: &WindowMetrics,
) -> Result<(ChainWindow, ReplayReport)> {
    config.validate().context("invalid window configuration")?;

    let input = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read feed file {}", path.display()))?;
    let events = feed::parse_feed(&input)
        .with_context(|| format!("failed to parse feed file {}", path.display()))?;

    tracing::info!(
        feed = %path.display(),
        events = events.len(),
        retention = config.retention_limit,
        "replaying feed"
    );

    let window = ChainWindow::with_config(config);
    let report = drive(&window, events, keep_going, metrics)?;
    Ok((window, report))
}

/// Applies `events` in order, feeding every outcome to the metrics.
fn drive(
    window: &ChainWindow,
    events: Vec<FeedEvent>,
    keep_going: bool,
    metrics: &WindowMetrics,
) -> Result<ReplayReport> {
    let replayed = feed::replay_with(window, events, !keep_going, |_, outcome| {
        metrics.observe(outcome)
    });
    metrics.sync(window);

    let report = replayed?;
    window.trace_blocks();
    Ok(report)
}

/// Builds the `demo` event script: genesis plus `blocks` blocks, then a
/// competing branch that replaces the last `depth` of them with `depth + 1`
/// new blocks.
fn demo_events(blocks: u64, depth: u64, block_time: u64) -> Result<Vec<FeedEvent>> {
    if depth == 0 || depth > blocks {
        bail!("reorg depth must be between 1 and {} (got {})", blocks, depth);
    }

    let append = |block: Block| FeedEvent::Append {
        block,
        event: BlockEvent::Added,
        logs: Vec::new(),
        confirmed: false,
    };

    let genesis_time = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
    // The branch head sits `blocks + 1` steps past genesis in both number and time.
    let steps = blocks
        .checked_add(1)
        .with_context(|| format!("block count {} is too large", blocks))?;
    if block_time
        .checked_mul(steps)
        .and_then(|span| genesis_time.checked_add(span))
        .is_none()
    {
        bail!(
            "block time {}s over {} blocks overflows the timestamp range",
            block_time,
            steps
        );
    }

    let mut trunk = vec![Block::genesis(genesis_time)];
    for _ in 0..blocks {
        let next = Block::child_of(&trunk[trunk.len() - 1], block_time, Vec::new());
        trunk.push(next);
    }

    let mut events: Vec<FeedEvent> = trunk.iter().cloned().map(append).collect();
    events.extend((0..depth).map(|_| FeedEvent::Unwind));

    let mut parent = trunk[(blocks - depth) as usize].clone();
    for _ in 0..=depth {
        let next = Block::build_with_salt(
            parent.number() + 1,
            parent.hash(),
            parent.timestamp() + block_time,
            Vec::new(),
            b"demo-branch",
        );
        events.push(append(next.clone()));
        parent = next;
    }

    Ok(events)
}

/// Runs the synthetic reorg scenario and prints the summary.
fn run_demo(args: cli::DemoArgs) -> Result<()> {
    let config = WindowConfig::with_retention(args.retention);
    config.validate().context("invalid window configuration")?;
    let metrics = WindowMetrics::new().context("failed to register metrics")?;

    let events = demo_events(args.blocks, args.reorg_depth, args.block_time)?;
    tracing::info!(
        blocks = args.blocks,
        reorg_depth = args.reorg_depth,
        events = events.len(),
        "running demo"
    );

    let window = ChainWindow::with_config(&config);
    let report = drive(&window, events, false, &metrics)?;

    print_summary(&window, &report);
    if args.print_metrics {
        println!("{}", metrics.encode().context("failed to encode metrics")?);
    }
    Ok(())
}

/// Human-readable timestamp for the summary.
fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

/// Prints the window summary to stdout.
fn print_summary(window: &ChainWindow, report: &ReplayReport) {
    let snapshot = window.snapshot();

    println!("Replay finished.");
    println!(
        "  Events         : {} appended, {} unwound, {} resets, {} confirmed, {} rejected",
        report.appended, report.unwound, report.resets, report.confirmed, report.rejected
    );
    println!(
        "  Window         : {} / {} records",
        snapshot.len(),
        window.retention_limit()
    );
    match (snapshot.tail(), snapshot.head()) {
        (Some(tail), Some(head)) => {
            println!("  Tail           : #{} {}", tail.number(), tail.hash());
            println!(
                "  Head           : #{} {} ({})",
                head.number(),
                head.hash(),
                format_timestamp(head.timestamp())
            );
        }
        _ => println!("  Head           : (empty)"),
    }
    if let Some(latest) = snapshot.latest_canonical() {
        println!("  Latest added   : #{} {}", latest.number(), latest.block.hash().short());
    }
    println!("  Avg block time : {:.2}s", window.average_block_time());
    println!("  Reorg in range : {}", snapshot.has_removal());
    println!("  All confirmed  : {}", snapshot.all_confirmed());
}

/// Prints version information to stdout.
fn print_version() {
    println!("chainwatch-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc           {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
