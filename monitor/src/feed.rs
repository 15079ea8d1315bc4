//! Scripted block feeds.
//!
//! A feed is a JSON-lines file where each line is one [`FeedEvent`] telling
//! the window what the observer saw: a block to append, an unwind, a reset,
//! or a confirmation. Reorg sequencing is explicit in the feed itself, e.g.
//!
//! ```text
//! {"op":"append","block":{...#100...}}
//! {"op":"append","block":{...#101a...}}
//! {"op":"unwind"}
//! {"op":"append","block":{...#101a...},"event":"removed"}
//! ```
//!
//! Used by the replay tool and by tests that want to drive a window from a
//! fixture instead of hand-written calls.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::chain::{Block, BlockEvent, ChainWindow, Log, WindowError};
use crate::config::FEED_COMMENT_PREFIX;
use crate::hash::H256;

/// One observer action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FeedEvent {
    Append {
        block: Block,
        #[serde(default = "default_event")]
        event: BlockEvent,
        #[serde(default)]
        logs: Vec<Log>,
        #[serde(default)]
        confirmed: bool,
    },
    Unwind,
    Reset,
    Confirm {
        hash: H256,
        #[serde(default = "default_event")]
        event: BlockEvent,
    },
}

fn default_event() -> BlockEvent {
    BlockEvent::Added
}

/// Errors raised while reading or replaying a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("feed event {index} rejected: {source}")]
    Rejected {
        index: usize,
        #[source]
        source: WindowError,
    },
}

/// What applying a single event did to the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Appended { number: u64, event: BlockEvent },
    /// Number of the record popped, `None` if the window was already empty.
    Unwound(Option<u64>),
    Reset,
    /// Whether a matching record was found.
    Confirmed(bool),
}

/// Counters accumulated over a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub appended: usize,
    pub unwound: usize,
    pub resets: usize,
    pub confirmed: usize,
    pub rejected: usize,
}

impl ReplayReport {
    /// Fold one outcome into the counters.
    pub fn record(&mut self, outcome: &Result<Applied, WindowError>) {
        match outcome {
            Ok(Applied::Appended { .. }) => self.appended += 1,
            Ok(Applied::Unwound(Some(_))) => self.unwound += 1,
            Ok(Applied::Unwound(None)) => {}
            Ok(Applied::Reset) => self.resets += 1,
            Ok(Applied::Confirmed(found)) => self.confirmed += usize::from(*found),
            Err(_) => self.rejected += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.appended + self.unwound + self.resets + self.confirmed + self.rejected
    }
}

/// Parse a JSON-lines feed. Blank lines and `#` comments are skipped; errors
/// carry the 1-based line number.
pub fn parse_feed(input: &str) -> Result<Vec<FeedEvent>, FeedError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with(FEED_COMMENT_PREFIX)
        })
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| FeedError::Parse {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

/// Apply one event to `window`.
pub fn apply(window: &ChainWindow, event: FeedEvent) -> Result<Applied, WindowError> {
    match event {
        FeedEvent::Append {
            block,
            event,
            logs,
            confirmed,
        } => {
            let number = block.number();
            window.append(block, event, logs, confirmed)?;
            Ok(Applied::Appended { number, event })
        }
        FeedEvent::Unwind => Ok(Applied::Unwound(window.unwind().map(|r| r.number()))),
        FeedEvent::Reset => {
            window.reset();
            Ok(Applied::Reset)
        }
        FeedEvent::Confirm { hash, event } => {
            Ok(Applied::Confirmed(window.mark_confirmed(&hash, event)))
        }
    }
}

/// Apply `events` in order.
///
/// With `stop_on_error` the first rejected append aborts the replay and is
/// returned as [`FeedError::Rejected`]; otherwise rejections are counted and
/// the replay carries on.
pub fn replay(
    window: &ChainWindow,
    events: impl IntoIterator<Item = FeedEvent>,
    stop_on_error: bool,
) -> Result<ReplayReport, FeedError> {
    replay_with(window, events, stop_on_error, |_, _| {})
}

/// Like [`replay`], but hands every outcome to `observe` (with the event's
/// index) before it is counted, including the one that aborts the replay.
pub fn replay_with<F>(
    window: &ChainWindow,
    events: impl IntoIterator<Item = FeedEvent>,
    stop_on_error: bool,
    mut observe: F,
) -> Result<ReplayReport, FeedError>
where
    F: FnMut(usize, &Result<Applied, WindowError>),
{
    let mut report = ReplayReport::default();

    for (index, event) in events.into_iter().enumerate() {
        let outcome = apply(window, event);
        observe(index, &outcome);
        report.record(&outcome);
        if let Err(source) = outcome {
            if stop_on_error {
                return Err(FeedError::Rejected { index, source });
            }
            warn!(index, error = %source, "skipping rejected event");
        }
    }

    info!(
        appended = report.appended,
        unwound = report.unwound,
        rejected = report.rejected,
        "feed replayed"
    );
    Ok(report)
}
