//! # Window Configuration & Constants
//!
//! Every tunable of the chain window lives here. Callers that do not care
//! take [`WindowConfig::default`]; the replay tool maps its CLI flags onto
//! the same struct.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retention
// ---------------------------------------------------------------------------

/// Default number of records retained. Comfortably deeper than the reorgs
/// seen on the usual EVM chains while keeping linear scans trivial.
pub const DEFAULT_RETENTION_LIMIT: usize = 100;

/// A window must be able to hold at least its head.
pub const MIN_RETENTION_LIMIT: usize = 1;

/// Upper bound on retention. Every lookup is a linear scan under the lock,
/// so the window is meant to stay in the tens to hundreds of records.
pub const MAX_RETENTION_LIMIT: usize = 10_000;

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// Lines in a feed file starting with this prefix are ignored.
pub const FEED_COMMENT_PREFIX: char = '#';

// ---------------------------------------------------------------------------
// WindowConfig
// ---------------------------------------------------------------------------

/// Errors produced by [`WindowConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("retention limit {got} is outside the supported range {min}..={max}")]
    RetentionOutOfRange { got: usize, min: usize, max: usize },
}

/// Tunable parameters for a [`ChainWindow`](crate::chain::ChainWindow).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Maximum number of records retained; the oldest go first.
    pub retention_limit: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            retention_limit: DEFAULT_RETENTION_LIMIT,
        }
    }
}

impl WindowConfig {
    pub fn with_retention(retention_limit: usize) -> Self {
        Self { retention_limit }
    }

    /// Reject configurations the window cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_RETENTION_LIMIT..=MAX_RETENTION_LIMIT).contains(&self.retention_limit) {
            return Err(ConfigError::RetentionOutOfRange {
                got: self.retention_limit,
                min: MIN_RETENTION_LIMIT,
                max: MAX_RETENTION_LIMIT,
            });
        }
        Ok(())
    }
}
