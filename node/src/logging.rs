//! Log setup for the replay tool.
//!
//! The window itself only emits `tracing` events (appends and unwinds at
//! debug, rejected appends at warn, tail evictions at trace). This module
//! installs the subscriber that renders them, on stderr, leaving stdout to
//! the replay summary, the block listing and the metrics dump.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default directives when `RUST_LOG` is unset. The window logs every append
/// at debug level, so it stays at info unless asked.
pub const DEFAULT_LOG_DIRECTIVES: &str = "chainwatch_node=info,chainwatch_monitor=info";

/// How window events are rendered. Selected by `--log-format` or
/// `CHAINWATCH_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One line per event with target, file and line.
    Pretty,
    /// One JSON object per event; `number`, `hash` and `event` become fields.
    Json,
}

impl LogFormat {
    /// `"json"` in any case selects [`LogFormat::Json`]; anything else falls
    /// back to [`LogFormat::Pretty`] rather than failing the replay.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Installs the global subscriber before a `replay` or `demo` run.
///
/// `directives` apply unless `RUST_LOG` is set, e.g.
/// `RUST_LOG=chainwatch_monitor=debug` to follow every append and unwind, or
/// `=trace` to also see tail evictions. Installing twice panics.
pub fn init_logging(directives: &str, format: LogFormat) {
    let env_filter = window_filter(directives);

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
                .init();
        }
    }

    tracing::debug!(?format, directives, "log subscriber installed");
}

/// `RUST_LOG` if set and valid, otherwise `directives`.
fn window_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}
