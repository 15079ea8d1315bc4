//! # Prometheus Metrics
//!
//! Counters and gauges describing what a replay did to the window. Rendered
//! in the Prometheus text exposition format on request.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};

use chainwatch_monitor::chain::{ChainWindow, WindowError};
use chainwatch_monitor::feed::Applied;

/// Holds all Prometheus metric handles for one window.
#[derive(Clone)]
pub struct WindowMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Successful appends, either event tag.
    pub appends_total: IntCounter,
    /// Records removed from the head by an unwind.
    pub unwinds_total: IntCounter,
    /// Appends refused for breaking continuity.
    pub rejected_appends_total: IntCounter,
    /// Full window resets.
    pub resets_total: IntCounter,
    /// Records currently retained.
    pub window_length: IntGauge,
    /// Number of the head record, or -1 when empty. Clamped to `i64::MAX`.
    pub head_number: IntGauge,
    /// Smoothed seconds between blocks.
    pub average_block_time_seconds: Gauge,
}

impl WindowMetrics {
    /// Creates and registers all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("chainwatch".into()), None)?;

        let appends_total = IntCounter::new("appends_total", "Blocks appended to the window")?;
        registry.register(Box::new(appends_total.clone()))?;

        let unwinds_total = IntCounter::new("unwinds_total", "Records unwound from the head")?;
        registry.register(Box::new(unwinds_total.clone()))?;

        let rejected_appends_total = IntCounter::new(
            "rejected_appends_total",
            "Appends rejected for an unexpected parent hash or block number",
        )?;
        registry.register(Box::new(rejected_appends_total.clone()))?;

        let resets_total = IntCounter::new("resets_total", "Window resets")?;
        registry.register(Box::new(resets_total.clone()))?;

        let window_length = IntGauge::new("window_length", "Records currently retained")?;
        registry.register(Box::new(window_length.clone()))?;

        let head_number = IntGauge::new("head_number", "Block number of the window head")?;
        registry.register(Box::new(head_number.clone()))?;

        let average_block_time_seconds = Gauge::new(
            "average_block_time_seconds",
            "Smoothed time between consecutive appended blocks",
        )?;
        registry.register(Box::new(average_block_time_seconds.clone()))?;

        Ok(Self {
            registry,
            appends_total,
            unwinds_total,
            rejected_appends_total,
            resets_total,
            window_length,
            head_number,
            average_block_time_seconds,
        })
    }

    /// Count one feed outcome.
    pub fn observe(&self, outcome: &Result<Applied, WindowError>) {
        match outcome {
            Ok(Applied::Appended { .. }) => self.appends_total.inc(),
            Ok(Applied::Unwound(Some(_))) => self.unwinds_total.inc(),
            Ok(Applied::Reset) => self.resets_total.inc(),
            Ok(Applied::Unwound(None)) | Ok(Applied::Confirmed(_)) => {}
            Err(_) => self.rejected_appends_total.inc(),
        }
    }

    /// Refresh the gauges from the window's current state.
    pub fn sync(&self, window: &ChainWindow) {
        self.window_length
            .set(i64::try_from(window.len()).unwrap_or(i64::MAX));
        self.head_number.set(
            window
                .head()
                .map_or(-1, |h| i64::try_from(h.number()).unwrap_or(i64::MAX)),
        );
        self.average_block_time_seconds
            .set(window.average_block_time());
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
