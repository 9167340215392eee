//! TrialReporter: shapes trial results for humans and for the plotter.
//!
//! Two outputs are produced here:
//!
//! - **Log lines** – one `"[HH:MM:SS.mmm] <Stage> complete: <seconds> seconds"`
//!   line per finished stage, the fixed failure lines, and a run summary.
//! - **Chart data** – for every recorded trial, the cumulative elapsed time
//!   after each stage, starting from a zero origin.  Rendering is left to an
//!   external charting tool; [`LatencyChart`] is serialisable so it can be
//!   handed over as JSON.
//!
//! # Cumulative series
//!
//! A sample of `[1.0, 0.5, 0.2, 0.3, 0.1]` seconds becomes
//! `[0.0, 1.0, 1.5, 1.7, 2.0, 2.1]`, plotted against the labels
//! `["", "BLE connected", "Weave connected", "Hush responded", "Weave closed", "BLE disconnected"]`.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::stage::Stage;
use crate::stats::{AggregateStats, LatencySample};

/// Logged when the named peripheral is absent from the advertisement list.
pub const NOT_FOUND_LINE: &str = "Did not find advertisement";
/// Logged when every transport connect attempt failed.
pub const CONNECT_FAILED_LINE: &str = "Was not able to connect";
/// Logged when the transport still reports connected after disconnect.
pub const DISCONNECT_FAILED_LINE: &str = "Was not able to disconnect";

/// Chart-ready view of every recorded trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyChart {
    /// X-axis tick labels; the first entry is the empty origin label.
    pub labels: Vec<String>,
    /// Y-axis unit.
    pub unit: String,
    /// One cumulative series per recorded trial, in trial order.
    pub series: Vec<Vec<f64>>,
}

/// Stateless formatter for trial reporting.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrialReporter;

impl TrialReporter {
    pub fn new() -> Self {
        Self
    }

    /// X-axis labels: an empty origin followed by one label per stage.
    pub fn labels() -> Vec<String> {
        std::iter::once(String::new())
            .chain(Stage::ALL.iter().map(|s| s.chart_label().to_string()))
            .collect()
    }

    /// Running sum of the stage durations in seconds, prefixed with `0.0`.
    pub fn cumulative_series(sample: &LatencySample) -> Vec<f64> {
        let mut series = Vec::with_capacity(6);
        let mut acc = 0.0;
        series.push(acc);
        for d in sample.durations() {
            acc += d.as_secs_f64();
            series.push(acc);
        }
        series
    }

    /// Builds the chart payload from the recorded samples.
    pub fn chart(&self, stats: &AggregateStats) -> LatencyChart {
        LatencyChart {
            labels: Self::labels(),
            unit: "seconds".to_string(),
            series: stats
                .recorder()
                .export()
                .iter()
                .map(Self::cumulative_series)
                .collect(),
        }
    }

    /// `[HH:MM:SS.mmm] ` prefix for the given wall-clock time.
    pub fn timestamp(at: NaiveTime) -> String {
        format!("[{}] ", at.format("%H:%M:%S%.3f"))
    }

    /// `"[HH:MM:SS.mmm] <name> complete: <seconds> seconds"`.
    pub fn stage_complete_line(at: NaiveTime, name: &str, elapsed: Duration) -> String {
        format!(
            "{}{name} complete: {:.6} seconds",
            Self::timestamp(at),
            elapsed.as_secs_f64()
        )
    }

    /// Name used for the hush stage line; embeds the result code.
    pub fn hush_stage_name(result_code: u8) -> String {
        format!("{}({result_code})", Stage::AuthenticatedCommand.log_name())
    }

    /// [`stage_complete_line`](Self::stage_complete_line) stamped with the
    /// current local time.
    pub fn stage_complete_now(name: &str, elapsed: Duration) -> String {
        Self::stage_complete_line(chrono::Local::now().time(), name, elapsed)
    }

    pub fn sequence_started_line(at: NaiveTime) -> String {
        format!("{}Hush sequence started", Self::timestamp(at))
    }

    pub fn sequence_started_now() -> String {
        Self::sequence_started_line(chrono::Local::now().time())
    }

    /// One-line run summary: counts plus mean per-stage latency.
    pub fn summary(&self, stats: &AggregateStats) -> String {
        let mut line = format!(
            "hush trials: {} passed, {} failed",
            stats.pass_count(),
            stats.fail_count()
        );
        let recorder = stats.recorder();
        if !recorder.is_empty() {
            line.push_str("; mean");
            for stage in Stage::ALL {
                if let Some(mean) = recorder.mean(stage) {
                    let _ = write!(line, " {}={:.3}s", stage.log_name(), mean.as_secs_f64());
                }
            }
        }
        line
    }
}
