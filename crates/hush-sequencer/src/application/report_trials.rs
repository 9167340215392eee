//! ReportTrialsUseCase: logs the run summary and publishes the latency chart.
//!
//! Rendering the chart is not this crate's concern.  The chart payload is
//! handed to a [`ChartSink`]; the shipped sink writes JSON for an external
//! plotting tool.

use hush_core::{AggregateStats, LatencyChart, TrialReporter};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to encode chart: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write chart: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives the cumulative latency chart at the end of a run.
pub trait ChartSink {
    fn publish(&mut self, chart: &LatencyChart) -> Result<(), ReportError>;
}

/// Logs the summary line and, when at least one trial was recorded, hands
/// the chart to `sink`.  Returns the published chart.
pub fn report_trials(
    stats: &AggregateStats,
    sink: &mut dyn ChartSink,
) -> Result<Option<LatencyChart>, ReportError> {
    let reporter = TrialReporter::new();
    info!("{}", reporter.summary(stats));

    if stats.recorder().is_empty() {
        info!("no fully successful trials; chart skipped");
        return Ok(None);
    }

    let chart = reporter.chart(stats);
    sink.publish(&chart)?;
    info!(series = chart.series.len(), "latency chart published");
    Ok(Some(chart))
}
