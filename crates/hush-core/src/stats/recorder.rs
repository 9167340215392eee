use std::time::Duration;

use tracing::debug;

use crate::domain::stage::{Stage, StageTiming};

/// Per-stage durations of one fully successful trial, in stage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySample([Duration; 5]);

impl LatencySample {
    pub fn new(durations: [Duration; 5]) -> Self {
        Self(durations)
    }

    pub fn from_timings(timings: &[StageTiming; 5]) -> Self {
        let mut durations = [Duration::ZERO; 5];
        for timing in timings {
            durations[timing.stage.index()] = timing.duration;
        }
        Self(durations)
    }

    pub fn durations(&self) -> &[Duration; 5] {
        &self.0
    }

    pub fn get(&self, stage: Stage) -> Duration {
        self.0[stage.index()]
    }

    pub fn total(&self) -> Duration {
        self.0.iter().sum()
    }
}

/// Ordered store of latency samples, one per fully successful trial.
///
/// Insertion order is trial order.  Unbounded: the caller decides how many
/// trials to run.
#[derive(Debug, Default, Clone)]
pub struct LatencyRecorder {
    samples: Vec<LatencySample>,
}

impl LatencyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sample: LatencySample) {
        debug!(total_ms = sample.total().as_millis() as u64, "latency sample recorded");
        self.samples.push(sample);
    }

    /// All recorded samples in trial order.
    pub fn export(&self) -> &[LatencySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean duration of `stage` across all samples, or `None` if empty.
    pub fn mean(&self, stage: Stage) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: Duration = self.samples.iter().map(|s| s.get(stage)).sum();
        // Widened to u128 so the divisor cannot truncate to zero.
        let nanos = sum.as_nanos() / self.samples.len() as u128;
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }
}
