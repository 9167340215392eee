//! Statistics accumulated across trials.
//!
//! [`AggregateStats`] owns one [`TrialCounter`] and one [`LatencyRecorder`]
//! and is the only place a finished [`TrialOutcome`] is folded in, so the
//! pass/fail and latency invariants are enforced in a single method.
//!
//! ```text
//! TrialOutcome ──► AggregateStats::fold
//!                    ├─ fully successful ─► counter.record_pass + recorder.record
//!                    └─ otherwise        ─► counter.record_fail
//! ```

mod counter;
mod recorder;

pub use counter::TrialCounter;
pub use recorder::{LatencyRecorder, LatencySample};

use crate::domain::outcome::TrialOutcome;

/// Process-lifetime statistics for a run of trials.  Never reset.
#[derive(Debug, Default, Clone)]
pub struct AggregateStats {
    counter: TrialCounter,
    recorder: LatencyRecorder,
}

impl AggregateStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a finished trial into the statistics.
    ///
    /// Increments exactly one counter; records the latency sample only when
    /// every stage completed.
    pub fn fold(&mut self, outcome: &TrialOutcome) {
        match outcome.latency_sample() {
            Some(sample) => {
                self.counter.record_pass();
                self.recorder.record(sample);
            }
            None => self.counter.record_fail(),
        }
    }

    pub fn counter(&self) -> &TrialCounter {
        &self.counter
    }

    pub fn recorder(&self) -> &LatencyRecorder {
        &self.recorder
    }

    pub fn pass_count(&self) -> u64 {
        self.counter.pass_count()
    }

    pub fn fail_count(&self) -> u64 {
        self.counter.fail_count()
    }
}
