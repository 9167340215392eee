//! The immutable result of a single trial.
//!
//! The sequencer fills a [`TrialOutcomeBuilder`] stage by stage and calls
//! [`TrialOutcomeBuilder::finish`] once teardown is over.  Only the finished
//! [`TrialOutcome`] is folded into the statistics.

use uuid::Uuid;

use super::hush::HushResponse;
use super::peripheral::PeripheralHandle;
use super::stage::{Stage, StageResult, StageTiming};
use crate::stats::LatencySample;

/// Correlates log lines and outcomes belonging to one trial.
pub type TrialId = Uuid;

/// Everything that happened during one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    trial_id: TrialId,
    peripheral: PeripheralHandle,
    stages: [StageResult; 5],
    hush_response: Option<HushResponse>,
}

impl TrialOutcome {
    pub fn trial_id(&self) -> TrialId {
        self.trial_id
    }

    pub fn peripheral(&self) -> &PeripheralHandle {
        &self.peripheral
    }

    pub fn stage(&self, stage: Stage) -> &StageResult {
        &self.stages[stage.index()]
    }

    pub fn transport_connected(&self) -> bool {
        self.stage(Stage::TransportConnect).succeeded()
    }

    pub fn application_connected(&self) -> bool {
        self.stage(Stage::ApplicationConnect).succeeded()
    }

    pub fn command_succeeded(&self) -> bool {
        self.stage(Stage::AuthenticatedCommand).succeeded()
    }

    pub fn application_closed(&self) -> bool {
        self.stage(Stage::ApplicationClose).succeeded()
    }

    pub fn transport_disconnected(&self) -> bool {
        self.stage(Stage::TransportDisconnect).succeeded()
    }

    /// `true` only when all five stages completed.  Gates latency recording
    /// and the pass counter.
    pub fn is_fully_successful(&self) -> bool {
        self.stages.iter().all(StageResult::succeeded)
    }

    /// The value returned to callers of a trial: the hush outcome alone,
    /// regardless of how teardown went.
    pub fn hushed(&self) -> bool {
        self.command_succeeded()
    }

    /// Response returned by the peripheral, if the hush call got one.
    pub fn hush_response(&self) -> Option<&HushResponse> {
        self.hush_response.as_ref()
    }

    /// Per-stage timings in execution order, present only for fully
    /// successful trials.
    pub fn timings(&self) -> Option<[StageTiming; 5]> {
        if !self.is_fully_successful() {
            return None;
        }
        let mut timings = [StageTiming {
            stage: Stage::TransportConnect,
            duration: Default::default(),
        }; 5];
        for (slot, stage) in timings.iter_mut().zip(Stage::ALL) {
            *slot = StageTiming {
                stage,
                duration: self.stage(stage).duration()?,
            };
        }
        Some(timings)
    }

    pub fn latency_sample(&self) -> Option<LatencySample> {
        self.timings().map(|t| LatencySample::from_timings(&t))
    }
}

/// Incrementally assembles a [`TrialOutcome`].
///
/// Stages not recorded stay [`StageResult::Skipped`].
#[derive(Debug)]
pub struct TrialOutcomeBuilder {
    trial_id: TrialId,
    peripheral: PeripheralHandle,
    stages: [StageResult; 5],
    hush_response: Option<HushResponse>,
}

impl TrialOutcomeBuilder {
    pub fn new(peripheral: PeripheralHandle) -> Self {
        Self::with_id(Uuid::new_v4(), peripheral)
    }

    pub fn with_id(trial_id: TrialId, peripheral: PeripheralHandle) -> Self {
        Self {
            trial_id,
            peripheral,
            stages: std::array::from_fn(|_| StageResult::Skipped),
            hush_response: None,
        }
    }

    pub fn record(&mut self, stage: Stage, result: StageResult) -> &mut Self {
        self.stages[stage.index()] = result;
        self
    }

    /// Whether `stage` has been recorded as successful so far.
    pub fn succeeded(&self, stage: Stage) -> bool {
        self.stages[stage.index()].succeeded()
    }

    pub fn hush_response(&mut self, response: HushResponse) -> &mut Self {
        self.hush_response = Some(response);
        self
    }

    pub fn finish(self) -> TrialOutcome {
        TrialOutcome {
            trial_id: self.trial_id,
            peripheral: self.peripheral,
            stages: self.stages,
            hush_response: self.hush_response,
        }
    }
}
