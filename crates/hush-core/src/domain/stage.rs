use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One timed sub-operation of a trial, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    TransportConnect,
    ApplicationConnect,
    AuthenticatedCommand,
    ApplicationClose,
    TransportDisconnect,
}

impl Stage {
    /// All stages in the order a trial runs them.
    pub const ALL: [Stage; 5] = [
        Stage::TransportConnect,
        Stage::ApplicationConnect,
        Stage::AuthenticatedCommand,
        Stage::ApplicationClose,
        Stage::TransportDisconnect,
    ];

    /// Position of this stage within [`Stage::ALL`].
    pub fn index(self) -> usize {
        match self {
            Stage::TransportConnect => 0,
            Stage::ApplicationConnect => 1,
            Stage::AuthenticatedCommand => 2,
            Stage::ApplicationClose => 3,
            Stage::TransportDisconnect => 4,
        }
    }

    /// Name used in stage completion log lines.
    pub fn log_name(self) -> &'static str {
        match self {
            Stage::TransportConnect => "BLE connection",
            Stage::ApplicationConnect => "WEAVE connection",
            Stage::AuthenticatedCommand => "HUSH",
            Stage::ApplicationClose => "CLOSE",
            Stage::TransportDisconnect => "DISCONNECT",
        }
    }

    /// Axis label for the point reached once this stage has completed.
    pub fn chart_label(self) -> &'static str {
        match self {
            Stage::TransportConnect => "BLE connected",
            Stage::ApplicationConnect => "Weave connected",
            Stage::AuthenticatedCommand => "Hush responded",
            Stage::ApplicationClose => "Weave closed",
            Stage::TransportDisconnect => "BLE disconnected",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.log_name())
    }
}

/// A completed stage paired with how long it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration: Duration,
}

/// What happened to a single stage during a trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    /// The stage was never attempted because a prerequisite failed.
    Skipped,
    /// The stage succeeded and took the given time.
    Completed(Duration),
    /// The stage was attempted and failed.
    ///
    /// `elapsed` is present when the stage ran to a timed conclusion but the
    /// result was unacceptable (e.g. a nonzero hush result code).
    Failed {
        reason: String,
        elapsed: Option<Duration>,
    },
}

impl StageResult {
    pub fn failed(reason: impl Into<String>) -> Self {
        StageResult::Failed {
            reason: reason.into(),
            elapsed: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, StageResult::Completed(_))
    }

    pub fn was_attempted(&self) -> bool {
        !matches!(self, StageResult::Skipped)
    }

    /// Duration of a successful stage.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            StageResult::Completed(d) => Some(*d),
            _ => None,
        }
    }

    /// Measured time whether or not the stage succeeded.
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            StageResult::Completed(d) => Some(*d),
            StageResult::Failed { elapsed, .. } => *elapsed,
            StageResult::Skipped => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            StageResult::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
