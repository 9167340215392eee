//! # hush-core
//!
//! Shared library for the hush handshake sequencer containing the domain
//! types that describe a trial, the statistics accumulated across trials,
//! and the report shaping handed to an external plotting tool.
//!
//! This crate has zero dependencies on radios, sockets, or async runtimes.
//!
//! # Architecture overview
//!
//! A *trial* drives one peripheral through five timed stages:
//!
//! ```text
//! transport connect ─► application connect ─► hush ─► application close ─► transport disconnect
//! ```
//!
//! - **`domain`** – Peripheral handles, the fixed handshake parameters, the
//!   connect retry policy, stage results, and the immutable `TrialOutcome`
//!   produced at the end of every trial.
//!
//! - **`stats`** – `LatencyRecorder` and `TrialCounter`, bundled together in
//!   `AggregateStats`.  Outcomes are folded into these exactly once.
//!
//! - **`report`** – `TrialReporter`: stage completion log lines, the run
//!   summary, and the cumulative latency series used for charting.

pub mod domain;
pub mod report;
pub mod stats;

pub use domain::handshake::{HandshakeParameters, ParameterError, PolicyError, RetryPolicy};
pub use domain::hush::{AlarmCondition, AlarmSource, AlarmState, HushResponse};
pub use domain::outcome::{TrialId, TrialOutcome, TrialOutcomeBuilder};
pub use domain::peripheral::PeripheralHandle;
pub use domain::stage::{Stage, StageResult, StageTiming};
pub use report::{LatencyChart, TrialReporter};
pub use stats::{AggregateStats, LatencyRecorder, LatencySample, TrialCounter};
