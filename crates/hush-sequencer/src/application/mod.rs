//! Application layer use cases for the sequencer.
//!
//! Use cases here depend only on traits and `hush-core` domain types.  No
//! radio, socket, or file-system access happens in this layer; collaborators
//! are injected at construction time.
//!
//! # Sub-modules
//!
//! - **`run_trial`** – The collaborator traits (discovery, transport,
//!   application session) and the `HandshakeSequencer` state machine that
//!   drives one trial end to end.
//!
//! - **`report_trials`** – Logs the run summary and hands the cumulative
//!   latency chart to a `ChartSink`.

pub mod report_trials;
pub mod run_trial;
