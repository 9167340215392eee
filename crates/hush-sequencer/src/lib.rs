//! hush-sequencer library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the sequencer do?
//!
//! Given the advertised name of a peripheral, one *trial*:
//!
//! 1. Resolves the name to a transport identifier via the discovery collaborator.
//! 2. Connects the short-range transport, retrying a bounded number of times.
//! 3. Opens an application session over the transport.
//! 4. Sends the authenticated hush command.
//! 5. Closes the session and waits briefly for the unsubscribe signal.
//! 6. Disconnects the transport.
//!
//! Every stage is timed.  The outcome of each trial is folded into pass/fail
//! counters and, for fully successful trials, a latency recorder.

/// Application layer: collaborator traits, the sequencer, and reporting.
pub mod application;

/// Infrastructure layer: simulated collaborators, configuration, chart output.
pub mod infrastructure;
