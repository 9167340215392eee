//! Infrastructure layer for the sequencer.
//!
//! Contains the adapters the application layer is wired to at start-up:
//! simulated radio and session collaborators, file-system configuration,
//! and the JSON chart sink.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `hush_core`, but MUST NOT be imported by the `application` layer.

pub mod reporting;
pub mod simulation;
pub mod storage;
