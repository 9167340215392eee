//! Domain entities for the hush handshake sequencer.
//!
//! Pure data and rules with no infrastructure dependencies.  The sequencer in
//! `hush-sequencer` drives collaborators and records what happened using the
//! types defined here.

pub mod handshake;
pub mod hush;
pub mod outcome;
pub mod peripheral;

/// The five timed stages of a trial and the per-stage result type.
pub mod stage;
