//! Discovered peripherals and name-based resolution.

use serde::{Deserialize, Serialize};

/// An advertised peripheral as reported by the discovery collaborator.
///
/// `identifier` is opaque to the sequencer: it is handed back to the
/// transport collaborator unchanged.  Handles are re-resolved for every
/// trial and must not be cached across trials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralHandle {
    /// Human-readable advertised name.
    pub name: String,
    /// Transport-level identifier (e.g. a platform UUID string).
    pub identifier: String,
}

impl PeripheralHandle {
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
        }
    }

    /// Returns the first entry in `list` whose name equals `name` exactly.
    pub fn find_by_name<'a>(list: &'a [PeripheralHandle], name: &str) -> Option<&'a Self> {
        list.iter().find(|p| p.name == name)
    }
}
