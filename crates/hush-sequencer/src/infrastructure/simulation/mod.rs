//! Simulated peripheral collaborators.
//!
//! Stand-ins for a BLE adapter and the application session layer, driven by
//! a [`SimulationProfile`].  Every delay goes through `tokio::time::sleep`,
//! so tests running on a paused clock observe exact stage durations.
//!
//! - [`SimulatedBleManager`] implements discovery and the transport link.
//! - [`SimulatedDeviceManager`] implements the application session and
//!   refuses to connect unless the transport is up.

mod ble;
mod device;

pub use ble::SimulatedBleManager;
pub use device::SimulatedDeviceManager;

use std::time::Duration;

use hush_core::{AlarmCondition, PeripheralHandle};
use serde::{Deserialize, Serialize};

/// Timings and failure injection for the simulated peripheral.
///
/// Durations are in milliseconds.  Loaded from the `[simulation]` section of
/// the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationProfile {
    /// Peripherals returned by a scan.
    #[serde(default = "default_advertisements")]
    pub advertisements: Vec<PeripheralHandle>,
    #[serde(default = "default_scan_latency_ms")]
    pub scan_latency_ms: u64,
    /// Cost of every transport connect attempt, successful or not.
    #[serde(default = "default_transport_connect_ms")]
    pub transport_connect_ms: u64,
    #[serde(default = "default_session_connect_ms")]
    pub session_connect_ms: u64,
    #[serde(default = "default_hush_ms")]
    pub hush_ms: u64,
    #[serde(default = "default_close_ms")]
    pub close_ms: u64,
    #[serde(default = "default_disconnect_ms")]
    pub disconnect_ms: u64,
    /// Delay between the session close and the unsubscribe signal.
    #[serde(default)]
    pub unsubscribe_ms: u64,
    /// When `false` the unsubscribe signal never arrives.
    #[serde(default = "default_true")]
    pub unsubscribe_signalled: bool,
    /// Number of leading transport connect attempts that fail.
    #[serde(default)]
    pub transport_connect_failures: u32,
    #[serde(default)]
    pub session_connect_fails: bool,
    #[serde(default)]
    pub hush_result_code: u8,
    /// When `true` the hush request gets no response at all.
    #[serde(default)]
    pub hush_fails: bool,
    #[serde(default)]
    pub close_fails: bool,
    /// When `true` the transport still reports connected after disconnect.
    #[serde(default)]
    pub disconnect_sticks: bool,
    /// Raw alarm condition bytes returned with the hush response.
    #[serde(default)]
    pub hush_conditions: Vec<u8>,
}

fn default_advertisements() -> Vec<PeripheralHandle> {
    vec![PeripheralHandle::new("Hallway Protect", "18:B4:30:00:00:01")]
}
fn default_scan_latency_ms() -> u64 {
    500
}
fn default_transport_connect_ms() -> u64 {
    1000
}
fn default_session_connect_ms() -> u64 {
    500
}
fn default_hush_ms() -> u64 {
    200
}
fn default_close_ms() -> u64 {
    300
}
fn default_disconnect_ms() -> u64 {
    100
}
fn default_true() -> bool {
    true
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            advertisements: default_advertisements(),
            scan_latency_ms: default_scan_latency_ms(),
            transport_connect_ms: default_transport_connect_ms(),
            session_connect_ms: default_session_connect_ms(),
            hush_ms: default_hush_ms(),
            close_ms: default_close_ms(),
            disconnect_ms: default_disconnect_ms(),
            unsubscribe_ms: 0,
            unsubscribe_signalled: default_true(),
            transport_connect_failures: 0,
            session_connect_fails: false,
            hush_result_code: 0,
            hush_fails: false,
            close_fails: false,
            disconnect_sticks: false,
            hush_conditions: Vec::new(),
        }
    }
}

impl SimulationProfile {
    pub(crate) fn conditions(&self) -> Vec<AlarmCondition> {
        self.hush_conditions.iter().copied().map(AlarmCondition).collect()
    }
}

pub(crate) fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
