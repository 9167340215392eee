//! Simulated BLE adapter: discovery plus the transport link.

use std::sync::Mutex;

use async_trait::async_trait;
use hush_core::PeripheralHandle;
use tracing::debug;

use super::{millis, SimulationProfile};
use crate::application::run_trial::{
    DiscoveryError, PeripheralDiscovery, TransportError, TransportLink,
};

#[derive(Debug, Default)]
struct BleState {
    peripherals: Vec<PeripheralHandle>,
    background_filter: Option<String>,
    connected_to: Option<String>,
    scans: u32,
    connect_attempts: u32,
    disconnects: u32,
}

/// Simulated adapter backed by a [`SimulationProfile`].
///
/// Call counters are exposed so tests can assert how the sequencer drove it.
pub struct SimulatedBleManager {
    profile: SimulationProfile,
    state: Mutex<BleState>,
}

impl SimulatedBleManager {
    pub fn new(profile: SimulationProfile) -> Self {
        Self {
            profile,
            state: Mutex::new(BleState::default()),
        }
    }

    pub fn profile(&self) -> &SimulationProfile {
        &self.profile
    }

    /// Number of on-demand and background scans that completed.
    pub fn scan_count(&self) -> u32 {
        self.state.lock().expect("lock poisoned").scans
    }

    pub fn connect_attempts(&self) -> u32 {
        self.state.lock().expect("lock poisoned").connect_attempts
    }

    pub fn disconnect_count(&self) -> u32 {
        self.state.lock().expect("lock poisoned").disconnects
    }

    fn matching(&self, filter: &str) -> Vec<PeripheralHandle> {
        self.profile
            .advertisements
            .iter()
            .filter(|p| p.name.contains(filter))
            .cloned()
            .collect()
    }

    fn store_scan(&self, filter: &str) {
        let found = self.matching(filter);
        debug!(filter, found = found.len(), "simulated scan complete");
        let mut state = self.state.lock().expect("lock poisoned");
        state.peripherals = found;
        state.scans += 1;
    }
}

#[async_trait]
impl PeripheralDiscovery for SimulatedBleManager {
    async fn start_scan(&self, filter: &str) -> Result<(), DiscoveryError> {
        tokio::time::sleep(millis(self.profile.scan_latency_ms)).await;
        self.store_scan(filter);
        Ok(())
    }

    async fn stop_scan(&self) {}

    async fn wait_for_scan_result(&self) {
        let filter = self.state.lock().expect("lock poisoned").background_filter.clone();
        match filter {
            Some(filter) => {
                tokio::time::sleep(millis(self.profile.scan_latency_ms)).await;
                self.store_scan(&filter);
            }
            None => std::future::pending::<()>().await,
        }
    }

    fn peripheral_list(&self) -> Vec<PeripheralHandle> {
        self.state.lock().expect("lock poisoned").peripherals.clone()
    }

    fn start_background_scan(&self, filter: &str) -> Result<(), DiscoveryError> {
        let mut state = self.state.lock().expect("lock poisoned");
        if state.background_filter.is_some() {
            return Err(DiscoveryError::ScanFailed(
                "background scan already running".to_string(),
            ));
        }
        state.background_filter = Some(filter.to_string());
        Ok(())
    }

    fn stop_background_scan(&self) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.background_filter = None;
        state.peripherals.clear();
    }

    fn is_background_scanning(&self) -> bool {
        self.state.lock().expect("lock poisoned").background_filter.is_some()
    }
}

#[async_trait]
impl TransportLink for SimulatedBleManager {
    async fn connect(&self, identifier: &str) -> Result<(), TransportError> {
        let attempt = {
            let mut state = self.state.lock().expect("lock poisoned");
            state.connect_attempts += 1;
            state.connect_attempts
        };
        tokio::time::sleep(millis(self.profile.transport_connect_ms)).await;

        if !self
            .profile
            .advertisements
            .iter()
            .any(|p| p.identifier == identifier)
        {
            return Err(TransportError::Unavailable(format!(
                "{identifier} is not advertising"
            )));
        }
        if attempt <= self.profile.transport_connect_failures {
            return Err(TransportError::ConnectFailed {
                identifier: identifier.to_string(),
                reason: format!("simulated failure on attempt {attempt}"),
            });
        }

        self.state.lock().expect("lock poisoned").connected_to = Some(identifier.to_string());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        tokio::time::sleep(millis(self.profile.disconnect_ms)).await;
        let mut state = self.state.lock().expect("lock poisoned");
        state.disconnects += 1;
        if !self.profile.disconnect_sticks {
            state.connected_to = None;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().expect("lock poisoned").connected_to.is_some()
    }

    async fn wait_for_unsubscribe(&self) {
        if self.profile.unsubscribe_signalled {
            tokio::time::sleep(millis(self.profile.unsubscribe_ms)).await;
        } else {
            std::future::pending::<()>().await;
        }
    }
}
