//! Simulated application session layered on a [`SimulatedBleManager`].

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hush_core::{HandshakeParameters, HushResponse, PeripheralHandle};
use tracing::debug;

use super::{millis, SimulatedBleManager};
use crate::application::run_trial::{
    CommandError, SessionClient, SessionCredentials, SessionError, TransportLink,
};

pub struct SimulatedDeviceManager {
    ble: Arc<SimulatedBleManager>,
    open: AtomicBool,
    connects: AtomicU32,
    hushes: AtomicU32,
    closes: AtomicU32,
    endpoint_closes: AtomicU32,
    last_credentials: Mutex<Option<SessionCredentials>>,
}

impl SimulatedDeviceManager {
    pub fn new(ble: Arc<SimulatedBleManager>) -> Self {
        Self {
            ble,
            open: AtomicBool::new(false),
            connects: AtomicU32::new(0),
            hushes: AtomicU32::new(0),
            closes: AtomicU32::new(0),
            endpoint_closes: AtomicU32::new(0),
            last_credentials: Mutex::new(None),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn hush_count(&self) -> u32 {
        self.hushes.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn close_endpoints_count(&self) -> u32 {
        self.endpoint_closes.load(Ordering::SeqCst)
    }

    /// Credentials presented on the most recent session connect.
    pub fn last_credentials(&self) -> Option<SessionCredentials> {
        self.last_credentials.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl SessionClient for SimulatedDeviceManager {
    async fn connect(
        &self,
        peripheral: &PeripheralHandle,
        credentials: &SessionCredentials,
    ) -> Result<(), SessionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.last_credentials.lock().expect("lock poisoned") = Some(credentials.clone());
        let profile = self.ble.profile();
        tokio::time::sleep(millis(profile.session_connect_ms)).await;

        if !self.ble.is_connected() {
            return Err(SessionError::Connect("transport is not connected".to_string()));
        }
        if profile.session_connect_fails {
            return Err(SessionError::Connect(format!(
                "{} refused the session",
                peripheral.name
            )));
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn hush(&self, parameters: &HandshakeParameters) -> Result<HushResponse, CommandError> {
        self.hushes.fetch_add(1, Ordering::SeqCst);
        let profile = self.ble.profile();
        debug!(key_id = parameters.key_id, "simulated hush request");
        tokio::time::sleep(millis(profile.hush_ms)).await;

        if !self.is_open() {
            return Err(CommandError::Transport("session is not open".to_string()));
        }
        if profile.hush_fails {
            return Err(CommandError::Timeout);
        }
        Ok(HushResponse {
            result_code: profile.hush_result_code,
            conditions: profile.conditions(),
        })
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(millis(self.ble.profile().close_ms)).await;
        if self.ble.profile().close_fails {
            return Err(SessionError::Close("simulated close failure".to_string()));
        }
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn close_endpoints(&self) -> Result<(), SessionError> {
        self.endpoint_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
