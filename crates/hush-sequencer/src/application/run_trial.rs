//! RunTrialUseCase: drives one peripheral through the hush handshake.
//!
//! The [`HandshakeSequencer`] resolves a peripheral by advertised name and
//! then walks five strictly ordered stages:
//!
//! ```text
//! resolve ─► transport connect (retried) ─► application connect ─► hush
//!                    │                              │
//!                    │                              └─► application close
//!                    └────────────────────────────────► transport disconnect
//! ```
//!
//! A stage only runs when its prerequisite succeeded: the hush and the
//! application close both need the application session; the transport
//! disconnect only needs the transport.  Collaborator errors never escape a
//! trial.  They are logged and recorded as a failed [`StageResult`].
//!
//! # Architecture
//!
//! The sequencer depends only on the [`PeripheralDiscovery`],
//! [`TransportLink`] and [`SessionClient`] traits.  Real radios and the
//! simulated devices in `infrastructure::simulation` are injected at
//! construction time.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hush_core::report::{CONNECT_FAILED_LINE, DISCONNECT_FAILED_LINE, NOT_FOUND_LINE};
use hush_core::{
    AggregateStats, HandshakeParameters, HushResponse, PeripheralHandle, RetryPolicy, Stage,
    StageResult, TrialOutcome, TrialOutcomeBuilder, TrialReporter,
};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Default bound on the discovery scan.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(60);

/// Default bound on the unsubscribe wait after the session is closed.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ── Collaborator errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("scan failed: {0}")]
    ScanFailed(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {identifier} failed: {reason}")]
    ConnectFailed { identifier: String, reason: String },
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session connect failed: {0}")]
    Connect(String),
    #[error("session close failed: {0}")]
    Close(String),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("hush request failed: {0}")]
    Transport(String),
    #[error("hush request timed out")]
    Timeout,
}

/// Errors that end a trial before any stage runs.
#[derive(Debug, Error)]
pub enum TrialError {
    #[error("no advertisement named {name:?} within {scan_timeout:?}")]
    NotFound {
        name: String,
        scan_timeout: Duration,
    },
}

// ── Collaborator traits ──────────────────────────────────────────────────────

/// Credentials handed to the application session on connect.
///
/// Both fields are optional; the hush command itself is authenticated by
/// [`HandshakeParameters`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCredentials {
    pub pairing_code: Option<String>,
    pub access_token: Option<Vec<u8>>,
}

/// Finds advertising peripherals.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PeripheralDiscovery: Send + Sync {
    /// Runs one scan filtered by advertised name.  Returns once the scan has
    /// finished; callers bound it with their own timeout.
    async fn start_scan(&self, filter: &str) -> Result<(), DiscoveryError>;

    async fn stop_scan(&self);

    /// Resolves once the background scan has delivered at least one result.
    async fn wait_for_scan_result(&self);

    /// Peripherals seen by the most recent scan, in discovery order.
    fn peripheral_list(&self) -> Vec<PeripheralHandle>;

    fn start_background_scan(&self, filter: &str) -> Result<(), DiscoveryError>;

    fn stop_background_scan(&self);

    fn is_background_scanning(&self) -> bool;
}

/// The short-range transport link to one peripheral.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransportLink: Send + Sync {
    async fn connect(&self, identifier: &str) -> Result<(), TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    /// Resolves when the peripheral acknowledges the unsubscribe that follows
    /// a session close.  May never resolve.
    async fn wait_for_unsubscribe(&self);
}

/// The application-level session carried over the transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionClient: Send + Sync {
    async fn connect(
        &self,
        peripheral: &PeripheralHandle,
        credentials: &SessionCredentials,
    ) -> Result<(), SessionError>;

    async fn hush(&self, parameters: &HandshakeParameters) -> Result<HushResponse, CommandError>;

    async fn close(&self) -> Result<(), SessionError>;

    async fn close_endpoints(&self) -> Result<(), SessionError>;
}

// ── Sequencer ─────────────────────────────────────────────────────────────────

/// Runs hush trials one at a time and accumulates their statistics.
pub struct HandshakeSequencer {
    discovery: Arc<dyn PeripheralDiscovery>,
    transport: Arc<dyn TransportLink>,
    session: Arc<dyn SessionClient>,
    parameters: HandshakeParameters,
    credentials: SessionCredentials,
    close_timeout: Duration,
    stats: AggregateStats,
}

impl HandshakeSequencer {
    pub fn new(
        discovery: Arc<dyn PeripheralDiscovery>,
        transport: Arc<dyn TransportLink>,
        session: Arc<dyn SessionClient>,
        parameters: HandshakeParameters,
    ) -> Self {
        Self {
            discovery,
            transport,
            session,
            parameters,
            credentials: SessionCredentials::default(),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            stats: AggregateStats::new(),
        }
    }

    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    pub fn with_credentials(mut self, credentials: SessionCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    /// Keeps the discovery collaborator scanning between trials.  While it
    /// runs, resolution reads the cached list instead of starting a scan.
    pub fn start_background_scan(&self, filter: &str) -> Result<(), DiscoveryError> {
        self.discovery.start_background_scan(filter)
    }

    pub fn stop_background_scan(&self) {
        self.discovery.stop_background_scan();
    }

    /// Runs one trial and reports whether the peripheral was hushed.
    ///
    /// The return value reflects the hush stage alone.  A trial whose hush
    /// succeeded but whose teardown failed returns `true` yet is counted as a
    /// failure in [`stats`](Self::stats).
    pub async fn run_trial(
        &mut self,
        peripheral_name: &str,
        scan_timeout: Duration,
        policy: RetryPolicy,
    ) -> bool {
        match self.execute_trial(peripheral_name, scan_timeout, policy).await {
            Ok(outcome) => outcome.hushed(),
            Err(e) => {
                debug!(error = %e, "trial ended before the transport stage");
                false
            }
        }
    }

    /// Runs one trial and returns its full outcome.
    ///
    /// The outcome is folded into the statistics exactly once.  A peripheral
    /// that cannot be resolved leaves the statistics untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TrialError::NotFound`] when no advertisement matches
    /// `peripheral_name` within `scan_timeout`.
    pub async fn execute_trial(
        &mut self,
        peripheral_name: &str,
        scan_timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<TrialOutcome, TrialError> {
        let trial_id = Uuid::new_v4();
        let span = info_span!("trial", %trial_id, peripheral = peripheral_name);

        let outcome = self
            .sequence(trial_id, peripheral_name, scan_timeout, policy)
            .instrument(span)
            .await?;

        self.stats.fold(&outcome);
        Ok(outcome)
    }

    async fn sequence(
        &self,
        trial_id: Uuid,
        peripheral_name: &str,
        scan_timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<TrialOutcome, TrialError> {
        let peripheral = self.resolve(peripheral_name, scan_timeout).await?;
        info!("{}", TrialReporter::sequence_started_now());

        let mut trial = TrialOutcomeBuilder::with_id(trial_id, peripheral.clone());

        let connect = self.connect_transport(&peripheral.identifier, policy).await;
        trial.record(Stage::TransportConnect, connect);
        if !trial.succeeded(Stage::TransportConnect) {
            return Ok(trial.finish());
        }

        let session = self.connect_session(&peripheral).await;
        trial.record(Stage::ApplicationConnect, session);

        if trial.succeeded(Stage::ApplicationConnect) {
            let (result, response) = self.send_hush().await;
            trial.record(Stage::AuthenticatedCommand, result);
            if let Some(response) = response {
                trial.hush_response(response);
            }

            let close = self.close_session().await;
            trial.record(Stage::ApplicationClose, close);
        }

        let disconnect = self.disconnect_transport().await;
        trial.record(Stage::TransportDisconnect, disconnect);

        Ok(trial.finish())
    }

    async fn resolve(
        &self,
        peripheral_name: &str,
        scan_timeout: Duration,
    ) -> Result<PeripheralHandle, TrialError> {
        if !self.discovery.is_background_scanning() {
            match tokio::time::timeout(scan_timeout, self.discovery.start_scan(peripheral_name))
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "discovery scan failed"),
                Err(_) => debug!(?scan_timeout, "discovery scan reached its time bound"),
            }
            self.discovery.stop_scan().await;
        } else if self.discovery.peripheral_list().is_empty()
            && tokio::time::timeout(scan_timeout, self.discovery.wait_for_scan_result())
                .await
                .is_err()
        {
            debug!(?scan_timeout, "no background scan result arrived");
        }

        let list = self.discovery.peripheral_list();
        match PeripheralHandle::find_by_name(&list, peripheral_name) {
            Some(found) => Ok(found.clone()),
            None => {
                warn!("{NOT_FOUND_LINE}");
                Err(TrialError::NotFound {
                    name: peripheral_name.to_string(),
                    scan_timeout,
                })
            }
        }
    }

    /// Connect attempts stop at the first success.  The stage is timed
    /// around the whole retry loop.
    async fn connect_transport(&self, identifier: &str, policy: RetryPolicy) -> StageResult {
        let total = policy.total_connect_attempts();
        let started = Instant::now();

        for attempt in 1..=total {
            match self.transport.connect(identifier).await {
                Ok(()) => {
                    let elapsed = started.elapsed();
                    log_stage_complete(Stage::TransportConnect.log_name(), elapsed);
                    return StageResult::Completed(elapsed);
                }
                Err(e) => warn!(attempt, total, error = %e, "transport connect attempt failed"),
            }
        }

        warn!("{CONNECT_FAILED_LINE}");
        StageResult::failed(format!("transport did not connect after {total} attempts"))
    }

    async fn connect_session(&self, peripheral: &PeripheralHandle) -> StageResult {
        timed(Stage::ApplicationConnect, async {
            self.session.connect(peripheral, &self.credentials).await
        })
        .await
    }

    /// Timed whatever the result code; a nonzero code fails the stage but
    /// keeps its elapsed time.
    async fn send_hush(&self) -> (StageResult, Option<HushResponse>) {
        let started = Instant::now();
        match self.session.hush(&self.parameters).await {
            Ok(response) => {
                let elapsed = started.elapsed();
                log_stage_complete(
                    &TrialReporter::hush_stage_name(response.result_code),
                    elapsed,
                );
                for condition in &response.conditions {
                    debug!(
                        source = ?condition.source(),
                        state = ?condition.state(),
                        "alarm condition 0x{:02x}",
                        condition.0
                    );
                }
                let result = if response.is_success() {
                    StageResult::Completed(elapsed)
                } else {
                    warn!(result_code = response.result_code, "hush rejected");
                    StageResult::Failed {
                        reason: format!("hush rejected with result code {}", response.result_code),
                        elapsed: Some(elapsed),
                    }
                };
                (result, Some(response))
            }
            Err(e) => {
                warn!(error = %e, "hush failed");
                (StageResult::failed(e.to_string()), None)
            }
        }
    }

    /// Close, close endpoints, then wait for the unsubscribe.  An elapsed
    /// wait is only a warning.
    async fn close_session(&self) -> StageResult {
        timed(Stage::ApplicationClose, async {
            self.session.close().await?;
            self.session.close_endpoints().await?;
            if tokio::time::timeout(self.close_timeout, self.transport.wait_for_unsubscribe())
                .await
                .is_err()
            {
                warn!(close_timeout = ?self.close_timeout, "unsubscribe not signalled");
            }
            Ok::<(), SessionError>(())
        })
        .await
    }

    async fn disconnect_transport(&self) -> StageResult {
        let started = Instant::now();
        if let Err(e) = self.transport.disconnect().await {
            warn!(error = %e, "transport disconnect failed");
            return StageResult::failed(e.to_string());
        }
        if self.transport.is_connected() {
            warn!("{DISCONNECT_FAILED_LINE}");
            return StageResult::failed(DISCONNECT_FAILED_LINE);
        }
        let elapsed = started.elapsed();
        log_stage_complete(Stage::TransportDisconnect.log_name(), elapsed);
        StageResult::Completed(elapsed)
    }
}

/// Times `op`, logging a completion line on success and a warning on error.
async fn timed<F, E>(stage: Stage, op: F) -> StageResult
where
    F: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    match op.await {
        Ok(()) => {
            let elapsed = started.elapsed();
            log_stage_complete(stage.log_name(), elapsed);
            StageResult::Completed(elapsed)
        }
        Err(e) => {
            warn!(%stage, error = %e, "stage failed");
            StageResult::failed(e.to_string())
        }
    }
}

fn log_stage_complete(name: &str, elapsed: Duration) {
    info!("{}", TrialReporter::stage_complete_now(name, elapsed));
}

// ── Unit tests ────────────────────────────────────────────────────────────────
