//! Integration tests for the hush sequencer.
//!
//! These tests drive `HandshakeSequencer` end-to-end against the simulated
//! BLE adapter and session.  The Tokio clock is paused, so every simulated
//! delay is observed exactly by the stage timers.  Log output is captured
//! through a buffered `tracing_subscriber::fmt` subscriber where the emitted
//! lines themselves are under test.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hush_core::{PeripheralHandle, RetryPolicy, Stage, TrialReporter};
use hush_sequencer::application::report_trials::report_trials;
use hush_sequencer::application::run_trial::{HandshakeSequencer, SessionCredentials, TrialError};
use hush_sequencer::infrastructure::reporting::JsonChartSink;
use hush_sequencer::infrastructure::simulation::{
    SimulatedBleManager, SimulatedDeviceManager, SimulationProfile,
};
use hush_sequencer::infrastructure::storage::config::AppConfig;

const NAME: &str = "Hallway Protect";
const SCAN_TIMEOUT: Duration = Duration::from_secs(60);

// ── Helpers ───────────────────────────────────────────────────────────────────

struct Rig {
    ble: Arc<SimulatedBleManager>,
    device: Arc<SimulatedDeviceManager>,
    sequencer: HandshakeSequencer,
}

/// Profile whose stages take exactly 1.0, 0.5, 0.2, 0.3 and 0.1 seconds.
fn reference_profile() -> SimulationProfile {
    SimulationProfile {
        advertisements: vec![
            PeripheralHandle::new("Bedroom Protect", "18:B4:30:00:00:02"),
            PeripheralHandle::new(NAME, "18:B4:30:00:00:01"),
        ],
        scan_latency_ms: 750,
        transport_connect_ms: 1000,
        session_connect_ms: 500,
        hush_ms: 200,
        close_ms: 300,
        unsubscribe_ms: 0,
        disconnect_ms: 100,
        ..SimulationProfile::default()
    }
}

fn rig(profile: SimulationProfile) -> Rig {
    let ble = Arc::new(SimulatedBleManager::new(profile));
    let device = Arc::new(SimulatedDeviceManager::new(Arc::clone(&ble)));
    let sequencer = HandshakeSequencer::new(
        ble.clone(),
        ble.clone(),
        device.clone(),
        Default::default(),
    );
    Rig {
        ble,
        device,
        sequencer,
    }
}

fn policy(max_connect_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_connect_attempts).expect("valid policy")
}

/// In-memory log sink shared with a thread-local `fmt` subscriber.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("lock poisoned").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    /// Routes events on this thread into the buffer until the guard drops.
    fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("lock poisoned")).into_owned()
    }
}

/// Byte offset of `needle` in `haystack`, failing the test when absent.
fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("missing log line {needle:?} in:\n{haystack}"))
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_fully_successful_trial_records_reference_latencies() {
    // Arrange
    let mut rig = rig(reference_profile());

    // Act
    let hushed = rig.sequencer.run_trial(NAME, SCAN_TIMEOUT, policy(1)).await;

    // Assert
    assert!(hushed);
    let stats = rig.sequencer.stats();
    assert_eq!(stats.pass_count(), 1);
    assert_eq!(stats.fail_count(), 0);

    let samples = stats.recorder().export();
    assert_eq!(samples.len(), 1);
    assert_eq!(
        samples[0].durations(),
        &[1000, 500, 200, 300, 100].map(Duration::from_millis)
    );

    let series = TrialReporter::cumulative_series(&samples[0]);
    for (actual, expected) in series.iter().zip([0.0, 1.0, 1.5, 1.7, 2.0, 2.1]) {
        assert_close(*actual, expected);
    }
}

#[tokio::test(start_paused = true)]
async fn test_outcome_identifies_resolved_peripheral() {
    let mut rig = rig(reference_profile());

    let outcome = rig
        .sequencer
        .execute_trial(NAME, SCAN_TIMEOUT, policy(1))
        .await
        .expect("peripheral resolves");

    assert_eq!(outcome.peripheral().identifier, "18:B4:30:00:00:01");
    assert!(outcome.is_fully_successful());
    assert_eq!(rig.device.hush_count(), 1);
    assert_eq!(rig.device.close_endpoints_count(), 1);
    assert!(!rig.device.is_open());
}

#[tokio::test(start_paused = true)]
async fn test_missing_advertisement_leaves_counters_unchanged() {
    // Arrange
    let mut rig = rig(reference_profile());

    // Act
    let hushed = rig
        .sequencer
        .run_trial("Garage Protect", SCAN_TIMEOUT, policy(1))
        .await;

    // Assert
    assert!(!hushed);
    assert_eq!(rig.sequencer.stats().counter().total(), 0);
    assert_eq!(rig.ble.connect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_scan_slower_than_timeout_is_not_found() {
    let mut rig = rig(SimulationProfile {
        scan_latency_ms: 10_000,
        ..reference_profile()
    });

    let err = rig
        .sequencer
        .execute_trial(NAME, Duration::from_secs(2), policy(1))
        .await
        .unwrap_err();

    assert!(matches!(err, TrialError::NotFound { .. }));
    assert_eq!(rig.sequencer.stats().counter().total(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_connect_retries_count_one_failure() {
    // Arrange
    let mut rig = rig(SimulationProfile {
        transport_connect_failures: 10,
        ..reference_profile()
    });

    // Act
    let outcome = rig
        .sequencer
        .execute_trial(NAME, SCAN_TIMEOUT, policy(2))
        .await
        .expect("peripheral resolves");

    // Assert
    assert!(!outcome.hushed());
    assert_eq!(rig.ble.connect_attempts(), 3);
    assert_eq!(rig.device.connect_count(), 0);
    assert_eq!(rig.ble.disconnect_count(), 0);
    assert!(outcome.timings().is_none());
    assert_eq!(rig.sequencer.stats().fail_count(), 1);
    assert!(rig.sequencer.stats().recorder().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_retry_is_timed_across_all_attempts() {
    let mut rig = rig(SimulationProfile {
        transport_connect_failures: 1,
        ..reference_profile()
    });

    let outcome = rig
        .sequencer
        .execute_trial(NAME, SCAN_TIMEOUT, policy(1))
        .await
        .expect("peripheral resolves");

    assert!(outcome.is_fully_successful());
    assert_eq!(rig.ble.connect_attempts(), 2);
    assert_eq!(
        outcome.stage(Stage::TransportConnect).duration(),
        Some(Duration::from_secs(2))
    );
}

#[tokio::test(start_paused = true)]
async fn test_rejected_hush_keeps_other_stages_successful() {
    // Arrange
    let mut rig = rig(SimulationProfile {
        hush_result_code: 5,
        ..reference_profile()
    });

    // Act
    let outcome = rig
        .sequencer
        .execute_trial(NAME, SCAN_TIMEOUT, policy(1))
        .await
        .expect("peripheral resolves");

    // Assert
    assert!(!outcome.hushed());
    assert!(outcome.transport_connected());
    assert!(outcome.application_connected());
    assert!(outcome.application_closed());
    assert!(outcome.transport_disconnected());
    assert_eq!(
        outcome.stage(Stage::AuthenticatedCommand).elapsed(),
        Some(Duration::from_millis(200))
    );
    assert_eq!(rig.sequencer.stats().fail_count(), 1);
    assert!(rig.sequencer.stats().recorder().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_unsubscribe_is_bounded_by_close_timeout() {
    // Arrange
    let profile = SimulationProfile {
        unsubscribe_signalled: false,
        ..reference_profile()
    };
    let mut rig = rig(profile);
    rig.sequencer = rig.sequencer.with_close_timeout(Duration::from_secs(5));

    // Act
    let outcome = rig
        .sequencer
        .execute_trial(NAME, SCAN_TIMEOUT, policy(1))
        .await
        .expect("peripheral resolves");

    // Assert
    assert!(outcome.application_closed());
    assert_eq!(
        outcome.stage(Stage::ApplicationClose).duration(),
        Some(Duration::from_millis(5300))
    );
    assert_eq!(rig.sequencer.stats().pass_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_session_refusal_still_disconnects_transport() {
    let mut rig = rig(SimulationProfile {
        session_connect_fails: true,
        ..reference_profile()
    });

    let hushed = rig.sequencer.run_trial(NAME, SCAN_TIMEOUT, policy(1)).await;

    assert!(!hushed);
    assert_eq!(rig.device.hush_count(), 0);
    assert_eq!(rig.device.close_count(), 0);
    assert_eq!(rig.ble.disconnect_count(), 1);
    assert_eq!(rig.sequencer.stats().fail_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hushed_trial_with_stuck_disconnect_returns_true_but_counts_failure() {
    let mut rig = rig(SimulationProfile {
        disconnect_sticks: true,
        ..reference_profile()
    });

    let hushed = rig.sequencer.run_trial(NAME, SCAN_TIMEOUT, policy(1)).await;

    assert!(hushed);
    assert_eq!(rig.sequencer.stats().pass_count(), 0);
    assert_eq!(rig.sequencer.stats().fail_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_background_scan_reuses_cached_advertisements() {
    // Arrange
    let mut rig = rig(reference_profile());
    rig.sequencer.start_background_scan("Protect").expect("scan starts");

    // Act
    assert!(rig.sequencer.run_trial(NAME, SCAN_TIMEOUT, policy(1)).await);
    assert!(rig.sequencer.run_trial(NAME, SCAN_TIMEOUT, policy(1)).await);
    rig.sequencer.stop_background_scan();

    // Assert
    assert_eq!(rig.ble.scan_count(), 1);
    assert_eq!(rig.sequencer.stats().pass_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_counters_sum_to_resolved_trials_and_chart_is_published() {
    // Arrange
    let mut rig = rig(reference_profile());
    let mut failing = rig_with_failures();

    // Act
    for _ in 0..3 {
        rig.sequencer.run_trial(NAME, SCAN_TIMEOUT, policy(1)).await;
        failing.sequencer.run_trial(NAME, SCAN_TIMEOUT, policy(1)).await;
    }
    rig.sequencer.run_trial("Garage Protect", SCAN_TIMEOUT, policy(1)).await;

    let mut sink = JsonChartSink::new(Vec::new());
    let chart = report_trials(rig.sequencer.stats(), &mut sink)
        .expect("chart written")
        .expect("chart present");

    // Assert
    assert_eq!(rig.sequencer.stats().counter().total(), 3);
    assert_eq!(failing.sequencer.stats().counter().total(), 3);
    assert_eq!(failing.sequencer.stats().fail_count(), 3);
    assert_eq!(chart.series.len(), 3);
    assert_eq!(chart.labels[3], "Hush responded");

    let json = String::from_utf8(sink.into_inner()).expect("utf-8");
    assert!(json.contains("\"BLE disconnected\""));
}

fn rig_with_failures() -> Rig {
    rig(SimulationProfile {
        hush_fails: true,
        ..reference_profile()
    })
}

#[tokio::test(start_paused = true)]
async fn test_successful_trial_logs_each_stage_in_order() {
    // Arrange
    let logs = CapturedLogs::default();
    let _guard = logs.install();
    let mut rig = rig(reference_profile());

    // Act
    assert!(rig.sequencer.run_trial(NAME, SCAN_TIMEOUT, policy(1)).await);

    // Assert
    let text = logs.text();
    let positions = [
        position(&text, "Hush sequence started"),
        position(&text, "BLE connection complete: 1.000000 seconds"),
        position(&text, "WEAVE connection complete: 0.500000 seconds"),
        position(&text, "HUSH(0) complete: 0.200000 seconds"),
        position(&text, "CLOSE complete: 0.300000 seconds"),
        position(&text, "DISCONNECT complete: 0.100000 seconds"),
    ];
    assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "stage lines out of order:\n{text}"
    );
    assert!(!text.contains("Was not able to"));
}

#[tokio::test(start_paused = true)]
async fn test_missing_advertisement_only_logs_not_found() {
    // Arrange
    let logs = CapturedLogs::default();
    let _guard = logs.install();
    let mut rig = rig(reference_profile());

    // Act
    assert!(!rig.sequencer.run_trial("Garage Protect", SCAN_TIMEOUT, policy(1)).await);

    // Assert
    let text = logs.text();
    position(&text, "Did not find advertisement");
    assert!(!text.contains("Hush sequence started"));
    assert!(!text.contains("complete:"));
    assert_eq!(rig.sequencer.stats().counter().total(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_connect_logs_failure_and_no_teardown_lines() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();
    let mut rig = rig(SimulationProfile {
        transport_connect_failures: 10,
        ..reference_profile()
    });

    rig.sequencer.run_trial(NAME, SCAN_TIMEOUT, policy(2)).await;

    let text = logs.text();
    position(&text, "Was not able to connect");
    assert!(!text.contains("BLE connection complete"));
    assert!(!text.contains("DISCONNECT complete"));
}

#[tokio::test(start_paused = true)]
async fn test_stuck_disconnect_logs_failure_line() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();
    let mut rig = rig(SimulationProfile {
        disconnect_sticks: true,
        ..reference_profile()
    });

    rig.sequencer.run_trial(NAME, SCAN_TIMEOUT, policy(1)).await;

    let text = logs.text();
    let closed = position(&text, "CLOSE complete");
    let stuck = position(&text, "Was not able to disconnect");
    assert!(closed < stuck);
    assert!(!text.contains("DISCONNECT complete"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_close_still_disconnects_transport() {
    // Arrange
    let mut rig = rig(SimulationProfile {
        close_fails: true,
        ..reference_profile()
    });

    // Act
    let outcome = rig
        .sequencer
        .execute_trial(NAME, SCAN_TIMEOUT, policy(1))
        .await
        .expect("peripheral resolves");

    // Assert
    assert!(outcome.hushed());
    assert!(!outcome.application_closed());
    assert!(outcome
        .stage(Stage::ApplicationClose)
        .failure_reason()
        .is_some_and(|reason| reason.contains("close failed")));
    assert_eq!(rig.device.close_count(), 1);
    assert_eq!(rig.device.close_endpoints_count(), 0);
    assert!(outcome.transport_disconnected());
    assert_eq!(rig.ble.disconnect_count(), 1);
    assert_eq!(rig.sequencer.stats().fail_count(), 1);
    assert!(rig.sequencer.stats().recorder().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_configured_credentials_reach_the_session() {
    // Arrange
    let cfg: AppConfig = toml::from_str(
        r#"
            [handshake]
            pairing_code = "NZB7QC"
            access_token = [7, 7]
        "#,
    )
    .expect("valid config");
    let mut rig = rig(reference_profile());
    rig.sequencer = rig.sequencer.with_credentials(cfg.session_credentials());

    // Act
    assert!(rig.sequencer.run_trial(NAME, SCAN_TIMEOUT, policy(1)).await);

    // Assert
    assert_eq!(
        rig.device.last_credentials(),
        Some(SessionCredentials {
            pairing_code: Some("NZB7QC".to_string()),
            access_token: Some(vec![7, 7]),
        })
    );
}
