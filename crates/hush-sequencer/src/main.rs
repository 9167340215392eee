//! hush-sequencer: runs repeated hush trials against a peripheral.
//!
//! Each trial connects the transport, opens the application session, sends
//! the authenticated hush, and tears everything down again while timing
//! every stage.  At the end of the run a summary is logged and the
//! cumulative latency chart is written as JSON for an external plotter.
//!
//! # Usage
//!
//! ```text
//! hush-sequencer [OPTIONS]
//!
//! Options:
//!   --peripheral <NAME>          Advertised name to hush
//!   --trials <N>                 Number of trials to run
//!   --scan-timeout <SECS>        Bound on each discovery scan
//!   --connect-retries <N>        Transport connect retries after the first attempt
//!   --config <PATH>              Config file instead of the platform default
//!   --background-scan            Keep scanning between trials
//!   --chart <PATH>               Write the chart JSON here instead of stdout
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                | Description                               |
//! |-------------------------|-------------------------------------------|
//! | `HUSH_PERIPHERAL`       | Advertised name to hush                   |
//! | `HUSH_TRIALS`           | Number of trials                          |
//! | `HUSH_SCAN_TIMEOUT`     | Scan timeout in seconds                   |
//! | `HUSH_CONNECT_RETRIES`  | Transport connect retries                 |
//! | `HUSH_CONFIG`           | Config file path                          |
//! | `RUST_LOG`              | `tracing` filter, overrides `log_level`   |
//!
//! CLI args take precedence over environment variables, which take
//! precedence over the config file.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hush_sequencer::application::report_trials::report_trials;
use hush_sequencer::application::run_trial::HandshakeSequencer;
use hush_sequencer::infrastructure::reporting::JsonChartSink;
use hush_sequencer::infrastructure::simulation::{SimulatedBleManager, SimulatedDeviceManager};
use hush_sequencer::infrastructure::storage::config::{self, AppConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Hush handshake sequencer.
///
/// Drives a peripheral through connect, hush, and teardown repeatedly and
/// reports per-stage latency.
#[derive(Debug, Parser)]
#[command(
    name = "hush-sequencer",
    about = "Times the hush handshake against a peripheral over repeated trials",
    version
)]
struct Cli {
    /// Advertised name of the peripheral to hush.
    #[arg(long, env = "HUSH_PERIPHERAL")]
    peripheral: Option<String>,

    /// Number of trials to run.
    #[arg(long, env = "HUSH_TRIALS")]
    trials: Option<u32>,

    /// Discovery scan timeout in seconds.
    #[arg(long, env = "HUSH_SCAN_TIMEOUT")]
    scan_timeout: Option<u64>,

    /// Transport connect retries after the first attempt.  Must be at least 1.
    #[arg(long, env = "HUSH_CONNECT_RETRIES")]
    connect_retries: Option<u32>,

    /// Config file to load instead of the platform default.
    #[arg(long, env = "HUSH_CONFIG")]
    config: Option<PathBuf>,

    /// Keep a background scan running between trials.
    #[arg(long)]
    background_scan: bool,

    /// Write the latency chart JSON to this file instead of stdout.
    #[arg(long)]
    chart: Option<PathBuf>,
}

impl Cli {
    /// Loads the config file and applies the CLI overrides on top.
    fn into_app_config(self) -> anyhow::Result<AppConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => config::load_config().context("failed to load platform config")?,
        };

        if let Some(peripheral) = self.peripheral {
            cfg.runner.peripheral = peripheral;
        }
        if let Some(trials) = self.trials {
            cfg.runner.trials = trials;
        }
        if let Some(secs) = self.scan_timeout {
            cfg.sequencer.scan_timeout_secs = secs;
        }
        if let Some(retries) = self.connect_retries {
            cfg.sequencer.max_connect_attempts = retries;
        }
        if self.background_scan {
            cfg.runner.background_scan = true;
        }
        if self.chart.is_some() {
            cfg.runner.chart_path = self.chart;
        }
        Ok(cfg)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = Cli::parse().into_app_config()?;

    // RUST_LOG wins over the configured level.  Logs go to stderr so the
    // chart JSON on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.runner.log_level)),
        )
        .init();

    let parameters = cfg.handshake_parameters().context("invalid [handshake] section")?;
    let policy = cfg.retry_policy().context("invalid [sequencer] section")?;
    let scan_timeout = cfg.scan_timeout();
    let peripheral = cfg.runner.peripheral.clone();

    info!(
        peripheral = %peripheral,
        trials = cfg.runner.trials,
        ?scan_timeout,
        max_connect_attempts = policy.max_connect_attempts(),
        "hush-sequencer starting"
    );

    let ble = Arc::new(SimulatedBleManager::new(cfg.simulation.clone()));
    let device = Arc::new(SimulatedDeviceManager::new(Arc::clone(&ble)));
    let mut sequencer = HandshakeSequencer::new(ble.clone(), ble, device, parameters)
        .with_close_timeout(cfg.close_timeout())
        .with_credentials(cfg.session_credentials());

    if cfg.runner.background_scan {
        sequencer
            .start_background_scan(&peripheral)
            .context("failed to start background scan")?;
    }

    // ── Shutdown signal ───────────────────────────────────────────────────────
    //
    // Ctrl+C stops the run between trials; a trial in progress always
    // finishes its teardown.
    let running = Arc::new(AtomicBool::new(true));
    let running_signal = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, stopping after the current trial");
            running_signal.store(false, Ordering::SeqCst);
        }
    });

    for trial in 1..=cfg.runner.trials {
        if !running.load(Ordering::SeqCst) {
            warn!(completed = trial - 1, "run interrupted");
            break;
        }
        let hushed = sequencer.run_trial(&peripheral, scan_timeout, policy).await;
        info!(trial, hushed, "trial finished");
    }

    if cfg.runner.background_scan {
        sequencer.stop_background_scan();
    }

    match &cfg.runner.chart_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create chart file {}", path.display()))?;
            let mut sink = JsonChartSink::new(BufWriter::new(file));
            report_trials(sequencer.stats(), &mut sink).context("failed to write chart")?;
        }
        None => {
            let mut sink = JsonChartSink::new(std::io::stdout()).pretty();
            report_trials(sequencer.stats(), &mut sink).context("failed to write chart")?;
        }
    }

    Ok(())
}
