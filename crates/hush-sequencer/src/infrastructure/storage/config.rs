//! TOML configuration for the trial runner.
//!
//! Read from the platform-appropriate config file unless a path is given:
//! - Windows:  `%APPDATA%\HushSequencer\config.toml`
//! - Linux:    `~/.config/hush-sequencer/config.toml`
//! - macOS:    `~/Library/Application Support/HushSequencer/config.toml`
//!
//! ```toml
//! [runner]
//! peripheral = "Hallway Protect"
//! trials = 10
//!
//! [sequencer]
//! scan_timeout_secs = 60
//! max_connect_attempts = 1
//!
//! [handshake]
//! key_id = 2
//! pairing_code = "NZB7QC"
//! ```
//!
//! Every field has a `#[serde(default = "...")]` so a partial file, or no
//! file at all, still yields a usable configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use hush_core::{HandshakeParameters, ParameterError, PolicyError, RetryPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::run_trial::{
    SessionCredentials, DEFAULT_CLOSE_TIMEOUT, DEFAULT_SCAN_TIMEOUT,
};
use crate::infrastructure::simulation::SimulationProfile;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid sequencer settings: {0}")]
    Policy(#[from] PolicyError),

    #[error("invalid handshake settings: {0}")]
    Handshake(#[from] ParameterError),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub sequencer: SequencerConfig,
    #[serde(default)]
    pub handshake: HandshakeConfig,
    #[serde(default)]
    pub simulation: SimulationProfile,
}

/// How the runner drives trials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunnerConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_trials")]
    pub trials: u32,
    /// Advertised name of the peripheral under test.
    #[serde(default = "default_peripheral")]
    pub peripheral: String,
    /// Keep scanning between trials instead of scanning on demand.
    #[serde(default)]
    pub background_scan: bool,
    /// Where the chart JSON goes; stdout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SequencerConfig {
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,
    /// Retries after the first transport connect attempt.
    #[serde(default = "default_max_connect_attempts")]
    pub max_connect_attempts: u32,
    /// Bound on the unsubscribe wait after the session close.
    #[serde(default = "default_close_timeout_secs")]
    pub close_timeout_secs: u64,
}

/// Raw hush command parameters, validated by
/// [`AppConfig::handshake_parameters`], plus the optional session
/// credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandshakeConfig {
    #[serde(default = "default_proximity_verification_code")]
    pub proximity_verification_code: u32,
    #[serde(default = "default_challenge")]
    pub challenge: u32,
    #[serde(default = "default_key_id")]
    pub key_id: u16,
    #[serde(default = "default_key")]
    pub key: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<Vec<u8>>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_trials() -> u32 {
    1
}
fn default_peripheral() -> String {
    "Hallway Protect".to_string()
}
fn default_scan_timeout_secs() -> u64 {
    DEFAULT_SCAN_TIMEOUT.as_secs()
}
fn default_max_connect_attempts() -> u32 {
    1
}
fn default_close_timeout_secs() -> u64 {
    DEFAULT_CLOSE_TIMEOUT.as_secs()
}
fn default_proximity_verification_code() -> u32 {
    HandshakeParameters::default().proximity_verification_code
}
fn default_challenge() -> u32 {
    HandshakeParameters::default().challenge
}
fn default_key_id() -> u16 {
    HandshakeParameters::default().key_id
}
fn default_key() -> Vec<u8> {
    HandshakeParameters::default().key.to_vec()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            trials: default_trials(),
            peripheral: default_peripheral(),
            background_scan: false,
            chart_path: None,
        }
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            scan_timeout_secs: default_scan_timeout_secs(),
            max_connect_attempts: default_max_connect_attempts(),
            close_timeout_secs: default_close_timeout_secs(),
        }
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            proximity_verification_code: default_proximity_verification_code(),
            challenge: default_challenge(),
            key_id: default_key_id(),
            key: default_key(),
            pairing_code: None,
            access_token: None,
        }
    }
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Handshake`] when the key is not 16 bytes.
    pub fn handshake_parameters(&self) -> Result<HandshakeParameters, ConfigError> {
        let h = &self.handshake;
        Ok(HandshakeParameters::new(
            h.proximity_verification_code,
            h.challenge,
            h.key_id,
            &h.key,
        )?)
    }

    pub fn session_credentials(&self) -> SessionCredentials {
        SessionCredentials {
            pairing_code: self.handshake.pairing_code.clone(),
            access_token: self.handshake.access_token.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Policy`] when `max_connect_attempts` is 0.
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        Ok(RetryPolicy::new(self.sequencer.max_connect_attempts)?)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.sequencer.scan_timeout_secs)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.sequencer.close_timeout_secs)
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file, returning
/// `AppConfig::default()` if the file does not exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = config_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Loads `AppConfig` from an explicit path.  A missing file is an error.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("HushSequencer"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("hush-sequencer"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("HushSequencer")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("hush-config-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).expect("write temp config");
        path
    }

    #[test]
    fn test_default_config_matches_reference_values() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.scan_timeout(), Duration::from_secs(60));
        assert_eq!(cfg.close_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.retry_policy().unwrap().max_connect_attempts(), 1);
        assert_eq!(cfg.handshake_parameters().unwrap(), HandshakeParameters::default());
        assert_eq!(cfg.runner.log_level, "info");
        assert_eq!(cfg.session_credentials(), SessionCredentials::default());
    }

    #[test]
    fn test_handshake_section_carries_session_credentials() {
        // Arrange
        let text = r#"
            [handshake]
            pairing_code = "NZB7QC"
            access_token = [1, 2, 3]
        "#;

        // Act
        let cfg: AppConfig = toml::from_str(text).unwrap();

        // Assert
        let credentials = cfg.session_credentials();
        assert_eq!(credentials.pairing_code.as_deref(), Some("NZB7QC"));
        assert_eq!(credentials.access_token, Some(vec![1, 2, 3]));
        assert_eq!(cfg.handshake_parameters().unwrap(), HandshakeParameters::default());
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_remaining_defaults() {
        // Arrange
        let text = r#"
            [runner]
            trials = 25

            [sequencer]
            max_connect_attempts = 3

            [simulation]
            hush_result_code = 1
        "#;

        // Act
        let cfg: AppConfig = toml::from_str(text).unwrap();

        // Assert
        assert_eq!(cfg.runner.trials, 25);
        assert_eq!(cfg.runner.peripheral, "Hallway Protect");
        assert_eq!(cfg.retry_policy().unwrap().total_connect_attempts(), 4);
        assert_eq!(cfg.sequencer.scan_timeout_secs, 60);
        assert_eq!(cfg.simulation.hush_result_code, 1);
    }

    #[test]
    fn test_zero_connect_attempts_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.sequencer.max_connect_attempts = 0;
        assert!(matches!(cfg.retry_policy(), Err(ConfigError::Policy(_))));
    }

    #[test]
    fn test_short_key_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.handshake.key = vec![1, 2, 3];
        assert!(matches!(
            cfg.handshake_parameters(),
            Err(ConfigError::Handshake(ParameterError::KeyLength(3)))
        ));
    }

    #[test]
    fn test_load_config_from_reads_file() {
        // Arrange
        let path = temp_config("[runner]\nperipheral = \"Nursery Protect\"\n");

        // Act
        let cfg = load_config_from(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        // Assert
        assert_eq!(cfg.runner.peripheral, "Nursery Protect");
    }

    #[test]
    fn test_load_config_from_missing_file_is_io_error() {
        let path = std::env::temp_dir().join(format!("missing-{}.toml", uuid::Uuid::new_v4()));
        assert!(matches!(load_config_from(&path), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let path = temp_config("[runner\ntrials = ");
        let result = load_config_from(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
