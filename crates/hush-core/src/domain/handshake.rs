//! Fixed handshake parameters and the transport connect retry policy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Required length of the hush signing key in bytes.
pub const HUSH_KEY_LEN: usize = 16;

/// Error returned when building a [`RetryPolicy`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("max connect attempts must be at least 1, got {0}")]
    ZeroAttempts(u32),
}

/// Error returned when building [`HandshakeParameters`] from untrusted input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("hush key must be exactly {HUSH_KEY_LEN} bytes, got {0}")]
    KeyLength(usize),
}

/// Parameters of the authenticated hush command.
///
/// Immutable for the lifetime of a sequencer; every trial sends the same
/// values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeParameters {
    pub proximity_verification_code: u32,
    pub challenge: u32,
    pub key_id: u16,
    pub key: [u8; HUSH_KEY_LEN],
}

impl HandshakeParameters {
    /// Builds parameters from a key of arbitrary length.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::KeyLength`] unless `key` is exactly
    /// [`HUSH_KEY_LEN`] bytes long.
    pub fn new(
        proximity_verification_code: u32,
        challenge: u32,
        key_id: u16,
        key: &[u8],
    ) -> Result<Self, ParameterError> {
        let key: [u8; HUSH_KEY_LEN] = key
            .try_into()
            .map_err(|_| ParameterError::KeyLength(key.len()))?;
        Ok(Self {
            proximity_verification_code,
            challenge,
            key_id,
            key,
        })
    }
}

impl Default for HandshakeParameters {
    fn default() -> Self {
        let mut key = [0u8; HUSH_KEY_LEN];
        key[0] = 0x01;
        Self {
            proximity_verification_code: 0xDEAD_BEEF,
            challenge: 0xABCD_0123,
            key_id: 0x0002,
            key,
        }
    }
}

/// Bounds how many times the transport connect is retried.
///
/// Only the transport connect stage retries.  With `max_connect_attempts = N`
/// the connect call is made at most `N + 1` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    max_connect_attempts: u32,
}

impl RetryPolicy {
    /// # Errors
    ///
    /// Returns [`PolicyError::ZeroAttempts`] when `max_connect_attempts` is 0.
    pub fn new(max_connect_attempts: u32) -> Result<Self, PolicyError> {
        if max_connect_attempts == 0 {
            return Err(PolicyError::ZeroAttempts(max_connect_attempts));
        }
        Ok(Self {
            max_connect_attempts,
        })
    }

    pub fn max_connect_attempts(&self) -> u32 {
        self.max_connect_attempts
    }

    /// Upper bound on connect calls made in a single trial.
    pub fn total_connect_attempts(&self) -> u32 {
        self.max_connect_attempts.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_connect_attempts: 1,
        }
    }
}
