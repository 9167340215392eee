//! The hush command response and the alarm conditions it carries.
//!
//! A peripheral answers a hush request with a result code and the list of
//! alarm conditions it holds after processing the request.  Each condition is
//! a single byte: the upper nibble names the alarm *source*, the lower nibble
//! its *state*.

use serde::{Deserialize, Serialize};

/// Result code reported by a peripheral that accepted the hush.
pub const HUSH_RESULT_SUCCESS: u8 = 0;

// ── Alarm sources ─────────────────────────────────────────────────────────────

/// Sensor that raised an alarm condition (upper nibble of the condition byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AlarmSource {
    Smoke = 0x10,
    Temperature = 0x20,
    CarbonMonoxide = 0x30,
    NaturalGas = 0x40,
    Humidity = 0x50,
    Other = 0xF0,
}

impl TryFrom<u8> for AlarmSource {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value & 0xF0 {
            0x10 => Ok(AlarmSource::Smoke),
            0x20 => Ok(AlarmSource::Temperature),
            0x30 => Ok(AlarmSource::CarbonMonoxide),
            0x40 => Ok(AlarmSource::NaturalGas),
            0x50 => Ok(AlarmSource::Humidity),
            0xF0 => Ok(AlarmSource::Other),
            _ => Err(()),
        }
    }
}

// ── Alarm states ──────────────────────────────────────────────────────────────

/// Severity of an alarm condition (lower nibble of the condition byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AlarmState {
    Standby = 0x00,
    HeadsUp1 = 0x01,
    HeadsUp2 = 0x02,
    HeadsUpHushed = 0x03,
    AlarmHushable = 0x04,
    AlarmNonHushable = 0x05,
    AlarmGlobalHush = 0x06,
    AlarmRemoteHush = 0x07,
    SelfTest = 0x08,
    AnnounceHeadsUp1 = 0x09,
    AnnounceHeadsUp2 = 0x0A,
}

impl TryFrom<u8> for AlarmState {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value & 0x0F {
            0x00 => Ok(AlarmState::Standby),
            0x01 => Ok(AlarmState::HeadsUp1),
            0x02 => Ok(AlarmState::HeadsUp2),
            0x03 => Ok(AlarmState::HeadsUpHushed),
            0x04 => Ok(AlarmState::AlarmHushable),
            0x05 => Ok(AlarmState::AlarmNonHushable),
            0x06 => Ok(AlarmState::AlarmGlobalHush),
            0x07 => Ok(AlarmState::AlarmRemoteHush),
            0x08 => Ok(AlarmState::SelfTest),
            0x09 => Ok(AlarmState::AnnounceHeadsUp1),
            0x0A => Ok(AlarmState::AnnounceHeadsUp2),
            _ => Err(()),
        }
    }
}

/// A single packed alarm condition byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmCondition(pub u8);

impl AlarmCondition {
    pub fn new(source: AlarmSource, state: AlarmState) -> Self {
        Self(source as u8 | state as u8)
    }

    /// Decoded source, or `None` for a nibble this build does not know.
    pub fn source(&self) -> Option<AlarmSource> {
        AlarmSource::try_from(self.0).ok()
    }

    /// Decoded state, or `None` for a nibble this build does not know.
    pub fn state(&self) -> Option<AlarmState> {
        AlarmState::try_from(self.0).ok()
    }
}

/// Response to an authenticated hush command.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HushResponse {
    /// `0` means the peripheral accepted the hush.
    pub result_code: u8,
    /// Alarm conditions held by the peripheral after the request.
    pub conditions: Vec<AlarmCondition>,
}

impl HushResponse {
    pub fn is_success(&self) -> bool {
        self.result_code == HUSH_RESULT_SUCCESS
    }
}
