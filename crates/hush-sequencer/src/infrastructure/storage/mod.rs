//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the TOML configuration file from the
//! platform config directory (or an explicit path), falls back to defaults
//! when the platform file does not exist, and converts the raw values into
//! validated `hush_core` types.

pub mod config;
