// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor configuration.
//!
//! A TOML file with every knob optional; unset values take the defaults
//! below. Paths default under the per-user state directory
//! (`$XDG_STATE_HOME/gaffer` or `~/.local/state/gaffer`).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to read config {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory containing `jobs/<job_id>/` evidence trees.
    pub outputs_root: PathBuf,
    /// Location of the persistent job store ledger.
    pub store_path: PathBuf,
    /// Concurrency bound. Zero is legal: jobs queue, nothing runs.
    pub max_workers: usize,
    pub tick_period_seconds: f64,
    pub heartbeat_period_seconds: f64,
    pub heartbeat_timeout_seconds: f64,
    pub graceful_termination_seconds: f64,
    pub abort_escalation_seconds: f64,
}

impl Default for Config {
    fn default() -> Self {
        let state = state_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            outputs_root: state.join("outputs"),
            store_path: state.join("store.ledger"),
            max_workers: 4,
            tick_period_seconds: 1.0,
            heartbeat_period_seconds: 2.0,
            heartbeat_timeout_seconds: 10.0,
            graceful_termination_seconds: 2.0,
            abort_escalation_seconds: 30.0,
        }
    }
}

impl Config {
    /// Load from a TOML file, filling unset keys with defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config: Config =
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("tick_period_seconds", self.tick_period_seconds),
            ("heartbeat_period_seconds", self.heartbeat_period_seconds),
            ("heartbeat_timeout_seconds", self.heartbeat_timeout_seconds),
            ("graceful_termination_seconds", self.graceful_termination_seconds),
            ("abort_escalation_seconds", self.abort_escalation_seconds),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(self.tick_period_seconds)
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs_f64(self.heartbeat_period_seconds)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.heartbeat_timeout_seconds)
    }

    pub fn graceful_termination(&self) -> Duration {
        Duration::from_secs_f64(self.graceful_termination_seconds)
    }

    pub fn abort_escalation(&self) -> Duration {
        Duration::from_secs_f64(self.abort_escalation_seconds)
    }
}

/// Per-user state directory: `$XDG_STATE_HOME/gaffer` or `~/.local/state/gaffer`.
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("gaffer"));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".local").join("state").join("gaffer"))
        .ok_or(ConfigError::NoStateDir)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
