//! Settings types. JSON field names are camelCase; every field has a default.

use serde::{Deserialize, Serialize};
use wavecast_core::logging::{LogFormat, LogLevel};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WavecastSettings {
    /// Listener settings shared by both endpoints.
    pub server: ServerSettings,
    /// Ramp endpoint.
    pub ramp: RampSettings,
    /// Sine endpoint.
    pub sine: SineSettings,
    /// Log output.
    pub logging: LoggingSettings,
    /// Upper bound on graceful shutdown before remaining tasks are aborted.
    pub shutdown_timeout_secs: u64,
}

impl Default for WavecastSettings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            ramp: RampSettings::default(),
            sine: SineSettings::default(),
            logging: LoggingSettings::default(),
            shutdown_timeout_secs: 30,
        }
    }
}

impl WavecastSettings {
    /// Reject combinations that cannot be served.
    ///
    /// Port `0` (ephemeral) is always accepted. Inverted bounds are accepted
    /// on purpose; the generators degrade rather than fail.
    pub fn validate(&self) -> Result<()> {
        if self.ramp.port != 0 && self.ramp.port == self.sine.port {
            return Err(SettingsError::InvalidValue(format!(
                "ramp and sine share port {}",
                self.ramp.port
            )));
        }
        if !self.sine.phase_step.is_finite() {
            return Err(SettingsError::InvalidValue(
                "sine.phaseStep must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Ramp endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RampSettings {
    /// Listen port.
    pub port: u16,
    /// Milliseconds between ticks.
    pub tick_interval_ms: u64,
    /// Lower bound for new parameter blocks.
    pub default_min: i64,
    /// Upper bound for new parameter blocks.
    pub default_max: i64,
}

impl Default for RampSettings {
    fn default() -> Self {
        Self {
            port: 8765,
            tick_interval_ms: 3,
            default_min: 0,
            default_max: 3,
        }
    }
}

/// Sine endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SineSettings {
    /// Listen port.
    pub port: u16,
    /// Milliseconds between ticks.
    pub tick_interval_ms: u64,
    /// Amount `t` advances per tick.
    pub phase_step: f64,
    /// Frequency for new parameter blocks.
    pub default_frequency: f64,
    /// Lower bound for new parameter blocks.
    pub default_min: f64,
    /// Upper bound for new parameter blocks.
    pub default_max: f64,
}

impl Default for SineSettings {
    fn default() -> Self {
        Self {
            port: 8766,
            tick_interval_ms: 7,
            phase_step: 0.01,
            default_frequency: 1.0,
            default_min: -1.0,
            default_max: 1.0,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level written to stderr.
    pub level: LogLevel,
    /// Line format.
    pub format: LogFormat,
}
