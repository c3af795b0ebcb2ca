//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use wavecast_settings::WavecastSettings;

/// Outbound queue depth per connection.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// One generator family's listener.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Milliseconds between ticks.
    pub tick_interval_ms: u64,
}

impl EndpointConfig {
    /// Tick cadence, clamped to at least one millisecond.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Configuration for both listeners.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Ramp listener.
    pub ramp: EndpointConfig,
    /// Sine listener.
    pub sine: EndpointConfig,
    /// Outbound queue depth per connection.
    pub queue_capacity: usize,
    /// Graceful shutdown timeout in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            ramp: EndpointConfig {
                port: 8765,
                tick_interval_ms: 3,
            },
            sine: EndpointConfig {
                port: 8766,
                tick_interval_ms: 7,
            },
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &WavecastSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            ramp: EndpointConfig {
                port: settings.ramp.port,
                tick_interval_ms: settings.ramp.tick_interval_ms,
            },
            sine: EndpointConfig {
                port: settings.sine.port,
                tick_interval_ms: settings.sine.tick_interval_ms,
            },
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            shutdown_timeout_secs: settings.shutdown_timeout_secs,
        }
    }

    /// Loopback, ephemeral ports. Used by tests.
    pub fn ephemeral() -> Self {
        let mut config = Self {
            host: "127.0.0.1".into(),
            ..Self::default()
        };
        config.ramp.port = 0;
        config.sine.port = 0;
        config
    }

    /// Graceful shutdown timeout.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
