//! Prometheus metrics recorder and metric names.
//!
//! Every series carries `signal` (`ramp` | `sine`) and `mode`
//! (`shared` | `individual`) labels.

use std::fmt;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render `/metrics`. Call once at startup.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Connections opened (counter).
pub const CONNECTIONS_TOTAL: &str = "wavecast_connections_total";
/// Connections currently open (gauge).
pub const CONNECTIONS_ACTIVE: &str = "wavecast_connections_active";
/// Connection lifetime in seconds (histogram).
pub const CONNECTION_DURATION_SECONDS: &str = "wavecast_connection_duration_seconds";
/// Samples queued for delivery (counter).
pub const SAMPLES_SENT_TOTAL: &str = "wavecast_samples_sent_total";
/// Samples not queued (counter, extra label: `reason` = `closed` | `full`).
pub const SEND_FAILURES_TOTAL: &str = "wavecast_send_failures_total";
/// Parameter updates applied (counter).
pub const UPDATES_TOTAL: &str = "wavecast_updates_total";
/// Inbound messages reported and ignored (counter, extra label: `reason`).
pub const REJECTED_MESSAGES_TOTAL: &str = "wavecast_rejected_messages_total";

/// Delivery mode label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// One generator for every connection on the endpoint.
    Shared,
    /// One generator per connection.
    Individual,
}

impl Mode {
    /// Label value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::Individual => "individual",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
