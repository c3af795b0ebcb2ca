//! `/health` endpoint body.

use std::time::Instant;

use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the listener is serving.
    pub status: &'static str,
    /// Generator family served by this listener.
    pub signal: &'static str,
    /// Seconds since the endpoint was created.
    pub uptime_secs: u64,
    /// Connections on the shared path.
    pub shared_connections: usize,
    /// Sessions on the individual path.
    pub individual_sessions: usize,
}

/// Build a health response from live counters.
pub fn health_check(
    signal: &'static str,
    start_time: Instant,
    shared_connections: usize,
    individual_sessions: usize,
) -> HealthResponse {
    HealthResponse {
        status: "ok",
        signal,
        uptime_secs: start_time.elapsed().as_secs(),
        shared_connections,
        individual_sessions,
    }
}
