//! Server error types.

use thiserror::Error;
use wavecast_core::ConnectionId;

/// Errors surfaced by the server layer.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A listener could not be bound. The only fatal startup failure.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },
    /// A session's generation loop was already started.
    #[error("stream already started for {0}")]
    StreamAlreadyStarted(ConnectionId),
    /// Other I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_names_address() {
        let err = ServerError::Bind {
            addr: "0.0.0.0:8765".into(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(err.to_string(), "failed to bind 0.0.0.0:8765: in use");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn already_started_names_connection() {
        let err = ServerError::StreamAlreadyStarted(ConnectionId::from_raw("conn_x"));
        assert_eq!(err.to_string(), "stream already started for conn_x");
    }
}
