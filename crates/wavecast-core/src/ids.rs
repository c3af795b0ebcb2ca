//! Branded connection identifiers.
//!
//! The transport layer owns the socket; everything else refers to a
//! connection only through its [`ConnectionId`]. IDs are UUID v7 so they sort
//! by creation time in logs.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PREFIX: &str = "conn";

/// Opaque, comparable identity of one transport-level connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Mint a fresh ID (`conn_<uuid v7>`).
    #[must_use]
    pub fn new() -> Self {
        Self(format!("{PREFIX}_{}", Uuid::now_v7()))
    }

    /// Wrap an existing string without validation.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConnectionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_prefix() {
        let id = ConnectionId::new();
        assert!(id.as_str().starts_with("conn_"), "got: {id}");
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn ids_sort_by_creation() {
        let ids: Vec<ConnectionId> = (0..50).map(|_| ConnectionId::new()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "{} >= {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn from_raw_preserves_value() {
        let id = ConnectionId::from_raw("client-a");
        assert_eq!(id.as_str(), "client-a");
        assert_eq!(id.to_string(), "client-a");
    }

    #[test]
    fn serializes_transparently() {
        let id = ConnectionId::from_raw("conn_x");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"conn_x\"");
    }
}
