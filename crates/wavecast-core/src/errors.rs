//! Error types shared by the generator and transport layers.
//!
//! Neither error is ever escalated past the task that observed it: an
//! [`UpdateError`] is reported and the message dropped, a [`SendError`] is
//! handled by the loop that tried to deliver.

use thiserror::Error;

/// Why an inbound parameter message was not applied.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The payload was not valid JSON.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The payload was valid JSON but not an object.
    #[error("message is not a JSON object")]
    NotAnObject,
    /// None of the recognised keys applies to this signal family.
    #[error("no applicable fields (expected {expected})")]
    NoApplicableFields {
        /// Keys this signal family understands.
        expected: &'static str,
    },
}

impl UpdateError {
    /// Short classification string for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::NotAnObject => "not_an_object",
            Self::NoApplicableFields { .. } => "no_applicable_fields",
        }
    }
}

/// Why a sample could not be handed to a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SendError {
    /// The connection's writer is gone; the socket is presumed broken.
    #[error("connection closed")]
    Closed,
    /// The outbound queue is saturated; this sample was dropped.
    #[error("outbound queue full")]
    Full,
}

impl SendError {
    /// Whether the connection should be considered dead.
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Short classification string for logs and metric labels.
    pub fn kind(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Full => "full",
        }
    }
}
