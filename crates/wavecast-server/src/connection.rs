//! Connection handle held by the core.
//!
//! The transport owns the socket. The core only holds the sending half of
//! the bounded queue that feeds the socket's writer task, plus the ID.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use wavecast_core::{ConnectionId, SendError};

/// Represents a connected `WebSocket` client.
#[derive(Debug)]
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Send channel to the client's `WebSocket` write task.
    tx: mpsc::Sender<Arc<str>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Count of samples dropped due to a full queue.
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<str>>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Fresh connection with its own queue of `capacity`, returning the
    /// receiving half the writer task drains.
    pub fn channel(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Arc::new(Self::new(ConnectionId::new(), tx)), rx)
    }

    /// Queue a text frame without waiting.
    ///
    /// [`SendError::Full`] means this frame was dropped and counted; the
    /// connection is still usable. [`SendError::Closed`] means the writer is
    /// gone.
    pub fn send(&self, text: Arc<str>) -> Result<(), SendError> {
        match self.tx.try_send(text) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                Err(SendError::Full)
            }
            Err(TrySendError::Closed(_)) => Err(SendError::Closed),
        }
    }

    /// Whether the writer side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
