//! Session registry (individual mode) and connection set (shared mode).
//!
//! Both are a `HashMap` behind one `parking_lot::RwLock`. The lock is never
//! held across an `.await` or a send: loops work from [`SharedConnections::snapshot`]
//! copies, and per-client loops hold their own `Arc<Session>` captured at spawn.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;
use wavecast_core::{ConnectionId, ParameterUpdate, Signal, UpdateError};

use crate::connection::ClientConnection;
use crate::errors::ServerError;

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// One individually-streamed client.
#[derive(Debug)]
pub struct Session<S: Signal> {
    connection: Arc<ClientConnection>,
    params: S::Params,
    active: AtomicBool,
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<S: Signal> Session<S> {
    /// A new, active session that has not started streaming.
    pub fn new(connection: Arc<ClientConnection>, params: S::Params) -> Self {
        Self {
            connection,
            params,
            active: AtomicBool::new(true),
            started: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    /// Connection this session streams to.
    pub fn connection(&self) -> &Arc<ClientConnection> {
        &self.connection
    }

    /// Connection ID.
    pub fn id(&self) -> &ConnectionId {
        &self.connection.id
    }

    /// Parameter block, updated in place by message handlers.
    pub fn params(&self) -> &S::Params {
        &self.params
    }

    /// Whether the loop should keep running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Clear the liveness flag. Returns `true` only for the call that
    /// actually flipped it.
    pub fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    /// Spawn the session's generation loop. At most once per session.
    pub fn start_stream<F>(&self, stream: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ServerError::StreamAlreadyStarted(self.id().clone()));
        }
        *self.task.lock() = Some(tokio::spawn(stream));
        Ok(())
    }

    /// Take the loop handle, if it has not been taken already.
    pub fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task.lock().take()
    }

    /// Wait for the loop to finish. Returns immediately if it was never
    /// started or another caller already took the handle.
    pub async fn join(&self) {
        let Some(handle) = self.take_task() else {
            return;
        };
        if let Err(e) = handle.await {
            if e.is_panic() {
                tracing::error!(connection_id = %self.id(), "stream task panicked");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionRegistry
// ─────────────────────────────────────────────────────────────────────────────

/// Connection ID to [`Session`] map for one individual-mode path.
#[derive(Debug)]
pub struct SessionRegistry<S: Signal> {
    sessions: RwLock<HashMap<ConnectionId, Arc<Session<S>>>>,
}

impl<S: Signal> SessionRegistry<S> {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a session for `connection`.
    ///
    /// IDs are unique per connection; if one is somehow reused, the previous
    /// session is deactivated so its loop exits.
    pub fn register(
        &self,
        connection: Arc<ClientConnection>,
        params: S::Params,
    ) -> Arc<Session<S>> {
        let session = Arc::new(Session::new(connection, params));
        let previous = self
            .sessions
            .write()
            .insert(session.id().clone(), session.clone());
        if let Some(previous) = previous {
            let _ = previous.deactivate();
            debug!(connection_id = %session.id(), "replaced existing session");
        }
        session
    }

    /// Look up a live session.
    pub fn lookup(&self, id: &ConnectionId) -> Option<Arc<Session<S>>> {
        self.sessions.read().get(id).cloned()
    }

    /// Apply `update` to the session's parameters in place.
    ///
    /// `None` means no session is registered under `id`: a stale event,
    /// not an error.
    pub fn update_params(
        &self,
        signal: &S,
        id: &ConnectionId,
        update: &ParameterUpdate,
    ) -> Option<Result<(), UpdateError>> {
        let session = self.lookup(id)?;
        Some(signal.apply(session.params(), update))
    }

    /// Deactivate then remove, under the write lock.
    ///
    /// Once this returns, [`lookup`](Self::lookup) reports not-found and the
    /// session's loop exits at its next tick.
    pub fn deactivate_and_remove(&self, id: &ConnectionId) -> Option<Arc<Session<S>>> {
        let mut sessions = self.sessions.write();
        let session = sessions.get(id)?.clone();
        let _ = session.deactivate();
        let _ = sessions.remove(id);
        Some(session)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Point-in-time copy of the registered IDs.
    pub fn handles(&self) -> Vec<ConnectionId> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Deactivate every session, clear the map and hand back the loop
    /// handles for the caller to await.
    pub fn drain_tasks(&self) -> Vec<JoinHandle<()>> {
        let drained: Vec<_> = self.sessions.write().drain().map(|(_, s)| s).collect();
        drained
            .iter()
            .filter_map(|session| {
                let _ = session.deactivate();
                session.take_task()
            })
            .collect()
    }
}

impl<S: Signal> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SharedConnections
// ─────────────────────────────────────────────────────────────────────────────

/// Connection set served by one broadcast loop.
#[derive(Debug, Default)]
pub struct SharedConnections {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl SharedConnections {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection.
    pub fn add(&self, connection: Arc<ClientConnection>) {
        let _ = self
            .connections
            .write()
            .insert(connection.id.clone(), connection);
    }

    /// Remove a connection. Returns whether it was present.
    pub fn remove(&self, id: &ConnectionId) -> bool {
        self.connections.write().remove(id).is_some()
    }

    /// Point-in-time copy, safe to iterate while sending.
    pub fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        self.connections.read().values().cloned().collect()
    }

    /// Whether `id` is in the set.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.read().contains_key(id)
    }

    /// Number of connections.
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
