//! Connection event handlers: the glue the transport drives on open,
//! message and close.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, gauge};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wavecast_core::{ConnectionId, ParameterUpdate, Signal, UpdateError};

use crate::connection::ClientConnection;
use crate::metrics::{
    CONNECTIONS_ACTIVE, CONNECTIONS_TOTAL, Mode, REJECTED_MESSAGES_TOTAL, UPDATES_TOTAL,
};
use crate::registry::SessionRegistry;
use crate::stream::{Broadcast, run_session};

/// Reacts to transport notifications for one path.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Delivery mode served by this handler.
    fn mode(&self) -> Mode;

    /// A connection was accepted.
    async fn on_open(&self, connection: Arc<ClientConnection>);

    /// A text message arrived. Unknown connections are ignored.
    async fn on_message(&self, id: &ConnectionId, text: &str);

    /// The connection closed. Called exactly once per opened connection.
    async fn on_close(&self, id: &ConnectionId, reason: &str);
}

/// Decode `text` and apply it to `params`, reporting failures.
fn apply_text<S: Signal>(
    signal: &S,
    mode: Mode,
    id: &ConnectionId,
    text: &str,
    apply: impl FnOnce(&ParameterUpdate) -> Option<Result<(), UpdateError>>,
) {
    let name = signal.name();
    let update = match ParameterUpdate::parse(text) {
        Ok(update) => update,
        Err(e) => return reject(name, mode, id, &e),
    };
    match apply(&update) {
        None => {
            debug!(connection_id = %id, signal = name, "message for unknown connection ignored");
        }
        Some(Err(e)) => reject(name, mode, id, &e),
        Some(Ok(())) => {
            counter!(UPDATES_TOTAL, "signal" => name, "mode" => mode.as_str()).increment(1);
            info!(
                connection_id = %id,
                signal = name,
                mode = mode.as_str(),
                value_min = ?update.value_min,
                value_max = ?update.value_max,
                frequency = ?update.frequency,
                "parameters updated"
            );
        }
    }
}

fn reject(name: &'static str, mode: Mode, id: &ConnectionId, err: &UpdateError) {
    counter!(
        REJECTED_MESSAGES_TOTAL,
        "signal" => name,
        "mode" => mode.as_str(),
        "reason" => err.kind()
    )
    .increment(1);
    warn!(connection_id = %id, signal = name, mode = mode.as_str(), error = %err, "ignoring message");
}

fn record_open(name: &'static str, mode: Mode) {
    counter!(CONNECTIONS_TOTAL, "signal" => name, "mode" => mode.as_str()).increment(1);
    gauge!(CONNECTIONS_ACTIVE, "signal" => name, "mode" => mode.as_str()).increment(1.0);
}

fn record_close(name: &'static str, mode: Mode) {
    gauge!(CONNECTIONS_ACTIVE, "signal" => name, "mode" => mode.as_str()).decrement(1.0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared mode
// ─────────────────────────────────────────────────────────────────────────────

/// Handler for the shared path: joins connections to the endpoint's
/// [`Broadcast`] and routes updates to its single parameter block.
pub struct SharedHandler<S: Signal> {
    broadcast: Arc<Broadcast<S>>,
}

impl<S: Signal> SharedHandler<S> {
    /// Handler feeding `broadcast`.
    pub fn new(broadcast: Arc<Broadcast<S>>) -> Self {
        Self { broadcast }
    }
}

#[async_trait]
impl<S: Signal> ConnectionHandler for SharedHandler<S> {
    fn mode(&self) -> Mode {
        Mode::Shared
    }

    async fn on_open(&self, connection: Arc<ClientConnection>) {
        let id = connection.id.clone();
        self.broadcast.connections().add(connection);
        record_open(self.broadcast.signal().name(), Mode::Shared);
        info!(
            connection_id = %id,
            signal = self.broadcast.signal().name(),
            connections = self.broadcast.connections().len(),
            "shared client connected"
        );
    }

    async fn on_message(&self, id: &ConnectionId, text: &str) {
        let broadcast = &self.broadcast;
        apply_text(broadcast.signal(), Mode::Shared, id, text, |update| {
            if !broadcast.connections().contains(id) {
                return None;
            }
            Some(broadcast.signal().apply(broadcast.params(), update))
        });
    }

    async fn on_close(&self, id: &ConnectionId, reason: &str) {
        if self.broadcast.connections().remove(id) {
            record_close(self.broadcast.signal().name(), Mode::Shared);
            info!(
                connection_id = %id,
                signal = self.broadcast.signal().name(),
                reason,
                connections = self.broadcast.connections().len(),
                "shared client disconnected"
            );
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Individual mode
// ─────────────────────────────────────────────────────────────────────────────

/// Handler for the individual path: one session and one loop per connection.
pub struct IndividualHandler<S: Signal> {
    signal: Arc<S>,
    sessions: Arc<SessionRegistry<S>>,
    tick: Duration,
    cancel: CancellationToken,
}

impl<S: Signal> IndividualHandler<S> {
    /// Handler registering sessions in `sessions`, ticking every `tick`,
    /// with loops stopped when `cancel` fires.
    pub fn new(
        signal: Arc<S>,
        sessions: Arc<SessionRegistry<S>>,
        tick: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            signal,
            sessions,
            tick,
            cancel,
        }
    }
}

#[async_trait]
impl<S: Signal> ConnectionHandler for IndividualHandler<S> {
    fn mode(&self) -> Mode {
        Mode::Individual
    }

    async fn on_open(&self, connection: Arc<ClientConnection>) {
        let id = connection.id.clone();
        let session = self
            .sessions
            .register(connection, self.signal.default_params());
        let stream = run_session(
            self.signal.clone(),
            session.clone(),
            self.tick,
            self.cancel.child_token(),
        );
        if let Err(e) = session.start_stream(stream) {
            error!(connection_id = %id, error = %e, "failed to start stream");
            return;
        }
        record_open(self.signal.name(), Mode::Individual);
        info!(
            connection_id = %id,
            signal = self.signal.name(),
            sessions = self.sessions.len(),
            "individual client connected"
        );
    }

    async fn on_message(&self, id: &ConnectionId, text: &str) {
        apply_text(&*self.signal, Mode::Individual, id, text, |update| {
            self.sessions.update_params(&self.signal, id, update)
        });
    }

    async fn on_close(&self, id: &ConnectionId, reason: &str) {
        let Some(session) = self.sessions.deactivate_and_remove(id) else {
            debug!(connection_id = %id, "close for unknown connection ignored");
            return;
        };
        session.join().await;
        record_close(self.signal.name(), Mode::Individual);
        info!(
            connection_id = %id,
            signal = self.signal.name(),
            reason,
            sessions = self.sessions.len(),
            "individual client disconnected"
        );
    }
}
