//! Shared-mode stream: one generator, one parameter block, many connections.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use wavecast_core::{SendError, Signal};

use super::{next_frame, ticker};
use crate::metrics::{Mode, SAMPLES_SENT_TOTAL, SEND_FAILURES_TOTAL};
use crate::registry::SharedConnections;

/// State of one shared-mode path.
#[derive(Debug)]
pub struct Broadcast<S: Signal> {
    signal: Arc<S>,
    params: S::Params,
    connections: SharedConnections,
}

impl<S: Signal> Broadcast<S> {
    /// Shared state starting from the signal's default parameters.
    pub fn new(signal: Arc<S>) -> Self {
        let params = signal.default_params();
        Self {
            signal,
            params,
            connections: SharedConnections::new(),
        }
    }

    /// The generator family.
    pub fn signal(&self) -> &S {
        &self.signal
    }

    /// Parameters shared by every connection.
    pub fn params(&self) -> &S::Params {
        &self.params
    }

    /// Connections currently receiving this stream.
    pub fn connections(&self) -> &SharedConnections {
        &self.connections
    }

    /// Run until `cancel` fires.
    ///
    /// Each tick advances the generator once and queues the same frame to
    /// every connection in a fresh snapshot. A failed send is recorded for
    /// that recipient only; the connection stays in the set until the
    /// transport reports the close.
    pub async fn run(self: Arc<Self>, tick: Duration, cancel: CancellationToken) {
        let name = self.signal.name();
        let mode = Mode::Shared.as_str();
        let mut state = self.signal.initial_state();
        let mut interval = ticker(tick);
        info!(signal = name, mode, tick_ms = tick.as_millis(), "broadcast started");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let Some(frame) = next_frame(&*self.signal, &self.params, &mut state) else {
                continue;
            };

            let recipients = self.connections.snapshot();
            for connection in &recipients {
                match connection.send(frame.clone()) {
                    Ok(()) => {
                        counter!(SAMPLES_SENT_TOTAL, "signal" => name, "mode" => mode).increment(1);
                    }
                    Err(e) => {
                        counter!(
                            SEND_FAILURES_TOTAL,
                            "signal" => name,
                            "mode" => mode,
                            "reason" => e.kind()
                        )
                        .increment(1);
                        if e == SendError::Closed {
                            warn!(connection_id = %connection.id, signal = name, mode, "send failed: connection closed");
                        } else {
                            debug!(connection_id = %connection.id, signal = name, mode, "sample dropped: queue full");
                        }
                    }
                }
            }
            trace!(signal = name, recipients = recipients.len(), "broadcast tick");
        }

        info!(signal = name, mode, "broadcast stopped");
    }
}
