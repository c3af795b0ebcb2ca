//! Per-client stream: one generator and parameter block per session.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use wavecast_core::{SendError, Signal};

use super::{next_frame, ticker};
use crate::metrics::{Mode, SAMPLES_SENT_TOTAL, SEND_FAILURES_TOTAL};
use crate::registry::Session;

/// Stream to one session until it is deactivated, its connection closes, or
/// `cancel` fires.
///
/// The loop owns the generator state. It reads the session's parameters
/// through the reference captured at spawn, never through the registry, and
/// never mutates the registry: removal is the close handler's job.
pub async fn run_session<S: Signal>(
    signal: Arc<S>,
    session: Arc<Session<S>>,
    tick: Duration,
    cancel: CancellationToken,
) {
    let name = signal.name();
    let mode = Mode::Individual.as_str();
    let mut state = signal.initial_state();
    let mut interval = ticker(tick);
    debug!(connection_id = %session.id(), signal = name, "stream started");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        if !session.is_active() {
            break;
        }

        let Some(frame) = next_frame(&*signal, session.params(), &mut state) else {
            continue;
        };

        match session.connection().send(frame) {
            Ok(()) => {
                counter!(SAMPLES_SENT_TOTAL, "signal" => name, "mode" => mode).increment(1);
            }
            Err(SendError::Full) => {
                counter!(SEND_FAILURES_TOTAL, "signal" => name, "mode" => mode, "reason" => "full")
                    .increment(1);
                debug!(connection_id = %session.id(), signal = name, "sample dropped: queue full");
            }
            Err(SendError::Closed) => {
                counter!(SEND_FAILURES_TOTAL, "signal" => name, "mode" => mode, "reason" => "closed")
                    .increment(1);
                warn!(connection_id = %session.id(), signal = name, "send failed, stopping stream");
                let _ = session.deactivate();
                break;
            }
        }
    }

    debug!(connection_id = %session.id(), signal = name, "stream stopped");
}
