//! Generation loops.
//!
//! Both loops tick on a `tokio::time::interval`, read parameters fresh each
//! tick, serialize one [`Sample`](wavecast_core::Sample) and hand it to
//! [`ClientConnection::send`](crate::connection::ClientConnection::send),
//! which never waits. Both also stop when their cancellation token fires.

pub mod broadcast;
pub mod individual;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};
use tracing::error;
use wavecast_core::{Sample, Signal};

pub use broadcast::Broadcast;
pub use individual::run_session;

fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Advance one tick and serialize the result as an outbound frame.
fn next_frame<S: Signal>(signal: &S, params: &S::Params, state: &mut S::State) -> Option<Arc<str>> {
    let value = signal.advance(params, state);
    match Sample::now(value).to_json() {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            error!(signal = signal.name(), error = %e, "failed to serialize sample");
            None
        }
    }
}
