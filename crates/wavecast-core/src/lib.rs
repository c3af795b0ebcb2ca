//! # wavecast-core
//!
//! Foundation types for the wavecast value-streaming server.
//!
//! - **Signals**: the [`Signal`] trait plus the [`Ramp`] and [`Sine`] generator families
//! - **Parameter blocks**: lock-free atomic fields shared between a generation loop
//!   and the message handlers that update it
//! - **Wire messages**: [`ParameterUpdate`] (inbound) and [`Sample`] (outbound)
//! - **Branded IDs**: [`ConnectionId`]
//! - **Errors**: [`UpdateError`] and [`SendError`] via `thiserror`
//! - **Logging**: `tracing` subscriber setup and in-memory capture for tests

#![deny(unsafe_code)]

pub mod atomic;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod message;
pub mod signal;

pub use errors::{SendError, UpdateError};
pub use ids::ConnectionId;
pub use message::{ParameterUpdate, Sample};
pub use signal::ramp::{Ramp, RampParams};
pub use signal::sine::{Sine, SineParams};
pub use signal::Signal;
