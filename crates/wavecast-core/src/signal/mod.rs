//! Signal generator families.
//!
//! A [`Signal`] describes one family of generator: the shape of its shared
//! parameter block, the state its generation loop owns privately, and the
//! pure step function tying them together. The same implementation serves
//! both delivery modes; only who shares the parameter block differs.

pub mod ramp;
pub mod sine;

use std::fmt;

use serde::Serialize;

use crate::errors::UpdateError;
use crate::message::ParameterUpdate;

/// A generator family.
///
/// `Params` is written by message handlers and read by exactly one loop, so
/// it must be safe to share without a lock. `State` belongs to the loop alone
/// and is never visible to handlers.
pub trait Signal: Send + Sync + 'static {
    /// Shared, concurrently-updatable parameter block.
    type Params: Send + Sync + fmt::Debug + 'static;
    /// Loop-private running state (phase, tick counter).
    type State: Send + 'static;
    /// Type of each emitted value.
    type Value: Serialize + Copy + Send + fmt::Debug + 'static;

    /// Short name used in logs, metrics and health output.
    fn name(&self) -> &'static str;

    /// Parameter block a new session (or endpoint) starts from.
    fn default_params(&self) -> Self::Params;

    /// Fresh loop-private state.
    fn initial_state(&self) -> Self::State;

    /// Advance one tick using the parameters as they are right now.
    fn advance(&self, params: &Self::Params, state: &mut Self::State) -> Self::Value;

    /// Apply a decoded update in place.
    ///
    /// Returns [`UpdateError::NoApplicableFields`] when nothing in `update`
    /// concerns this family; the parameter block is then left untouched.
    fn apply(&self, params: &Self::Params, update: &ParameterUpdate) -> Result<(), UpdateError>;
}
