//! Bounded integer ramp: counts up from `min` to `max`, then wraps to `min`.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use super::Signal;
use crate::errors::UpdateError;
use crate::message::ParameterUpdate;

/// One ramp step.
///
/// `current >= max` wraps to `min`; otherwise the value increments. Ranges
/// with `min > max` are not rejected: the ramp then jumps to `min` and stays
/// there, since every value is already at or above `max`.
pub fn next(current: i64, min: i64, max: i64) -> i64 {
    if current >= max { min } else { current + 1 }
}

/// Shared ramp parameters.
///
/// `current` lives here rather than in loop state because a bounds update
/// resets it to the new minimum. Handlers never write `current` directly:
/// they raise `reset`, and the owning loop applies it on its next step, so
/// `current` has a single writer.
#[derive(Debug)]
pub struct RampParams {
    min: AtomicI64,
    max: AtomicI64,
    current: AtomicI64,
    reset: AtomicBool,
}

impl RampParams {
    /// Parameters spanning `[min, max]`, starting at `min`.
    pub fn new(min: i64, max: i64) -> Self {
        Self {
            min: AtomicI64::new(min),
            max: AtomicI64::new(max),
            current: AtomicI64::new(min),
            reset: AtomicBool::new(false),
        }
    }

    /// Current lower bound.
    pub fn min(&self) -> i64 {
        self.min.load(Ordering::Acquire)
    }

    /// Current upper bound.
    pub fn max(&self) -> i64 {
        self.max.load(Ordering::Acquire)
    }

    /// Value the next step advances from: the minimum while a reset is
    /// pending, otherwise the most recently emitted value.
    pub fn current(&self) -> i64 {
        if self.reset.load(Ordering::Acquire) {
            self.min()
        } else {
            self.current.load(Ordering::Acquire)
        }
    }

    /// Replace either bound and request a reset of `current` to the
    /// resulting minimum.
    ///
    /// The reset flag is raised after both bounds are stored, so the step
    /// that consumes it also sees the new bounds.
    pub fn set_bounds(&self, min: Option<i64>, max: Option<i64>) {
        if let Some(min) = min {
            self.min.store(min, Ordering::Release);
        }
        if let Some(max) = max {
            self.max.store(max, Ordering::Release);
        }
        self.reset.store(true, Ordering::Release);
    }

    /// Advance `current` by one step and return the new value.
    ///
    /// Only the loop that owns this block may call it. A bounds update takes
    /// full effect on the first step that starts after
    /// [`set_bounds`](Self::set_bounds) returns. A step already in flight
    /// may emit one value computed from the bounds it read, but it can never
    /// undo the reset.
    pub fn step(&self) -> i64 {
        let current = if self.reset.swap(false, Ordering::AcqRel) {
            self.min()
        } else {
            self.current.load(Ordering::Acquire)
        };
        let stepped = next(current, self.min(), self.max());
        self.current.store(stepped, Ordering::Release);
        stepped
    }
}

/// Ramp generator family.
#[derive(Clone, Copy, Debug)]
pub struct Ramp {
    /// Lower bound new parameter blocks start with.
    pub default_min: i64,
    /// Upper bound new parameter blocks start with.
    pub default_max: i64,
}

impl Default for Ramp {
    fn default() -> Self {
        Self {
            default_min: 0,
            default_max: 3,
        }
    }
}

/// Truncate toward zero; out-of-range values saturate and NaN maps to 0.
#[allow(clippy::cast_possible_truncation)]
fn to_bound(value: f64) -> i64 {
    value.trunc() as i64
}

impl Signal for Ramp {
    type Params = RampParams;
    type State = ();
    type Value = i64;

    fn name(&self) -> &'static str {
        "ramp"
    }

    fn default_params(&self) -> RampParams {
        RampParams::new(self.default_min, self.default_max)
    }

    fn initial_state(&self) {}

    fn advance(&self, params: &RampParams, _: &mut ()) -> i64 {
        params.step()
    }

    fn apply(&self, params: &RampParams, update: &ParameterUpdate) -> Result<(), UpdateError> {
        if !update.has_bounds() {
            return Err(UpdateError::NoApplicableFields {
                expected: "Value_min, Value_max",
            });
        }
        params.set_bounds(update.value_min.map(to_bound), update.value_max.map(to_bound));
        Ok(())
    }
}
