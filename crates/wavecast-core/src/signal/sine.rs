//! Sine wave scaled into `[min, max]`.

use std::sync::atomic::Ordering;

use super::Signal;
use crate::atomic::AtomicF64;
use crate::errors::UpdateError;
use crate::message::ParameterUpdate;

/// Sine value at time `t`.
///
/// `amplitude * sin(frequency * t) + offset`, where amplitude and offset are
/// derived from the bounds. Halving before combining keeps both finite for
/// any finite bounds.
pub fn value(t: f64, frequency: f64, min: f64, max: f64) -> f64 {
    let amplitude = max / 2.0 - min / 2.0;
    let offset = min / 2.0 + max / 2.0;
    amplitude * (frequency * t).sin() + offset
}

/// Shared sine parameters. Each field updates independently.
#[derive(Debug)]
pub struct SineParams {
    frequency: AtomicF64,
    min: AtomicF64,
    max: AtomicF64,
}

impl SineParams {
    /// Parameter block with the given frequency and bounds.
    pub fn new(frequency: f64, min: f64, max: f64) -> Self {
        Self {
            frequency: AtomicF64::new(frequency),
            min: AtomicF64::new(min),
            max: AtomicF64::new(max),
        }
    }

    /// Current frequency.
    pub fn frequency(&self) -> f64 {
        self.frequency.load(Ordering::Acquire)
    }

    /// Current lower bound.
    pub fn min(&self) -> f64 {
        self.min.load(Ordering::Acquire)
    }

    /// Current upper bound.
    pub fn max(&self) -> f64 {
        self.max.load(Ordering::Acquire)
    }

    fn set(&self, update: &ParameterUpdate) {
        if let Some(frequency) = update.frequency {
            self.frequency.store(frequency, Ordering::Release);
        }
        if let Some(min) = update.value_min {
            self.min.store(min, Ordering::Release);
        }
        if let Some(max) = update.value_max {
            self.max.store(max, Ordering::Release);
        }
    }
}

/// Sine generator family.
#[derive(Clone, Copy, Debug)]
pub struct Sine {
    /// Amount `t` advances per tick.
    pub phase_step: f64,
    /// Frequency new parameter blocks start with.
    pub default_frequency: f64,
    /// Lower bound new parameter blocks start with.
    pub default_min: f64,
    /// Upper bound new parameter blocks start with.
    pub default_max: f64,
}

impl Default for Sine {
    fn default() -> Self {
        Self {
            phase_step: 0.01,
            default_frequency: 1.0,
            default_min: -1.0,
            default_max: 1.0,
        }
    }
}

impl Signal for Sine {
    type Params = SineParams;
    /// Running time `t`, owned by the loop.
    type State = f64;
    type Value = f64;

    fn name(&self) -> &'static str {
        "sine"
    }

    fn default_params(&self) -> SineParams {
        SineParams::new(self.default_frequency, self.default_min, self.default_max)
    }

    fn initial_state(&self) -> f64 {
        0.0
    }

    fn advance(&self, params: &SineParams, t: &mut f64) -> f64 {
        let sample = value(*t, params.frequency(), params.min(), params.max());
        *t += self.phase_step;
        sample
    }

    fn apply(&self, params: &SineParams, update: &ParameterUpdate) -> Result<(), UpdateError> {
        if update.is_empty() {
            return Err(UpdateError::NoApplicableFields {
                expected: "Frequency, Value_min, Value_max",
            });
        }
        params.set(update);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-9;

    #[test]
    fn zero_time_is_offset() {
        assert!((value(0.0, 1.0, -1.0, 1.0)).abs() < EPS);
        assert!((value(0.0, 3.0, 2.0, 6.0) - 4.0).abs() < EPS);
    }

    #[test]
    fn quarter_period_is_max() {
        assert!((value(PI / 2.0, 1.0, -2.0, 2.0) - 2.0).abs() < EPS);
    }

    #[test]
    fn first_sample_is_emitted_before_time_advances() {
        let sine = Sine::default();
        let params = sine.default_params();
        let mut t = sine.initial_state();
        let first = sine.advance(&params, &mut t);
        assert!(first.abs() < EPS);
        assert!((t - 0.01).abs() < EPS);
        let second = sine.advance(&params, &mut t);
        assert!((second - 0.01_f64.sin()).abs() < EPS);
    }

    #[test]
    fn partial_update_changes_only_given_fields() {
        let sine = Sine::default();
        let params = sine.default_params();
        let update = ParameterUpdate {
            frequency: Some(2.0),
            ..ParameterUpdate::default()
        };
        sine.apply(&params, &update).unwrap();
        assert!((params.frequency() - 2.0).abs() < EPS);
        assert!((params.min() + 1.0).abs() < EPS);
        assert!((params.max() - 1.0).abs() < EPS);
    }

    #[test]
    fn full_update_applies_all_fields() {
        let sine = Sine::default();
        let params = sine.default_params();
        let update = ParameterUpdate {
            frequency: Some(2.0),
            value_min: Some(-2.0),
            value_max: Some(2.0),
        };
        sine.apply(&params, &update).unwrap();
        let mut t = PI / 4.0;
        let sample = sine.advance(&params, &mut t);
        assert!((sample - 2.0).abs() < EPS);
    }

    #[test]
    fn empty_update_is_not_applicable() {
        let sine = Sine::default();
        let params = sine.default_params();
        assert_matches!(
            sine.apply(&params, &ParameterUpdate::default()),
            Err(UpdateError::NoApplicableFields { .. })
        );
    }

    #[test]
    fn extreme_finite_bounds_stay_finite() {
        assert!(value(0.0, 1.0, -1e308, 1e308).abs() < EPS);
        assert!((value(0.0, 1.0, f64::MAX, f64::MAX) - f64::MAX).abs() <= f64::EPSILON * f64::MAX);
        for i in 0..100 {
            let t = f64::from(i) * 0.1;
            let v = value(t, 3.0, -f64::MAX, f64::MAX);
            assert!(v.is_finite(), "t={t} gave {v}");
        }
    }

    #[test]
    fn extreme_update_serializes_as_number() {
        let sine = Sine::default();
        let params = sine.default_params();
        let update = ParameterUpdate::parse(r#"{"Value_min":-1e308,"Value_max":1e308}"#).unwrap();
        sine.apply(&params, &update).unwrap();

        let mut t = sine.initial_state();
        let sample = sine.advance(&params, &mut t);
        assert!(sample.is_finite());
        let json = crate::message::Sample::now(sample).to_json().unwrap();
        let decoded: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(decoded["value"].is_number(), "got {json}");
    }

    #[test]
    fn separate_parameter_blocks_are_independent() {
        let sine = Sine::default();
        let a = sine.default_params();
        let b = sine.default_params();
        let update = ParameterUpdate {
            value_min: Some(10.0),
            value_max: Some(20.0),
            ..ParameterUpdate::default()
        };
        sine.apply(&a, &update).unwrap();
        assert!((a.min() - 10.0).abs() < EPS);
        assert!((b.min() + 1.0).abs() < EPS);
        assert!((b.max() - 1.0).abs() < EPS);
    }

    proptest! {
        #[test]
        fn stays_within_bounds(
            t in 0.0_f64..1000.0,
            frequency in 0.01_f64..50.0,
            min in -100.0_f64..100.0,
            span in 0.0_f64..100.0,
        ) {
            let max = min + span;
            let v = value(t, frequency, min, max);
            prop_assert!(v >= min - 1e-6 && v <= max + 1e-6);
        }

        #[test]
        fn periodic_in_two_pi_over_frequency(
            t in 0.0_f64..100.0,
            frequency in 0.1_f64..10.0,
        ) {
            let period = 2.0 * PI / frequency;
            let a = value(t, frequency, -1.0, 1.0);
            let b = value(t + period, frequency, -1.0, 1.0);
            prop_assert!((a - b).abs() < 1e-6);
        }
    }
}
