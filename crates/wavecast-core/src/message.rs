//! Wire messages: inbound parameter updates and outbound samples.
//!
//! Inbound text is a flat JSON object. Only three keys are recognised:
//!
//! | Key | Meaning |
//! |---|---|
//! | `Value_min` | lower bound |
//! | `Value_max` | upper bound |
//! | `Frequency` | angular frequency multiplier (sine only) |
//!
//! Outbound text is `{"timestamp": "...", "value": <number>}` with a local,
//! millisecond-precision timestamp and no UTC offset.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::UpdateError;

/// Inbound key for the lower bound.
pub const KEY_VALUE_MIN: &str = "Value_min";
/// Inbound key for the upper bound.
pub const KEY_VALUE_MAX: &str = "Value_max";
/// Inbound key for the sine frequency.
pub const KEY_FREQUENCY: &str = "Frequency";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// A partial parameter update decoded from one inbound message.
///
/// Absent keys, and recognised keys carrying a non-numeric value, are `None`
/// and leave the corresponding parameter untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ParameterUpdate {
    /// New lower bound.
    pub value_min: Option<f64>,
    /// New upper bound.
    pub value_max: Option<f64>,
    /// New frequency.
    pub frequency: Option<f64>,
}

impl ParameterUpdate {
    /// Decode an inbound text frame.
    ///
    /// Fails only when the text is not JSON or not a JSON object. An object
    /// without any recognised key decodes to an empty update; whether that is
    /// an error depends on the signal family applying it.
    pub fn parse(text: &str) -> Result<Self, UpdateError> {
        let Value::Object(fields) = serde_json::from_str::<Value>(text)? else {
            return Err(UpdateError::NotAnObject);
        };
        Ok(Self {
            value_min: numeric_field(&fields, KEY_VALUE_MIN),
            value_max: numeric_field(&fields, KEY_VALUE_MAX),
            frequency: numeric_field(&fields, KEY_FREQUENCY),
        })
    }

    /// Whether either bound is present.
    pub fn has_bounds(&self) -> bool {
        self.value_min.is_some() || self.value_max.is_some()
    }

    /// Whether no recognised field is present.
    pub fn is_empty(&self) -> bool {
        !self.has_bounds() && self.frequency.is_none()
    }
}

fn numeric_field(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = fields.get(key)?;
    let number = value.as_f64();
    if number.is_none() {
        warn!(key, value = %value, "ignoring non-numeric parameter");
    }
    number
}

/// One generated sample, as sent to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample<V> {
    /// Local wall-clock time the sample was produced.
    pub timestamp: String,
    /// The generated value.
    pub value: V,
}

impl<V: Serialize> Sample<V> {
    /// Stamp `value` with the current local time.
    pub fn now(value: V) -> Self {
        Self {
            timestamp: format_timestamp(&Local::now()),
            value,
        }
    }

    /// Serialize to the outbound JSON text.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Format a timestamp as `YYYY-MM-DDTHH:MM:SS.mmm`.
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    #[test]
    fn parse_full_update() {
        let update =
            ParameterUpdate::parse(r#"{"Frequency":2.0,"Value_min":-2,"Value_max":2}"#).unwrap();
        assert_eq!(update.frequency, Some(2.0));
        assert_eq!(update.value_min, Some(-2.0));
        assert_eq!(update.value_max, Some(2.0));
        assert!(update.has_bounds());
    }

    #[test]
    fn parse_partial_update() {
        let update = ParameterUpdate::parse(r#"{"Value_max":10}"#).unwrap();
        assert_eq!(update.value_min, None);
        assert_eq!(update.value_max, Some(10.0));
        assert_eq!(update.frequency, None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let update = ParameterUpdate::parse(r#"{"Amplitude":3,"Value_min":1}"#).unwrap();
        assert_eq!(update.value_min, Some(1.0));
        assert!(!update.is_empty());
    }

    #[test]
    fn object_without_recognised_keys_is_empty() {
        let update = ParameterUpdate::parse(r#"{"hello":"world"}"#).unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn non_numeric_value_skips_only_that_field() {
        let update = ParameterUpdate::parse(r#"{"Value_min":"low","Value_max":4}"#).unwrap();
        assert_eq!(update.value_min, None);
        assert_eq!(update.value_max, Some(4.0));
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert_matches!(
            ParameterUpdate::parse("not json"),
            Err(UpdateError::Malformed(_))
        );
        assert_matches!(ParameterUpdate::parse(""), Err(UpdateError::Malformed(_)));
    }

    #[test]
    fn non_object_is_rejected() {
        assert_matches!(
            ParameterUpdate::parse("[1,2,3]"),
            Err(UpdateError::NotAnObject)
        );
        assert_matches!(ParameterUpdate::parse("42"), Err(UpdateError::NotAnObject));
    }

    #[test]
    fn timestamp_has_millisecond_precision() {
        let at = Local
            .with_ymd_and_hms(2024, 3, 5, 7, 8, 9)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(42))
            .unwrap();
        assert_eq!(format_timestamp(&at), "2024-03-05T07:08:09.042");
    }

    #[test]
    fn integer_sample_serializes_as_integer() {
        let sample = Sample {
            timestamp: "2024-01-01T00:00:00.000".into(),
            value: 3_i64,
        };
        assert_eq!(
            sample.to_json().unwrap(),
            r#"{"timestamp":"2024-01-01T00:00:00.000","value":3}"#
        );
    }

    #[test]
    fn float_sample_serializes_as_float() {
        let sample = Sample {
            timestamp: "2024-01-01T00:00:00.000".into(),
            value: 0.5_f64,
        };
        let json: Value = serde_json::from_str(&sample.to_json().unwrap()).unwrap();
        assert_eq!(json["value"], 0.5);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn sample_now_is_parseable_by_chrono() {
        let sample = Sample::now(1_i64);
        assert!(
            chrono::NaiveDateTime::parse_from_str(&sample.timestamp, TIMESTAMP_FORMAT).is_ok(),
            "got: {}",
            sample.timestamp
        );
    }
}
