//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`WavecastSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `WAVECAST_*` environment overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::WavecastSettings;

/// Bind address override.
pub const ENV_HOST: &str = "WAVECAST_HOST";
/// Ramp listen port override.
pub const ENV_RAMP_PORT: &str = "WAVECAST_RAMP_PORT";
/// Sine listen port override.
pub const ENV_SINE_PORT: &str = "WAVECAST_SINE_PORT";
/// Ramp tick interval override (milliseconds).
pub const ENV_RAMP_TICK_MS: &str = "WAVECAST_RAMP_TICK_MS";
/// Sine tick interval override (milliseconds).
pub const ENV_SINE_TICK_MS: &str = "WAVECAST_SINE_TICK_MS";
/// Log level override.
pub const ENV_LOG_LEVEL: &str = "WAVECAST_LOG_LEVEL";
/// Log format override (`pretty` or `json`).
pub const ENV_LOG_FORMAT: &str = "WAVECAST_LOG_FORMAT";

const MAX_TICK_MS: u64 = 60_000;

/// Resolve the path to the settings file (`~/.wavecast/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".wavecast").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<WavecastSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<WavecastSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<WavecastSettings> {
    let defaults = serde_json::to_value(WavecastSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `WAVECAST_*` environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut WavecastSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Separated from [`apply_env_overrides`] so the rules are testable without
/// touching the process environment. Empty and invalid values are ignored,
/// invalid ones with a warning.
pub fn apply_overrides_from<F>(settings: &mut WavecastSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_HOST).filter(|v| !v.is_empty()) {
        settings.server.host = v;
    }
    if let Some(v) = read_parsed(&lookup, ENV_RAMP_PORT, |s| parse_u16_range(s, 1, 65535)) {
        settings.ramp.port = v;
    }
    if let Some(v) = read_parsed(&lookup, ENV_SINE_PORT, |s| parse_u16_range(s, 1, 65535)) {
        settings.sine.port = v;
    }
    if let Some(v) = read_parsed(&lookup, ENV_RAMP_TICK_MS, |s| parse_u64_range(s, 1, MAX_TICK_MS)) {
        settings.ramp.tick_interval_ms = v;
    }
    if let Some(v) = read_parsed(&lookup, ENV_SINE_TICK_MS, |s| parse_u64_range(s, 1, MAX_TICK_MS)) {
        settings.sine.tick_interval_ms = v;
    }
    if let Some(v) = read_parsed(&lookup, ENV_LOG_LEVEL, |s| s.parse().ok()) {
        settings.logging.level = v;
    }
    if let Some(v) = read_parsed(&lookup, ENV_LOG_FORMAT, |s| s.parse().ok()) {
        settings.logging.format = v;
    }
}

fn read_parsed<F, T>(lookup: &F, name: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
{
    let val = lookup(name).filter(|v| !v.is_empty())?;
    let result = parse(&val);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid env var, ignoring");
    }
    result
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::errors::SettingsError;
    use assert_matches::assert_matches;
    use wavecast_core::logging::{LogFormat, LogLevel};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({
            "ramp": {"port": 8765, "tickIntervalMs": 3}
        });
        let source = serde_json::json!({
            "ramp": {"port": 9000}
        });
        let merged = deep_merge(target, source);
        assert_eq!(merged["ramp"]["port"], 9000);
        assert_eq!(merged["ramp"]["tickIntervalMs"], 3);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4, 5]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["items"], serde_json::json!([4, 5]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_new_keys_added() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"b": 2}));
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 42);
    }

    // ── load_file_layer / load_settings_from_path ──────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = load_file_layer(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.ramp.port, 8765);
        assert_eq!(settings.sine.port, 8766);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"ramp": {"defaultMax": 10}, "sine": {"tickIntervalMs": 20}}"#,
        )
        .unwrap();

        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings.ramp.default_max, 10);
        assert_eq!(settings.ramp.default_min, 0);
        assert_eq!(settings.sine.tick_interval_ms, 20);
        assert_eq!(settings.sine.port, 8766);
    }

    #[test]
    fn load_null_keeps_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"host": null}}"#).unwrap();

        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        assert_matches!(load_settings_from_path(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn load_wrong_type_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"ramp": {"port": "eighty"}}"#).unwrap();

        assert_matches!(load_file_layer(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn load_conflicting_ports_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"ramp": {"port": 9000}, "sine": {"port": 9000}}"#).unwrap();

        assert_matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        );
    }

    // ── apply_overrides_from ───────────────────────────────────────

    #[test]
    fn overrides_apply() {
        let mut settings = WavecastSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                (ENV_HOST, "127.0.0.1"),
                (ENV_RAMP_PORT, "9100"),
                (ENV_SINE_PORT, "9101"),
                (ENV_RAMP_TICK_MS, "10"),
                (ENV_SINE_TICK_MS, "15"),
                (ENV_LOG_LEVEL, "debug"),
                (ENV_LOG_FORMAT, "json"),
            ]),
        );
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.ramp.port, 9100);
        assert_eq!(settings.sine.port, 9101);
        assert_eq!(settings.ramp.tick_interval_ms, 10);
        assert_eq!(settings.sine.tick_interval_ms, 15);
        assert_eq!(settings.logging.level, LogLevel::Debug);
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut settings = WavecastSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                (ENV_RAMP_PORT, "0"),
                (ENV_SINE_PORT, "not_a_port"),
                (ENV_RAMP_TICK_MS, "0"),
                (ENV_LOG_LEVEL, "loud"),
                (ENV_LOG_FORMAT, "xml"),
            ]),
        );
        assert_eq!(settings.ramp.port, 8765);
        assert_eq!(settings.sine.port, 8766);
        assert_eq!(settings.ramp.tick_interval_ms, 3);
        assert_eq!(settings.logging.level, LogLevel::Info);
        assert_eq!(settings.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn empty_override_is_ignored() {
        let mut settings = WavecastSettings::default();
        apply_overrides_from(&mut settings, env(&[(ENV_HOST, "")]));
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    // ── parse_*_range ───────────────────────────────────────────────

    #[test]
    fn parse_u16_valid_and_invalid() {
        assert_eq!(parse_u16_range("9090", 1, 65535), Some(9090));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("99999", 1, 65535), None);
        assert_eq!(parse_u16_range("", 1, 65535), None);
    }

    #[test]
    fn parse_u64_bounds() {
        assert_eq!(parse_u64_range("1", 1, 60_000), Some(1));
        assert_eq!(parse_u64_range("60001", 1, 60_000), None);
        assert_eq!(parse_u64_range("abc", 1, 60_000), None);
    }
}
