//! # wavecast-settings
//!
//! Configuration for the wavecast server, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`WavecastSettings::default()`]
//! 2. **Settings file**: `~/.wavecast/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `WAVECAST_*` overrides (highest priority)
//!
//! Command-line flags, applied by the binary, sit above all three.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_settings,
    load_settings_from_path, settings_path,
};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
