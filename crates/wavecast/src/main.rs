//! # wavecast
//!
//! Server binary: loads settings, starts the ramp and sine listeners and
//! waits for ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use wavecast_core::logging::{self, LogFormat, LogLevel};
use wavecast_core::{Ramp, Sine};
use wavecast_server::{ServerConfig, WavecastServer, metrics};
use wavecast_settings::WavecastSettings;

/// Real-time value streaming over `WebSocket`.
#[derive(Parser, Debug)]
#[command(name = "wavecast", about = "Ramp and sine value streams over WebSocket")]
struct Cli {
    /// Settings file (defaults to `~/.wavecast/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Ramp listener port (0 for auto-assign).
    #[arg(long)]
    ramp_port: Option<u16>,

    /// Sine listener port (0 for auto-assign).
    #[arg(long)]
    sine_port: Option<u16>,

    /// Log level: trace, debug, info, warn or error.
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Command-line flags win over the file and environment layers.
    fn apply(&self, settings: &mut WavecastSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.ramp_port {
            settings.ramp.port = port;
        }
        if let Some(port) = self.sine_port {
            settings.sine.port = port;
        }
        if let Some(level) = self.log_level {
            settings.logging.level = level;
        }
        if self.json_logs {
            settings.logging.format = LogFormat::Json;
        }
    }
}

fn load(cli: &Cli) -> Result<WavecastSettings> {
    let path = cli
        .settings
        .clone()
        .unwrap_or_else(wavecast_settings::settings_path);
    let mut settings = wavecast_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

fn ramp_from(settings: &WavecastSettings) -> Ramp {
    Ramp {
        default_min: settings.ramp.default_min,
        default_max: settings.ramp.default_max,
    }
}

fn sine_from(settings: &WavecastSettings) -> Sine {
    Sine {
        phase_step: settings.sine.phase_step,
        default_frequency: settings.sine.default_frequency,
        default_min: settings.sine.default_min,
        default_max: settings.sine.default_max,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load(&cli)?;

    logging::init_subscriber(settings.logging.level, settings.logging.format);

    let metrics = match metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder unavailable, /metrics disabled");
            None
        }
    };

    let server = WavecastServer::new(
        ServerConfig::from_settings(&settings),
        ramp_from(&settings),
        sine_from(&settings),
        metrics,
    );
    let addrs = server.listen().await.context("Failed to bind listeners")?;

    tracing::info!(
        "wavecast listening: ramp on ws://{} (/ws, /wsi), sine on ws://{} (/ws, /wsi)",
        addrs.ramp,
        addrs.sine
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    if !server.shutdown().await {
        tracing::warn!("shutdown timed out, remaining tasks aborted");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
