/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use ilp_scheduler::command;
use ilp_scheduler::config::{IlpConfig, SinkKind};
use ilp_scheduler::driver::RealtimeDriver;
use ilp_scheduler::item::{Color, Intensity};
use ilp_scheduler::sink::{HardwareSink, LogSink, PiBlasterSink};
use ilp_scheduler::ScheduleEngine;

// ── CLI argument definition ───────────────────────────────────────────────────

/// ILP scheduler: executes timed LED instructions on the lamp post.
///
/// Commands are read from stdin, one JSON object per line.
///
/// Example:
///   ilp-scheduler --config ilp.yaml --default-intensity 128
#[derive(Debug, Parser)]
#[command(
    name = "ilp-scheduler",
    about = "Intelligent lamp post LED schedule executor",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML scheduler configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Color for items that leave it unset (decimal, `0x` or `#` hex).
    #[arg(long = "default-color", value_parser = parse_color)]
    default_color: Option<Color>,

    /// Intensity for items that leave it unset (0-255).
    #[arg(long = "default-intensity")]
    default_intensity: Option<u8>,

    /// Tick period in milliseconds.
    #[arg(long = "tick-period-ms", value_parser = clap::value_parser!(u64).range(1..))]
    tick_period_ms: Option<u64>,

    /// pi-blaster device file.
    #[arg(long = "device")]
    device: Option<PathBuf>,

    /// Log pin writes instead of touching hardware.
    #[arg(long = "dry-run", default_value_t = false)]
    dry_run: bool,
}

fn parse_color(s: &str) -> Result<Color, String> {
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix('#'));
    let value = match hex {
        Some(digits) => u32::from_str_radix(digits, 16),
        None => s.parse::<u32>(),
    }
    .map_err(|e| format!("invalid color {s:?}: {e}"))?;
    Color::new(value).ok_or_else(|| format!("color {s} is above 0xFFFFFF"))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("ILP scheduler starting up...");

    let cli = Cli::parse();

    // Exit explicitly: the stdin reader may still be parked in a blocking read.
    match run(cli).await {
        Ok(()) => process::exit(0),
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // ── Load configuration ────────────────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => IlpConfig::load_from_file(path)?,
        None => {
            warn!("No configuration file provided, using default settings");
            IlpConfig::default()
        }
    };

    if let Some(color) = cli.default_color {
        config.defaults.color = color;
    }
    if let Some(intensity) = cli.default_intensity {
        config.defaults.intensity = Intensity::new(intensity);
    }
    if let Some(ms) = cli.tick_period_ms {
        config.driver.period = std::time::Duration::from_millis(ms);
    }
    if let Some(device) = cli.device {
        config.sink.device = device;
    }
    if cli.dry_run {
        config.sink.kind = SinkKind::Log;
    }

    info!(
        default_color     = %config.defaults.color,
        default_intensity = config.defaults.intensity.value(),
        tick_period_ms    = config.driver.period.as_millis() as u64,
        sink              = ?config.sink.kind,
        device            = %config.sink.device.display(),
        "Configuration"
    );

    // ── Engine + driver ───────────────────────────────────────────────────────
    let engine = Arc::new(ScheduleEngine::new(config.defaults));

    let sink: Box<dyn HardwareSink + Send> = match config.sink.kind {
        SinkKind::PiBlaster => Box::new(PiBlasterSink::new(config.sink.device, config.sink.pins)),
        SinkKind::Log => Box::new(LogSink::new(config.sink.device, config.sink.pins)),
    };

    let driver = RealtimeDriver::new(Arc::clone(&engine), sink, config.driver)
        .spawn()
        .context("Failed to start driver thread")?;

    // ── Inbound commands ──────────────────────────────────────────────────────
    let served = serve_stdin(&engine).await;

    let report = driver
        .stop_and_join()
        .map_err(|_| anyhow!("driver thread panicked"))?;
    info!(
        ticks = report.ticks,
        writes = report.writes,
        sink_failures = report.sink_failures,
        "ILP scheduler shut down"
    );

    served
}

/// Read commands until `stop`, EOF or Ctrl-C.
async fn serve_stdin(engine: &ScheduleEngine) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        if handle_line(engine, &line).is_break() {
                            return Ok(());
                        }
                    }
                    None => {
                        info!("stdin closed");
                        return Ok(());
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received");
                return Ok(());
            }
        }
    }
}

fn handle_line(engine: &ScheduleEngine, line: &str) -> ControlFlow<()> {
    let line = line.trim();
    if line.is_empty() {
        return ControlFlow::Continue(());
    }
    match command::parse_line(line) {
        Ok(cmd) => engine.dispatch(cmd),
        Err(e) => {
            warn!(error = %e, %line, "dropping inbound line");
            ControlFlow::Continue(())
        }
    }
}
