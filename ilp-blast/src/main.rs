/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info, warn};

use ilp_scheduler::sink::{format_set_pin, PiBlasterSink, PinMap, DEFAULT_DEVICE};

/// Sweep one PWM pin through a sine wave to check the pi-blaster wiring.
#[derive(Debug, Parser)]
#[command(name = "ilp-blast", about = "pi-blaster pin sweep diagnostic", long_about = None)]
struct Cli {
    /// GPIO pin to drive.
    #[arg(short = 'p', long = "pin", default_value_t = 23)]
    pin: u8,

    /// Number of steps; 0 runs until interrupted.
    #[arg(short = 'n', long = "steps", default_value_t = 0)]
    steps: u64,

    /// pi-blaster device file.
    #[arg(long = "device", default_value = DEFAULT_DEVICE)]
    device: PathBuf,

    /// Log writes instead of touching hardware.
    #[arg(long = "dry-run", default_value_t = false)]
    dry_run: bool,
}

const STEP_INTERVAL: Duration = Duration::from_millis(100);

/// Duty cycles `0, (50·sin(0.1) + 50)%, (50·sin(0.2) + 50)%, ...`
#[derive(Debug, Clone, Default)]
struct Sweep {
    phase: f64,
    percent: f64,
}

impl Iterator for Sweep {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let duty = self.percent / 100.0;
        self.phase += 0.1;
        self.percent = 50.0 * self.phase.sin() + 50.0;
        Some(duty)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!(pin = cli.pin, steps = cli.steps, device = %cli.device.display(), dry_run = cli.dry_run, "ilp-blast starting");

    let sink = PiBlasterSink::new(&cli.device, PinMap::default());
    let sweep = Sweep::default();
    let steps: Box<dyn Iterator<Item = f64>> = match cli.steps {
        0 => Box::new(sweep),
        n => Box::new(sweep.take(usize::try_from(n)?)),
    };

    for duty in steps {
        if cli.dry_run {
            info!("{}", format_set_pin(cli.pin, duty, sink.device()));
        } else if let Err(e) = sink.set_pin(cli.pin, duty) {
            warn!(error = %e, "pin write failed");
        } else {
            debug!(pin = cli.pin, duty, "pin written");
        }
        thread::sleep(STEP_INTERVAL);
    }

    info!("sweep finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_starts_dark_then_follows_sine() {
        let duties: Vec<f64> = Sweep::default().take(3).collect();
        assert_eq!(duties[0], 0.0);
        assert!((duties[1] - (0.5 * 0.1f64.sin() + 0.5)).abs() < 1e-12);
        assert!((duties[2] - (0.5 * 0.2f64.sin() + 0.5)).abs() < 1e-12);
    }

    #[test]
    fn sweep_stays_within_unit_interval() {
        assert!(Sweep::default()
            .take(1_000)
            .all(|d| (0.0..=1.0).contains(&d)));
    }
}
