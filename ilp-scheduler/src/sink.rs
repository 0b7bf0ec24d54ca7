/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Hardware sinks: where resolved settings leave the process.
//!
//! The production sink talks to the `pi-blaster` daemon, which exposes PWM
//! pins through a device file accepting lines of the form `<pin>=<duty>`.
//! One tick's writes are joined with `&&` into a single shell invocation, so
//! a failing write aborts the rest of that batch.
//!
//! pi-blaster drives one PWM channel per array, so only intensity reaches
//! the hardware; color is carried through for sinks that can use it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

use crate::item::{LedArray, Settings};

/// Default pi-blaster device file.
pub const DEFAULT_DEVICE: &str = "/dev/pi-blaster";

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SinkError {
    /// The shell could not be started at all.
    #[error("failed to spawn shell: {0}")]
    Spawn(#[source] std::io::Error),

    /// The shell ran but a write in the batch failed.
    #[error("pin write failed (exit code {code:?}): {script}")]
    CommandFailed { code: Option<i32>, script: String },
}

// ── Trait ─────────────────────────────────────────────────────────────────────

/// Abstract hardware sink.
///
/// Implement this trait to support different output hardware.  The driver is
/// generic over it and calls [`apply`](HardwareSink::apply) once per tick
/// with a non-empty batch.
pub trait HardwareSink {
    /// Apply every entry of `settings`; stop at the first failure.
    fn apply(&mut self, settings: &Settings) -> Result<(), SinkError>;
}

impl<S: HardwareSink + ?Sized> HardwareSink for Box<S> {
    fn apply(&mut self, settings: &Settings) -> Result<(), SinkError> {
        (**self).apply(settings)
    }
}

// ── Pin mapping ───────────────────────────────────────────────────────────────

/// LED array → GPIO pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinMap(BTreeMap<LedArray, u8>);

impl PinMap {
    pub fn new(pins: BTreeMap<LedArray, u8>) -> Self {
        Self(pins)
    }

    pub fn pin(&self, array: LedArray) -> Option<u8> {
        self.0.get(&array).copied()
    }

    /// `(pin, duty)` pairs for every mapped array in `settings`.
    pub fn duty_cycles(&self, settings: &Settings) -> Vec<(u8, f64)> {
        settings
            .iter()
            .filter_map(|(array, setting)| match self.pin(*array) {
                Some(pin) => Some((pin, setting.intensity.duty_cycle())),
                None => {
                    debug!(%array, "no pin mapped, skipping");
                    None
                }
            })
            .collect()
    }
}

impl Default for PinMap {
    /// Array 0 on GPIO 23, array 1 on GPIO 24.
    fn default() -> Self {
        let mut pins = BTreeMap::new();
        for (array, pin) in LedArray::all().zip([23u8, 24]) {
            pins.insert(array, pin);
        }
        Self(pins)
    }
}

/// Shell command writing one duty cycle, clamped to `[0, 1]`.
pub fn format_set_pin(pin: u8, duty_cycle: f64, device: &Path) -> String {
    let duty = duty_cycle.clamp(0.0, 1.0);
    format!("echo \"{pin}={duty}\" > {}", device.display())
}

// ── PiBlasterSink ─────────────────────────────────────────────────────────────

/// Writes duty cycles to the pi-blaster device through `sh`.
#[derive(Debug, Clone)]
pub struct PiBlasterSink {
    device: PathBuf,
    pins: PinMap,
}

impl PiBlasterSink {
    pub fn new(device: impl Into<PathBuf>, pins: PinMap) -> Self {
        Self {
            device: device.into(),
            pins,
        }
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    /// The `&&`-joined script for one batch, or `None` if nothing is mapped.
    pub fn script(&self, settings: &Settings) -> Option<String> {
        let cmds: Vec<String> = self
            .pins
            .duty_cycles(settings)
            .into_iter()
            .map(|(pin, duty)| format_set_pin(pin, duty, &self.device))
            .collect();
        (!cmds.is_empty()).then(|| cmds.join(" && "))
    }

    /// Write a single pin outside of any schedule.
    pub fn set_pin(&self, pin: u8, duty_cycle: f64) -> Result<(), SinkError> {
        run_shell(&format_set_pin(pin, duty_cycle, &self.device))
    }
}

impl HardwareSink for PiBlasterSink {
    fn apply(&mut self, settings: &Settings) -> Result<(), SinkError> {
        let Some(script) = self.script(settings) else {
            return Ok(());
        };
        debug!(%script, "writing pins");
        run_shell(&script)
    }
}

fn run_shell(script: &str) -> Result<(), SinkError> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(script)
        .status()
        .map_err(SinkError::Spawn)?;
    if status.success() {
        Ok(())
    } else {
        Err(SinkError::CommandFailed {
            code: status.code(),
            script: script.to_string(),
        })
    }
}

// ── LogSink ───────────────────────────────────────────────────────────────────

/// Dry-run sink: logs the commands pi-blaster would receive.
#[derive(Debug, Clone)]
pub struct LogSink {
    inner: PiBlasterSink,
}

impl LogSink {
    pub fn new(device: impl Into<PathBuf>, pins: PinMap) -> Self {
        Self {
            inner: PiBlasterSink::new(device, pins),
        }
    }
}

impl HardwareSink for LogSink {
    fn apply(&mut self, settings: &Settings) -> Result<(), SinkError> {
        for (array, setting) in settings {
            info!(
                %array,
                color = %setting.color,
                intensity = setting.intensity.value(),
                "LED change"
            );
        }
        if let Some(script) = self.inner.script(settings) {
            info!(%script, "dry run");
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Color, Intensity, LedSetting};

    fn settings(entries: &[(u8, u8)]) -> Settings {
        entries
            .iter()
            .map(|(id, intensity)| {
                (
                    LedArray::new(*id).unwrap(),
                    LedSetting {
                        color: Color::WHITE,
                        intensity: Intensity::new(*intensity),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn format_set_pin_clamps_duty_cycle() {
        let dev = Path::new(DEFAULT_DEVICE);
        assert_eq!(format_set_pin(23, 0.5, dev), "echo \"23=0.5\" > /dev/pi-blaster");
        assert_eq!(format_set_pin(23, -0.3, dev), "echo \"23=0\" > /dev/pi-blaster");
        assert_eq!(format_set_pin(24, 7.0, dev), "echo \"24=1\" > /dev/pi-blaster");
    }

    #[test]
    fn default_pin_map_matches_lamp_post_wiring() {
        let pins = PinMap::default();
        assert_eq!(pins.pin(LedArray::new(0).unwrap()), Some(23));
        assert_eq!(pins.pin(LedArray::new(1).unwrap()), Some(24));
    }

    #[test]
    fn script_joins_writes_in_array_order() {
        let sink = PiBlasterSink::new(DEFAULT_DEVICE, PinMap::default());
        let script = sink.script(&settings(&[(1, 255), (0, 0)])).unwrap();
        assert_eq!(
            script,
            "echo \"23=0\" > /dev/pi-blaster && echo \"24=1\" > /dev/pi-blaster"
        );
    }

    #[test]
    fn unmapped_arrays_are_skipped() {
        let mut only_first = BTreeMap::new();
        only_first.insert(LedArray::new(0).unwrap(), 17);
        let sink = PiBlasterSink::new(DEFAULT_DEVICE, PinMap::new(only_first));

        assert!(sink.script(&settings(&[(1, 10)])).is_none());
        let script = sink.script(&settings(&[(0, 255), (1, 10)])).unwrap();
        assert_eq!(script, "echo \"17=1\" > /dev/pi-blaster");
    }

    #[test]
    fn apply_writes_to_device_file() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("pi-blaster");
        let mut sink = PiBlasterSink::new(&device, PinMap::default());

        sink.apply(&settings(&[(0, 0), (1, 255)])).unwrap();

        // Each echo truncates the file; the last write of the batch remains.
        let written = std::fs::read_to_string(&device).unwrap();
        assert_eq!(written, "24=1\n");
    }

    #[test]
    fn failing_write_reports_command_failed() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("missing-dir").join("pi-blaster");
        let mut sink = PiBlasterSink::new(&device, PinMap::default());

        let err = sink.apply(&settings(&[(0, 10), (1, 20)])).unwrap_err();
        assert!(matches!(err, SinkError::CommandFailed { .. }), "{err}");
    }

    #[test]
    fn set_pin_writes_single_line() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("pi-blaster");
        let sink = PiBlasterSink::new(&device, PinMap::default());

        sink.set_pin(23, 0.25).unwrap();
        assert_eq!(std::fs::read_to_string(&device).unwrap(), "23=0.25\n");
    }

    #[test]
    fn log_sink_never_fails() {
        let mut sink = LogSink::new(DEFAULT_DEVICE, PinMap::default());
        assert!(sink.apply(&settings(&[(0, 1), (1, 2)])).is_ok());
        assert!(sink.apply(&Settings::new()).is_ok());
    }
}
