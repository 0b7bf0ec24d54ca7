/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduler configuration loading.
//!
//! Every field is optional; missing values fall back to the compiled-in
//! defaults.  The expected YAML structure is:
//! ```yaml
//! scheduler:
//!   default_color: 16777215   # 0xFFFFFF
//!   default_intensity: 192
//!   tick_period_ms: 20
//!   seed_delay_ms: 500
//! sink:
//!   kind: pi_blaster          # or "log"
//!   device: /dev/pi-blaster
//!   pins:
//!     0: 23
//!     1: 24
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::driver::{DriverConfig, DEFAULT_PERIOD, DEFAULT_SEED_DELAY};
use crate::engine::{Defaults, DEFAULT_COLOR, DEFAULT_INTENSITY};
use crate::item::{Color, Intensity, LedArray};
use crate::sink::{PinMap, DEFAULT_DEVICE};

/// Longest accepted start-up seed delay (one day).
const MAX_SEED_DELAY_MS: u64 = 24 * 60 * 60 * 1000;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
///
/// Kept private; callers work with [`IlpConfig`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IlpConfigFile {
    scheduler: SchedulerSection,
    sink: SinkSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SchedulerSection {
    /// Raw so that range errors carry the offending value.
    default_color: i64,
    default_intensity: i64,
    tick_period_ms: u64,
    seed_delay_ms: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            default_color: i64::from(DEFAULT_COLOR.value()),
            default_intensity: i64::from(DEFAULT_INTENSITY.value()),
            tick_period_ms: DEFAULT_PERIOD.as_millis() as u64,
            seed_delay_ms: DEFAULT_SEED_DELAY.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SinkSection {
    kind: SinkKind,
    device: PathBuf,
    /// Array id → GPIO pin.
    pins: BTreeMap<u8, u8>,
}

impl Default for SinkSection {
    fn default() -> Self {
        Self {
            kind: SinkKind::PiBlaster,
            device: PathBuf::from(DEFAULT_DEVICE),
            pins: [(0, 23), (1, 24)].into_iter().collect(),
        }
    }
}

// ── Public data structures ────────────────────────────────────────────────────

/// Which hardware sink the binary builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    #[default]
    PiBlaster,
    /// Log writes instead of touching hardware.
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub kind: SinkKind,
    pub device: PathBuf,
    pub pins: PinMap,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::PiBlaster,
            device: PathBuf::from(DEFAULT_DEVICE),
            pins: PinMap::default(),
        }
    }
}

/// Validated configuration for one scheduler process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IlpConfig {
    pub defaults: Defaults,
    pub driver: DriverConfig,
    pub sink: SinkConfig,
}

impl IlpConfig {
    /// Parse and validate `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is structurally
    /// invalid, or a value is out of range (color above `0xFFFFFF`,
    /// intensity above 255, zero tick period, seed delay above one day,
    /// unknown array in `pins`).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading scheduler configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: IlpConfigFile = if content.trim().is_empty() {
            IlpConfigFile::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML")?
        };

        let config = Self {
            defaults: file.scheduler.defaults()?,
            driver: file.scheduler.driver()?,
            sink: file.sink.into_config()?,
        };

        debug!(?config, "configuration loaded");
        Ok(config)
    }
}

impl SchedulerSection {
    fn defaults(&self) -> Result<Defaults> {
        let color = u32::try_from(self.default_color)
            .ok()
            .and_then(Color::new)
            .with_context(|| {
                format!(
                    "scheduler.default_color must be between 0 and 0xFFFFFF, got {}",
                    self.default_color
                )
            })?;
        let intensity = u8::try_from(self.default_intensity)
            .map(Intensity::new)
            .with_context(|| {
                format!(
                    "scheduler.default_intensity must be between 0 and 255, got {}",
                    self.default_intensity
                )
            })?;
        Ok(Defaults { color, intensity })
    }

    fn driver(&self) -> Result<DriverConfig> {
        if self.tick_period_ms == 0 {
            bail!("scheduler.tick_period_ms must be greater than zero");
        }
        if self.seed_delay_ms > MAX_SEED_DELAY_MS {
            bail!(
                "scheduler.seed_delay_ms must be at most {MAX_SEED_DELAY_MS}, got {}",
                self.seed_delay_ms
            );
        }
        Ok(DriverConfig {
            period: Duration::from_millis(self.tick_period_ms),
            seed_delay: Duration::from_millis(self.seed_delay_ms),
        })
    }
}

impl SinkSection {
    fn into_config(self) -> Result<SinkConfig> {
        let mut pins = BTreeMap::new();
        for (id, pin) in self.pins {
            let array = LedArray::new(id)
                .with_context(|| format!("sink.pins: unknown LED array {id}"))?;
            pins.insert(array, pin);
        }
        Ok(SinkConfig {
            kind: self.kind,
            device: self.device,
            pins: PinMap::new(pins),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    // ── load_from_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_yaml() {
        let yaml = r#"
scheduler:
  default_color: 0x336699
  default_intensity: 100
  tick_period_ms: 10
  seed_delay_ms: 250
sink:
  kind: log
  device: /tmp/pi-blaster
  pins:
    0: 17
    1: 18
"#;
        let f = yaml_tempfile(yaml);
        let cfg = IlpConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.defaults.color, Color::new(0x33_6699).unwrap());
        assert_eq!(cfg.defaults.intensity, Intensity::new(100));
        assert_eq!(cfg.driver.period, Duration::from_millis(10));
        assert_eq!(cfg.driver.seed_delay, Duration::from_millis(250));
        assert_eq!(cfg.sink.kind, SinkKind::Log);
        assert_eq!(cfg.sink.device, PathBuf::from("/tmp/pi-blaster"));
        assert_eq!(cfg.sink.pins.pin(LedArray::new(0).unwrap()), Some(17));
        assert_eq!(cfg.sink.pins.pin(LedArray::new(1).unwrap()), Some(18));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let yaml = "scheduler:\n  default_intensity: 7\n";
        let f = yaml_tempfile(yaml);
        let cfg = IlpConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.defaults.color, DEFAULT_COLOR);
        assert_eq!(cfg.defaults.intensity, Intensity::new(7));
        assert_eq!(cfg.driver, DriverConfig::default());
        assert_eq!(cfg.sink, SinkConfig::default());
    }

    #[test]
    fn empty_file_is_default_config() {
        let f = yaml_tempfile("");
        assert_eq!(IlpConfig::load_from_file(f.path()).unwrap(), IlpConfig::default());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = IlpConfig::load_from_file(Path::new("/nonexistent/path/ilp.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(IlpConfig::load_from_file(f.path()).is_err());
    }

    // ── Validation ────────────────────────────────────────────────────────────

    #[test]
    fn out_of_range_color_is_rejected() {
        let err = IlpConfig::from_yaml("scheduler:\n  default_color: 16777216\n").unwrap_err();
        assert!(format!("{err:#}").contains("16777216"), "{err:#}");
    }

    #[test]
    fn out_of_range_intensity_is_rejected() {
        assert!(IlpConfig::from_yaml("scheduler:\n  default_intensity: 256\n").is_err());
        assert!(IlpConfig::from_yaml("scheduler:\n  default_intensity: -1\n").is_err());
    }

    #[test]
    fn zero_tick_period_is_rejected() {
        let err = IlpConfig::from_yaml("scheduler:\n  tick_period_ms: 0\n").unwrap_err();
        assert!(format!("{err:#}").contains("tick_period_ms"), "{err:#}");
    }

    #[test]
    fn oversized_seed_delay_is_rejected() {
        let err = IlpConfig::from_yaml("scheduler:\n  seed_delay_ms: 18446744073709551615\n")
            .unwrap_err();
        assert!(format!("{err:#}").contains("seed_delay_ms"), "{err:#}");

        let cfg = IlpConfig::from_yaml("scheduler:\n  seed_delay_ms: 86400000\n").unwrap();
        assert_eq!(cfg.driver.seed_delay, Duration::from_secs(86_400));
    }

    #[test]
    fn unknown_array_in_pins_is_rejected() {
        let err = IlpConfig::from_yaml("sink:\n  pins:\n    2: 25\n").unwrap_err();
        assert!(format!("{err:#}").contains("unknown LED array 2"), "{err:#}");
    }

    #[test]
    fn unknown_sink_kind_is_rejected() {
        assert!(IlpConfig::from_yaml("sink:\n  kind: neopixel\n").is_err());
    }
}
