/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Inbound commands.
//!
//! Collaborators talk to the scheduler with a newline-delimited JSON
//! protocol: one message per line, tagged by `action`.
//!
//! ```text
//! {"action": "schedule", "start_time": "2026-10-19 12:00:00", "leds": [0, 1], "intensity": 80}
//! {"action": "alarm", "start_time": "...", "color": 2258875, "high_intensity": 220,
//!  "low_intensity": 40, "flash_duration": 1, "flash_period": 3, "flashes": 15}
//! {"action": "stop"}
//! ```
//!
//! Each line is parsed into an [`InboundMessage`] and then validated into a
//! [`Command`] that [`ScheduleEngine::dispatch`](crate::engine::ScheduleEngine::dispatch)
//! understands.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::engine::{InvalidItemReason, ScheduleError};
use crate::item::{Color, Intensity, LedArray, LedsScheduleItem, UNSET};
use crate::schedule::{AlarmPattern, Schedule};

/// Wire format of `start_time`, always UTC.
pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Command ───────────────────────────────────────────────────────────────────

/// A validated request for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Submit one item.
    AddItem {
        item: LedsScheduleItem,
        overwrite: bool,
    },

    /// Submit a batch; only its final item may become a default.
    AddSchedule { schedule: Schedule, overwrite: bool },

    /// Stop the driver and exit.
    Stop,
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_yaml::Error),

    #[error("bad start_time {value:?} (expected YYYY-MM-DD HH:MM:SS): {source}")]
    BadStartTime {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error(transparent)]
    Invalid(#[from] ScheduleError),
}

// ── Wire messages ─────────────────────────────────────────────────────────────

/// One line of the inbound protocol, before validation.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Single item; `-1` or an omitted attribute means "inherit".
    Schedule {
        start_time: String,
        #[serde(default)]
        leds: Option<Leds>,
        #[serde(default = "unset")]
        color: i64,
        #[serde(default = "unset")]
        intensity: i64,
        #[serde(default)]
        overwrite: bool,
    },

    /// Flash both arrays; timings are in seconds.
    Alarm {
        start_time: String,
        color: i64,
        high_intensity: i64,
        low_intensity: i64,
        flash_duration: f64,
        flash_period: f64,
        flashes: u32,
        #[serde(default)]
        overwrite: bool,
    },

    Stop,
}

/// `leds` accepts a bare id or a list of ids.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Leds {
    One(i64),
    Many(Vec<i64>),
}

impl Leds {
    fn into_ids(self) -> Vec<i64> {
        match self {
            Leds::One(id) => vec![id],
            Leds::Many(ids) => ids,
        }
    }
}

fn unset() -> i64 {
    UNSET
}

impl InboundMessage {
    /// Validate into an engine command.
    pub fn into_command(self) -> Result<Command, CommandError> {
        match self {
            InboundMessage::Schedule {
                start_time,
                leds,
                color,
                intensity,
                overwrite,
            } => {
                let time = parse_start_time(&start_time)?;
                let item = match leds {
                    Some(leds) => {
                        LedsScheduleItem::from_wire(leds.into_ids(), time, color, intensity)?
                    }
                    None => {
                        let ids = LedArray::all().map(|a| i64::from(a.id()));
                        LedsScheduleItem::from_wire(ids, time, color, intensity)?
                    }
                };
                Ok(Command::AddItem { item, overwrite })
            }

            InboundMessage::Alarm {
                start_time,
                color,
                high_intensity,
                low_intensity,
                flash_duration,
                flash_period,
                flashes,
                overwrite,
            } => {
                let start = parse_start_time(&start_time)?;
                let pattern = AlarmPattern {
                    start,
                    color: explicit(color, Color::from_wire)?,
                    high_intensity: explicit(high_intensity, Intensity::from_wire)?,
                    low_intensity: explicit(low_intensity, Intensity::from_wire)?,
                    flash_duration: seconds(flash_duration)?,
                    flash_period: seconds(flash_period)?,
                    flashes,
                };
                let schedule = Schedule::alarm(&pattern)?;
                Ok(Command::AddSchedule {
                    schedule,
                    overwrite,
                })
            }

            InboundMessage::Stop => Ok(Command::Stop),
        }
    }
}

/// Alarm attributes must be explicit: an alarm that inherits is no alarm.
fn explicit<T>(
    raw: i64,
    parse: impl FnOnce(i64) -> Result<Option<T>, InvalidItemReason>,
) -> Result<T, ScheduleError> {
    match parse(raw) {
        Ok(Some(v)) => Ok(v),
        Ok(None) => Err(ScheduleError::InvalidAlarm(
            "alarm color and intensities must be set",
        )),
        Err(_) => Err(ScheduleError::InvalidAlarm(
            "alarm color or intensity out of range",
        )),
    }
}

fn seconds(secs: f64) -> Result<Duration, ScheduleError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        ScheduleError::InvalidAlarm("flash timing must be a non-negative number of seconds")
    })
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `YYYY-MM-DD HH:MM:SS[.fff]` as UTC, truncating fractional seconds.
pub fn parse_start_time(value: &str) -> Result<DateTime<Utc>, CommandError> {
    let trimmed = value.trim();
    let whole = trimmed.split_once('.').map_or(trimmed, |(head, _)| head);
    NaiveDateTime::parse_from_str(whole, START_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| CommandError::BadStartTime {
            value: value.to_string(),
            source,
        })
}

/// Parse and validate one inbound line.
pub fn parse_line(line: &str) -> Result<Command, CommandError> {
    let message: InboundMessage = serde_yaml::from_str(line)?;
    message.into_command()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
