/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Schedules: batches of items submitted together.
//!
//! A batch differs from a run of single adds in one way: only its final item
//! may become a new default (see
//! [`ScheduleEngine::add_schedule`](crate::engine::ScheduleEngine::add_schedule)).
//! Intermediate items such as alarm flashes are transient.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::engine::ScheduleError;
use crate::item::{ArraySet, Color, Intensity, LedsScheduleItem};

/// Upper bound on alarm flashes accepted in one pattern.
pub const MAX_ALARM_FLASHES: u32 = 10_000;

/// A batch of schedule items, kept in ascending time order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    items: Vec<LedsScheduleItem>,
}

impl Schedule {
    /// An externally defined lighting scenario.
    pub fn simple(items: impl IntoIterator<Item = LedsScheduleItem>) -> Self {
        let mut items: Vec<_> = items.into_iter().collect();
        // Stable: equal times keep submission order.
        items.sort_by_key(LedsScheduleItem::time);
        Self { items }
    }

    /// Both arrays flash synchronously, then fall back to the defaults that
    /// were in force before the alarm.
    ///
    /// # Errors
    /// [`ScheduleError::InvalidAlarm`] if there are no flashes or more than
    /// [`MAX_ALARM_FLASHES`], if the flash duration is not strictly inside the
    /// flash period, or if the pattern runs past the representable time range.
    pub fn alarm(pattern: &AlarmPattern) -> Result<Self, ScheduleError> {
        if pattern.flashes == 0 {
            return Err(ScheduleError::InvalidAlarm("at least one flash is required"));
        }
        if pattern.flashes > MAX_ALARM_FLASHES {
            return Err(ScheduleError::InvalidAlarm("too many flashes"));
        }
        if pattern.flash_duration.is_zero() || pattern.flash_duration >= pattern.flash_period {
            return Err(ScheduleError::InvalidAlarm(
                "flash duration must be positive and shorter than the flash period",
            ));
        }
        let duration = TimeDelta::from_std(pattern.flash_duration)
            .map_err(|_| ScheduleError::InvalidAlarm("flash duration out of range"))?;
        let period = TimeDelta::from_std(pattern.flash_period)
            .map_err(|_| ScheduleError::InvalidAlarm("flash period out of range"))?;

        let arrays = ArraySet::all();
        let mut items = Vec::with_capacity(2 * pattern.flashes as usize + 1);
        let mut at = pattern.start;
        for _ in 0..pattern.flashes {
            items.push(LedsScheduleItem::new(
                arrays,
                at,
                Some(pattern.color),
                Some(pattern.high_intensity),
            ));
            items.push(LedsScheduleItem::new(
                arrays,
                shift(at, duration)?,
                Some(pattern.color),
                Some(pattern.low_intensity),
            ));
            at = shift(at, period)?;
        }
        items.push(LedsScheduleItem::inherit(arrays, at));

        Ok(Self { items })
    }

    pub fn items(&self) -> &[LedsScheduleItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<LedsScheduleItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn shift(at: DateTime<Utc>, by: TimeDelta) -> Result<DateTime<Utc>, ScheduleError> {
    at.checked_add_signed(by).ok_or(ScheduleError::InvalidAlarm(
        "alarm extends past the representable time range",
    ))
}

/// Parameters of an alarm flash pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmPattern {
    pub start: DateTime<Utc>,
    pub color: Color,
    pub high_intensity: Intensity,
    pub low_intensity: Intensity,
    /// How long each flash stays at `high_intensity`.
    pub flash_duration: Duration,
    /// Time between the starts of two flashes.
    pub flash_period: Duration,
    pub flashes: u32,
}
