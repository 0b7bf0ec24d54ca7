/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Schedule execution engine.
//!
//! [`ScheduleEngine`] accepts future-dated [`LedsScheduleItem`]s and, on each
//! [`tick`](ScheduleEngine::tick), turns every item whose time has come into
//! one resolved [`LedSetting`] per LED array.
//!
//! # Resolution rules
//!
//! | Step | Rule |
//! |---|---|
//! | Admission | Items in the past are dropped; items at or before the high-water mark are dropped unless `overwrite` |
//! | Defaults | Every accepted explicit color/intensity becomes the default from the item's time on |
//! | Unset attribute | Latest default ordered before the item, else the process default |
//! | Several due items for one array | Processed in (time, insertion) order; the last one wins |
//!
//! # Concurrency
//! All mutable state sits in one `Mutex`.  `add` may run on the inbound
//! thread while `tick` runs on the driver thread; neither performs I/O while
//! holding the lock.

pub mod error;

pub use error::{InvalidItemReason, ScheduleError};

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace};

use crate::command::Command;
use crate::item::{Color, Intensity, LedSetting, LedsScheduleItem, Settings};
use crate::overlay::{DefaultValueOverlay, ScheduleKey};
use crate::schedule::Schedule;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Color used when neither an item nor the overlay supplies one.
pub const DEFAULT_COLOR: Color = Color::WHITE;

/// Intensity used when neither an item nor the overlay supplies one.
pub const DEFAULT_INTENSITY: Intensity = Intensity::new(192);

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Process-wide fallback values for unset attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    pub color: Color,
    pub intensity: Intensity,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR,
            intensity: DEFAULT_INTENSITY,
        }
    }
}

// ── Internal state ────────────────────────────────────────────────────────────

/// Outcome of one admission check, only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Accepted,
    /// Item time already passed when it arrived.
    Past,
    /// Item time at or before the high-water mark, no overwrite.
    Collision,
}

struct EngineState {
    /// Pending items keyed by `(time, insertion sequence)`.
    pending: BTreeMap<ScheduleKey, LedsScheduleItem>,
    /// Latest time among all accepted items.
    high_water_mark: DateTime<Utc>,
    /// Last sequence number handed out.
    seq: u64,
    colors: DefaultValueOverlay<Color>,
    intensities: DefaultValueOverlay<Intensity>,
}

impl EngineState {
    fn admit(
        &mut self,
        item: LedsScheduleItem,
        overwrite: bool,
        now: DateTime<Utc>,
        record_defaults: bool,
    ) -> Admission {
        let time = item.time();
        if time < now {
            return Admission::Past;
        }
        if time <= self.high_water_mark && !overwrite {
            return Admission::Collision;
        }

        self.seq += 1;
        let key = ScheduleKey::new(time, self.seq);
        self.high_water_mark = self.high_water_mark.max(time);

        if record_defaults {
            if let Some(color) = item.color() {
                self.colors.add_keyed(key, color);
            }
            if let Some(intensity) = item.intensity() {
                self.intensities.add_keyed(key, intensity);
            }
        }
        self.pending.insert(key, item);
        Admission::Accepted
    }
}

// ── ScheduleEngine ────────────────────────────────────────────────────────────

/// Owner of the pending set and both default overlays.
///
/// Each engine is independent; two lamp-post endpoints run two engines.
pub struct ScheduleEngine {
    defaults: Defaults,
    state: Mutex<EngineState>,
}

impl ScheduleEngine {
    /// Create an engine whose high-water mark starts at the current time.
    pub fn new(defaults: Defaults) -> Self {
        Self::starting_at(defaults, Utc::now())
    }

    /// Create an engine whose high-water mark starts at `start`.
    pub fn starting_at(defaults: Defaults, start: DateTime<Utc>) -> Self {
        info!(
            default_color = %defaults.color,
            default_intensity = defaults.intensity.value(),
            %start,
            "ScheduleEngine created"
        );
        Self {
            defaults,
            state: Mutex::new(EngineState {
                pending: BTreeMap::new(),
                high_water_mark: start,
                seq: 0,
                colors: DefaultValueOverlay::new(),
                intensities: DefaultValueOverlay::new(),
            }),
        }
    }

    pub fn defaults(&self) -> Defaults {
        self.defaults
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        // The state stays consistent even if a holder panicked mid-log.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Inbound ───────────────────────────────────────────────────────────────

    /// Submit one item.
    ///
    /// Past items and items colliding with the already-scheduled window
    /// (unless `overwrite`) are dropped silently.  "Now" is read once the
    /// lock is held, so it is never older than the horizon of a tick that
    /// ran in between.
    pub fn add(&self, item: LedsScheduleItem, overwrite: bool) {
        self.add_with(item, overwrite, Utc::now);
    }

    /// [`add`](Self::add) with an explicit notion of "now".
    pub fn add_at(&self, item: LedsScheduleItem, overwrite: bool, now: DateTime<Utc>) {
        self.add_with(item, overwrite, || now);
    }

    fn add_with(
        &self,
        item: LedsScheduleItem,
        overwrite: bool,
        now: impl FnOnce() -> DateTime<Utc>,
    ) {
        let time = item.time();
        let admission = {
            let mut state = self.lock();
            state.admit(item, overwrite, now(), true)
        };
        log_admission(time, overwrite, admission);
    }

    /// Submit a batch.
    ///
    /// Items are admitted in time order under the same policy as
    /// [`add`](Self::add), but only the final item of the batch may record new
    /// defaults.  Intermediate items (alarm flashes) are transient, so an
    /// unset final item restores the defaults in force before the batch.
    pub fn add_schedule(&self, schedule: Schedule, overwrite: bool) {
        self.add_schedule_with(schedule, overwrite, Utc::now);
    }

    /// [`add_schedule`](Self::add_schedule) with an explicit notion of "now".
    pub fn add_schedule_at(&self, schedule: Schedule, overwrite: bool, now: DateTime<Utc>) {
        self.add_schedule_with(schedule, overwrite, || now);
    }

    fn add_schedule_with(
        &self,
        schedule: Schedule,
        overwrite: bool,
        now: impl FnOnce() -> DateTime<Utc>,
    ) {
        let items = schedule.into_items();
        let last = items.len().saturating_sub(1);
        let total = items.len();

        let mut state = self.lock();
        let now = now();
        let mut accepted = 0usize;
        for (i, item) in items.into_iter().enumerate() {
            let time = item.time();
            let admission = state.admit(item, overwrite, now, i == last);
            log_admission(time, overwrite, admission);
            if admission == Admission::Accepted {
                accepted += 1;
            }
        }
        drop(state);

        debug!(accepted, total, overwrite, "schedule batch admitted");
    }

    /// Apply one inbound command.
    ///
    /// Returns `Break` when the command asks the caller to stop.
    pub fn dispatch(&self, command: Command) -> ControlFlow<()> {
        match command {
            Command::AddItem { item, overwrite } => {
                self.add(item, overwrite);
                ControlFlow::Continue(())
            }
            Command::AddSchedule {
                schedule,
                overwrite,
            } => {
                self.add_schedule(schedule, overwrite);
                ControlFlow::Continue(())
            }
            Command::Stop => {
                info!("stop requested");
                ControlFlow::Break(())
            }
        }
    }

    // ── Periodic ──────────────────────────────────────────────────────────────

    /// Extract every item due at `now` and collapse them into one setting per
    /// array.
    ///
    /// Due items are removed exactly once: a second call with the same `now`
    /// returns an empty map.
    pub fn tick(&self, now: DateTime<Utc>) -> Settings {
        let mut state = self.lock();

        // Partition, then replace: everything <= now is due.
        let remaining = state.pending.split_off(&ScheduleKey::ceil(now));
        let due = std::mem::replace(&mut state.pending, remaining);

        let mut settings = Settings::new();
        for (key, item) in due {
            let color = item
                .color()
                .or_else(|| state.colors.get_before(key))
                .unwrap_or(self.defaults.color);
            let intensity = item
                .intensity()
                .or_else(|| state.intensities.get_before(key))
                .unwrap_or(self.defaults.intensity);

            trace!(time = %key.time, seq = key.seq, %color, intensity = intensity.value(), "resolved item");
            for array in item.arrays().iter() {
                settings.insert(array, LedSetting { color, intensity });
            }
        }

        // Every pending item and every later admission sorts at or after `now`.
        let horizon = ScheduleKey::floor(now);
        let evicted = state.colors.prune_before(horizon) + state.intensities.prune_before(horizon);
        if evicted > 0 {
            trace!(evicted, "pruned stale defaults");
        }

        settings
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    /// Snapshot of pending items in execution order, for callers planning new
    /// adds or overwrites.
    pub fn pending(&self) -> Vec<LedsScheduleItem> {
        self.lock().pending.values().cloned().collect()
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn high_water_mark(&self) -> DateTime<Utc> {
        self.lock().high_water_mark
    }

    /// Number of retained `(color, intensity)` overlay entries.
    pub fn overlay_len(&self) -> (usize, usize) {
        let state = self.lock();
        (state.colors.len(), state.intensities.len())
    }
}

fn log_admission(time: DateTime<Utc>, overwrite: bool, admission: Admission) {
    match admission {
        Admission::Accepted => debug!(%time, overwrite, "item accepted"),
        Admission::Past => debug!(%time, "item dropped: time already passed"),
        Admission::Collision => {
            debug!(%time, "item dropped: collides with scheduled window (no overwrite)")
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
