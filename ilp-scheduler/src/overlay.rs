/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Time-ordered ledger of future default values.
//!
//! An entry `(t, v)` means "from `t` on, an item that leaves this attribute
//! unset inherits `v`".  The ledger may change at any time, so defaults are
//! only resolved when an item actually executes.
//!
//! Entries are ordered by [`ScheduleKey`]: time first, then insertion
//! sequence.  Among entries with the same time the most recently added one
//! therefore sorts last and wins a lookup.

use chrono::{DateTime, Utc};

// ── ScheduleKey ───────────────────────────────────────────────────────────────

/// Total order over everything the engine schedules: `(time, sequence)`.
///
/// The sequence number is assigned on insertion and starts at `1`, so
/// `ScheduleKey::floor(t)` sorts before every real key at `t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduleKey {
    pub time: DateTime<Utc>,
    pub seq: u64,
}

impl ScheduleKey {
    pub fn new(time: DateTime<Utc>, seq: u64) -> Self {
        Self { time, seq }
    }

    /// The smallest key at `time`.
    pub fn floor(time: DateTime<Utc>) -> Self {
        Self { time, seq: 0 }
    }

    /// The largest key at `time`.
    pub fn ceil(time: DateTime<Utc>) -> Self {
        Self {
            time,
            seq: u64::MAX,
        }
    }
}

// ── DefaultValueOverlay ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct OverlayEntry<T> {
    key: ScheduleKey,
    value: T,
}

/// Ordered `(effective_time, value)` ledger for one attribute.
#[derive(Debug, Clone)]
pub struct DefaultValueOverlay<T> {
    entries: Vec<OverlayEntry<T>>,
    /// Highest sequence number seen so far.
    last_seq: u64,
}

impl<T> Default for DefaultValueOverlay<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            last_seq: 0,
        }
    }
}

impl<T: Copy> DefaultValueOverlay<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` as the default from `time` on.
    ///
    /// The entry sorts after every existing entry with the same time.
    pub fn add(&mut self, time: DateTime<Utc>, value: T) {
        let key = ScheduleKey::new(time, self.last_seq + 1);
        self.add_keyed(key, value);
    }

    /// Record `value` under an explicit key (the engine passes the key of the
    /// item that carried the value).
    pub fn add_keyed(&mut self, key: ScheduleKey, value: T) {
        self.last_seq = self.last_seq.max(key.seq);
        // Insert after all entries <= key: stable among equal keys.
        let idx = self.entries.partition_point(|e| e.key <= key);
        self.entries.insert(idx, OverlayEntry { key, value });
    }

    /// Value of the latest entry with `effective_time < time`, or `None`.
    pub fn get(&self, time: DateTime<Utc>) -> Option<T> {
        self.get_before(ScheduleKey::floor(time))
    }

    /// Value of the latest entry ordered strictly before `key`.
    pub fn get_before(&self, key: ScheduleKey) -> Option<T> {
        let idx = self.entries.partition_point(|e| e.key < key);
        idx.checked_sub(1).map(|i| self.entries[i].value)
    }

    /// Drop entries that can no longer answer any lookup at or after
    /// `horizon`.
    ///
    /// The latest entry strictly before `horizon` is kept since it is still
    /// the answer for lookups just past the horizon.  Returns the number of
    /// evicted entries.
    pub fn prune_before(&mut self, horizon: ScheduleKey) -> usize {
        let idx = self.entries.partition_point(|e| e.key < horizon);
        let evict = idx.saturating_sub(1);
        self.entries.drain(..evict);
        evict
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Effective time of the oldest retained entry.
    pub fn earliest(&self) -> Option<DateTime<Utc>> {
        self.entries.first().map(|e| e.key.time)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
