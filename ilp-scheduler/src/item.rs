/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core value types for the lamp post schedule engine.
//!
//! Two distinct types model the two sides of the execution pipeline:
//!
//! ```text
//! collaborator ──►  LedsScheduleItem  ──(engine tick)──►  LedSetting  ──(sink)──►  PWM pins
//!                    ↑ input                                ↑ output
//!                    color/intensity may be unset           always fully resolved
//! ```
//!
//! The wire format uses `-1` as the "unset" sentinel.  Inside the crate an
//! unset attribute is `None`, so a resolved [`LedSetting`] can never carry it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::engine::{InvalidItemReason, ScheduleError};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Number of LED arrays on one lamp post.
pub const ARRAY_COUNT: u8 = 2;

/// Largest valid 24-bit color.
pub const MAX_COLOR: u32 = 0xFF_FFFF;

/// Largest valid intensity.
pub const MAX_INTENSITY: u8 = u8::MAX;

/// Sentinel used by the wire format for "no value".
pub const UNSET: i64 = -1;

// ── LedArray ──────────────────────────────────────────────────────────────────

/// Identifier of one LED array on the lamp post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LedArray(u8);

impl LedArray {
    /// Returns `None` for ids outside `0..ARRAY_COUNT`.
    pub fn new(id: u8) -> Option<Self> {
        (id < ARRAY_COUNT).then_some(Self(id))
    }

    pub fn id(self) -> u8 {
        self.0
    }

    /// All arrays in ascending id order.
    pub fn all() -> impl Iterator<Item = LedArray> {
        (0..ARRAY_COUNT).map(LedArray)
    }
}

impl fmt::Display for LedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "led{}", self.0)
    }
}

// ── ArraySet ──────────────────────────────────────────────────────────────────

/// Non-empty set of target arrays, stored as a bitmask.
///
/// Bit N set means array N is targeted.  Only masks built through
/// [`ArraySet::from_ids`] or [`ArraySet::all`] exist, so the set is never
/// empty and never names an unknown array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArraySet(u8);

impl ArraySet {
    /// Every array on the lamp post.
    pub fn all() -> Self {
        Self((1u8 << ARRAY_COUNT) - 1)
    }

    pub fn single(array: LedArray) -> Self {
        Self(1 << array.0)
    }

    /// Build a set from raw ids.
    ///
    /// # Errors
    /// [`InvalidItemReason::EmptyArraySet`] if `ids` yields nothing,
    /// [`InvalidItemReason::UnknownArray`] for any id `>= ARRAY_COUNT`.
    pub fn from_ids<I>(ids: I) -> Result<Self, InvalidItemReason>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut mask = 0u8;
        for id in ids {
            let array = u8::try_from(id)
                .ok()
                .and_then(LedArray::new)
                .ok_or(InvalidItemReason::UnknownArray { id })?;
            mask |= 1 << array.0;
        }
        if mask == 0 {
            return Err(InvalidItemReason::EmptyArraySet);
        }
        Ok(Self(mask))
    }

    pub fn contains(&self, array: LedArray) -> bool {
        (self.0 >> array.0) & 1 == 1
    }

    /// Targeted arrays in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = LedArray> + '_ {
        LedArray::all().filter(move |a| self.contains(*a))
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Always `false`; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl Default for ArraySet {
    fn default() -> Self {
        ArraySet::all()
    }
}

// ── Color / Intensity ─────────────────────────────────────────────────────────

/// A validated 24-bit `0xRRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(u32);

impl Color {
    pub const WHITE: Color = Color(MAX_COLOR);

    /// Returns `None` above `0xFFFFFF`.
    pub fn new(value: u32) -> Option<Self> {
        (value <= MAX_COLOR).then_some(Self(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Split into `(r, g, b)` channels.
    pub fn rgb(self) -> (u8, u8, u8) {
        let [_, r, g, b] = self.0.to_be_bytes();
        (r, g, b)
    }

    /// Parse a wire value where [`UNSET`] maps to `None`.
    ///
    /// # Errors
    /// [`InvalidItemReason::ColorOutOfRange`] for anything below `-1` or above
    /// `0xFFFFFF`.
    pub fn from_wire(raw: i64) -> Result<Option<Self>, InvalidItemReason> {
        if raw == UNSET {
            return Ok(None);
        }
        u32::try_from(raw)
            .ok()
            .and_then(Color::new)
            .map(Some)
            .ok_or(InvalidItemReason::ColorOutOfRange { value: raw })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

/// LED intensity, `0` (off) to `255` (full).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Intensity(u8);

impl Intensity {
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// PWM duty cycle in `[0.0, 1.0]`.
    pub fn duty_cycle(self) -> f64 {
        f64::from(self.0) / f64::from(MAX_INTENSITY)
    }

    /// Parse a wire value where [`UNSET`] maps to `None`.
    ///
    /// # Errors
    /// [`InvalidItemReason::IntensityOutOfRange`] for anything below `-1` or
    /// above `255`.
    pub fn from_wire(raw: i64) -> Result<Option<Self>, InvalidItemReason> {
        if raw == UNSET {
            return Ok(None);
        }
        u8::try_from(raw)
            .map(|v| Some(Intensity(v)))
            .map_err(|_| InvalidItemReason::IntensityOutOfRange { value: raw })
    }
}

impl From<u8> for Intensity {
    fn from(value: u8) -> Self {
        Intensity(value)
    }
}

// ── LedsScheduleItem (input) ──────────────────────────────────────────────────

/// One immutable lighting instruction.
///
/// # Lifecycle
/// Created by the inbound endpoint (or by the driver for the start-up
/// baseline), **moved** into `ScheduleEngine::add`, owned by the pending set
/// until its time passes, then consumed by `tick` and turned into a
/// [`LedSetting`] per targeted array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedsScheduleItem {
    arrays: ArraySet,
    time: DateTime<Utc>,
    color: Option<Color>,
    intensity: Option<Intensity>,
}

impl LedsScheduleItem {
    /// Build an item from already-typed parts.  Cannot fail: every typed
    /// value is valid by construction.
    pub fn new(
        arrays: ArraySet,
        time: DateTime<Utc>,
        color: Option<Color>,
        intensity: Option<Intensity>,
    ) -> Self {
        Self {
            arrays,
            time,
            color,
            intensity,
        }
    }

    /// Build an item from wire values (`-1` = unset).
    ///
    /// An empty `leds` list is rejected; callers wanting "all arrays" pass
    /// `[0, 1]` or use [`LedsScheduleItem::new`] with [`ArraySet::all`].
    ///
    /// # Errors
    /// [`ScheduleError::InvalidScheduleItem`] with the first failing check.
    pub fn from_wire<I>(
        leds: I,
        time: DateTime<Utc>,
        color: i64,
        intensity: i64,
    ) -> Result<Self, ScheduleError>
    where
        I: IntoIterator<Item = i64>,
    {
        let invalid = |reason| ScheduleError::InvalidScheduleItem { time, reason };
        let arrays = ArraySet::from_ids(leds).map_err(invalid)?;
        let color = Color::from_wire(color).map_err(invalid)?;
        let intensity = Intensity::from_wire(intensity).map_err(invalid)?;
        Ok(Self::new(arrays, time, color, intensity))
    }

    /// An item that changes nothing explicitly: both attributes inherit the
    /// current defaults when it executes.
    pub fn inherit(arrays: ArraySet, time: DateTime<Utc>) -> Self {
        Self::new(arrays, time, None, None)
    }

    pub fn arrays(&self) -> ArraySet {
        self.arrays
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    pub fn intensity(&self) -> Option<Intensity> {
        self.intensity
    }

    /// `true` if the item carries at least one explicit attribute.
    pub fn is_explicit(&self) -> bool {
        self.color.is_some() || self.intensity.is_some()
    }
}

// ── LedSetting (output) ───────────────────────────────────────────────────────

/// Fully resolved state for one array, ready for the hardware sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedSetting {
    pub color: Color,
    pub intensity: Intensity,
}

/// Per-array settings produced by one engine tick.
///
/// `BTreeMap` so the sink always writes arrays in ascending id order.
pub type Settings = BTreeMap<LedArray, LedSetting>;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── ArraySet ──────────────────────────────────────────────────────────────

    #[test]
    fn array_set_from_ids_accepts_observed_domain() {
        assert_eq!(ArraySet::from_ids([0]).unwrap().len(), 1);
        assert_eq!(ArraySet::from_ids([1]).unwrap().len(), 1);
        assert_eq!(ArraySet::from_ids([0, 1]).unwrap(), ArraySet::all());
    }

    #[test]
    fn array_set_rejects_empty_and_unknown_ids() {
        assert_eq!(
            ArraySet::from_ids(Vec::<i64>::new()).unwrap_err(),
            InvalidItemReason::EmptyArraySet
        );
        assert_eq!(
            ArraySet::from_ids([0, 2]).unwrap_err(),
            InvalidItemReason::UnknownArray { id: 2 }
        );
        assert_eq!(
            ArraySet::from_ids([-1]).unwrap_err(),
            InvalidItemReason::UnknownArray { id: -1 }
        );
    }

    #[test]
    fn array_set_iterates_in_ascending_order() {
        let set = ArraySet::from_ids([1, 0, 1]).unwrap();
        let ids: Vec<u8> = set.iter().map(LedArray::id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    // ── Color / Intensity ─────────────────────────────────────────────────────

    #[test]
    fn color_wire_sentinel_is_unset() {
        assert_eq!(Color::from_wire(UNSET).unwrap(), None);
        assert_eq!(Color::from_wire(0).unwrap(), Color::new(0));
        assert_eq!(Color::from_wire(0xFF_FFFF).unwrap(), Some(Color::WHITE));
    }

    #[test]
    fn color_out_of_range_is_rejected() {
        assert!(Color::new(0x100_0000).is_none());
        assert_eq!(
            Color::from_wire(0x100_0000).unwrap_err(),
            InvalidItemReason::ColorOutOfRange { value: 0x100_0000 }
        );
        assert!(Color::from_wire(-2).is_err());
    }

    #[test]
    fn color_splits_into_channels() {
        let c = Color::new(0x11_2233).unwrap();
        assert_eq!(c.rgb(), (0x11, 0x22, 0x33));
        assert_eq!(c.to_string(), "#112233");
    }

    #[test]
    fn intensity_wire_range() {
        assert_eq!(Intensity::from_wire(UNSET).unwrap(), None);
        assert_eq!(Intensity::from_wire(255).unwrap(), Some(Intensity::new(255)));
        assert!(Intensity::from_wire(256).is_err());
        assert!(Intensity::from_wire(-5).is_err());
    }

    #[test]
    fn intensity_duty_cycle_spans_unit_interval() {
        assert_eq!(Intensity::new(0).duty_cycle(), 0.0);
        assert_eq!(Intensity::new(255).duty_cycle(), 1.0);
    }

    // ── LedsScheduleItem ──────────────────────────────────────────────────────

    #[test]
    fn from_wire_builds_partial_item() {
        let t = Utc::now();
        let item = LedsScheduleItem::from_wire([0], t, UNSET, 80).unwrap();
        assert_eq!(item.time(), t);
        assert_eq!(item.color(), None);
        assert_eq!(item.intensity(), Some(Intensity::new(80)));
        assert!(item.is_explicit());
        assert!(item.arrays().contains(LedArray::new(0).unwrap()));
        assert!(!item.arrays().contains(LedArray::new(1).unwrap()));
    }

    #[test]
    fn from_wire_reports_invalid_reason() {
        let err = LedsScheduleItem::from_wire([0, 1], Utc::now(), 0, 300).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidScheduleItem {
                reason: InvalidItemReason::IntensityOutOfRange { value: 300 },
                ..
            }
        ));
    }

    #[test]
    fn inherit_item_is_not_explicit() {
        let item = LedsScheduleItem::inherit(ArraySet::all(), Utc::now());
        assert!(!item.is_explicit());
    }
}
