/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the lamp post schedule engine.
//!
//! Two types model the two failure layers:
//!
//! * [`InvalidItemReason`]: why a single item's values were rejected
//!   (low-level, carries the offending raw value).
//! * [`ScheduleError`]: what the constructor of an item or schedule
//!   returns to its caller.
//!
//! Admission drops inside [`ScheduleEngine::add`](super::ScheduleEngine::add)
//! (past time, colliding time) are policy, not errors, and never appear here.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::item::{ARRAY_COUNT, MAX_COLOR};

// ── Item validation ───────────────────────────────────────────────────────────

/// Detailed reason why an item failed validation.
///
/// Carried inside [`ScheduleError::InvalidScheduleItem`] so the caller knows
/// both *which* item failed and *why*.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidItemReason {
    /// The item names no arrays at all.
    EmptyArraySet,

    /// An array id outside `0..ARRAY_COUNT`.
    UnknownArray { id: i64 },

    /// Color below the `-1` sentinel or above `0xFFFFFF`.
    ColorOutOfRange { value: i64 },

    /// Intensity below the `-1` sentinel or above `255`.
    IntensityOutOfRange { value: i64 },
}

impl std::fmt::Display for InvalidItemReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidItemReason::EmptyArraySet => write!(f, "no LED array selected"),

            InvalidItemReason::UnknownArray { id } => write!(
                f,
                "unknown LED array {} (valid: 0..{})",
                id, ARRAY_COUNT
            ),

            InvalidItemReason::ColorOutOfRange { value } => write!(
                f,
                "color must be between -1 and {:#X}, got {}",
                MAX_COLOR, value
            ),

            InvalidItemReason::IntensityOutOfRange { value } => write!(
                f,
                "intensity must be between -1 and 255, got {}",
                value
            ),
        }
    }
}

// ── Top-level schedule errors ─────────────────────────────────────────────────

/// Error returned when building items or schedules.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// An item's values failed validation.
    #[error("invalid schedule item at {time}: {reason}")]
    InvalidScheduleItem {
        time: DateTime<Utc>,
        reason: InvalidItemReason,
    },

    /// Alarm parameters cannot produce a well-formed flash pattern.
    #[error("invalid alarm pattern: {0}")]
    InvalidAlarm(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_messages_carry_offending_value() {
        let msg = InvalidItemReason::ColorOutOfRange { value: 0x100_0000 }.to_string();
        assert!(msg.contains("0xFFFFFF"), "{msg}");
        assert!(msg.contains("16777216"), "{msg}");

        let msg = InvalidItemReason::UnknownArray { id: 7 }.to_string();
        assert!(msg.contains('7'), "{msg}");
    }

    #[test]
    fn schedule_error_wraps_reason() {
        let err = ScheduleError::InvalidScheduleItem {
            time: Utc::now(),
            reason: InvalidItemReason::EmptyArraySet,
        };
        assert!(err.to_string().ends_with("no LED array selected"));
    }
}
