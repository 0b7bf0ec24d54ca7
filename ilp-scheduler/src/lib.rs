/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! ILP scheduler: executes timed LED instructions on an intelligent lamp post
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── item        – validated schedule items and resolved settings
//! ├── overlay     – time-ordered default-value ledger
//! ├── schedule    – batches (simple scenarios, alarm flashes)
//! ├── engine/     – pending set, admission policy, tick resolution
//! ├── command     – inbound JSON-lines protocol → Command
//! ├── sink        – hardware sinks (pi-blaster, dry-run log)
//! ├── driver      – fixed-period tick loop on its own thread
//! └── config/     – YAML configuration
//! ```

pub mod command;
pub mod config;
pub mod driver;
pub mod engine;
pub mod item;
pub mod overlay;
pub mod schedule;
pub mod sink;

pub use command::Command;
pub use engine::{Defaults, ScheduleEngine, ScheduleError};
pub use item::{LedSetting, LedsScheduleItem, Settings};
