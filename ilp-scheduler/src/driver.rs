/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fixed-period loop that drives a [`ScheduleEngine`] and feeds a sink.
//!
//! ```text
//! Idle ──run()──► Running ──stop()──► Stopped
//! ```
//!
//! Each iteration: check the stop flag, `tick(now)`, hand a non-empty result
//! to the sink, then sleep for whatever is left of the period.  There is no
//! drift correction: an iteration that overruns its period is followed
//! immediately by the next one, and no tick is ever skipped.
//!
//! The engine lock is released by the time the sink runs, so a slow pin
//! write never blocks inbound `add` calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{TimeDelta, Utc};
use tracing::{debug, info, warn};

use crate::engine::ScheduleEngine;
use crate::item::{ArraySet, LedsScheduleItem};
use crate::sink::HardwareSink;

/// Default tick period, 1/50 s.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(20);

/// How far in the future the start-up baseline item is placed.
pub const DEFAULT_SEED_DELAY: Duration = Duration::from_millis(500);

// ── Configuration / state ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    pub period: Duration,
    pub seed_delay: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            seed_delay: DEFAULT_SEED_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
    /// Terminal.
    Stopped,
}

/// Counters collected over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverReport {
    pub ticks: u64,
    /// Successful sink calls.
    pub writes: u64,
    pub sink_failures: u64,
}

/// Cooperative stop signal, checked at iteration boundaries.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ── RealtimeDriver ────────────────────────────────────────────────────────────

pub struct RealtimeDriver<S> {
    engine: Arc<ScheduleEngine>,
    sink: S,
    config: DriverConfig,
    state: DriverState,
    stop: StopHandle,
}

impl<S: HardwareSink> RealtimeDriver<S> {
    pub fn new(engine: Arc<ScheduleEngine>, sink: S, config: DriverConfig) -> Self {
        Self {
            engine,
            sink,
            config,
            state: DriverState::Idle,
            stop: StopHandle(Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run until stopped, blocking the calling thread.
    ///
    /// Only an `Idle` driver runs; calling this again after it stopped
    /// returns an empty report.
    pub fn run(&mut self) -> DriverReport {
        let mut report = DriverReport::default();
        if self.state != DriverState::Idle {
            warn!(state = ?self.state, "driver already ran, ignoring run()");
            return report;
        }

        self.state = DriverState::Running;
        self.seed();
        info!(period_ms = self.config.period.as_millis() as u64, "driver running");

        while !self.stop.is_stopped() {
            let started = Instant::now();

            let settings = self.engine.tick(Utc::now());
            report.ticks += 1;

            if !settings.is_empty() {
                match self.sink.apply(&settings) {
                    Ok(()) => {
                        report.writes += 1;
                        debug!(arrays = settings.len(), "settings applied");
                    }
                    Err(e) => {
                        report.sink_failures += 1;
                        warn!(error = %e, "sink write failed");
                    }
                }
            }

            thread::sleep(self.config.period.saturating_sub(started.elapsed()));
        }

        self.state = DriverState::Stopped;
        info!(
            ticks = report.ticks,
            writes = report.writes,
            sink_failures = report.sink_failures,
            "driver stopped"
        );
        report
    }

    /// Baseline so the lamp shows the configured defaults shortly after
    /// start-up, even before any collaborator speaks.
    fn seed(&self) {
        let defaults = self.engine.defaults();
        let at = TimeDelta::from_std(self.config.seed_delay)
            .ok()
            .and_then(|delay| Utc::now().checked_add_signed(delay));
        let Some(at) = at else {
            warn!(
                seed_delay = ?self.config.seed_delay,
                "seed delay out of range, skipping baseline"
            );
            return;
        };
        let item = LedsScheduleItem::new(
            ArraySet::all(),
            at,
            Some(defaults.color),
            Some(defaults.intensity),
        );
        debug!(time = %item.time(), "seeding baseline");
        self.engine.add(item, false);
    }
}

impl<S: HardwareSink + Send + 'static> RealtimeDriver<S> {
    /// Run on a dedicated OS thread.
    pub fn spawn(mut self) -> std::io::Result<DriverHandle> {
        let stop = self.stop_handle();
        let join = thread::Builder::new()
            .name("ilp-driver".to_string())
            .spawn(move || self.run())?;
        Ok(DriverHandle { stop, join })
    }
}

/// Handle to a driver running on its own thread.
#[derive(Debug)]
pub struct DriverHandle {
    stop: StopHandle,
    join: JoinHandle<DriverReport>,
}

impl DriverHandle {
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Signal stop and wait for the loop to finish its current iteration.
    pub fn stop_and_join(self) -> thread::Result<DriverReport> {
        self.stop.stop();
        self.join.join()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
