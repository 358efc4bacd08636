//! Shared virtual clock and periodic task cadence.
//!
//! All simulated time is expressed in simulated milliseconds. The driver loop is
//! the only writer of the clock; every periodic task reads it through a cloned
//! [`VirtualClock`] handle and decides on its own whether it is due.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub const MS_PER_SECOND: u64 = 1000;
pub const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
pub const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

// Default cadences in simulated time
const DEFAULT_AIRCRAFT_INTERVAL_MS: u64 = 30 * MS_PER_SECOND;
const DEFAULT_CHARGER_INTERVAL_MS: u64 = 15 * MS_PER_SECOND;
const DEFAULT_FAULT_SERVICE_INTERVAL_MS: u64 = MS_PER_MINUTE;
const DEFAULT_TELEMETRY_INTERVAL_MS: u64 = 5 * MS_PER_MINUTE;

/// Convert simulated milliseconds to fractional hours.
pub fn ms_to_hours(ms: u64) -> f64 {
    ms as f64 / MS_PER_HOUR as f64
}

/// Convert fractional minutes to simulated milliseconds.
pub fn minutes_to_ms(minutes: f64) -> u64 {
    (minutes.max(0.0) * MS_PER_MINUTE as f64).round() as u64
}

/// Process-wide elapsed virtual time.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    elapsed_ms: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.elapsed_ms.load(Ordering::Acquire)
    }

    /// Advance by `dt_ms` and return the new time.
    pub fn advance(&self, dt_ms: u64) -> u64 {
        self.elapsed_ms.fetch_add(dt_ms, Ordering::AcqRel) + dt_ms
    }

    /// Move the clock forward to `target_ms`. Earlier targets are ignored.
    pub fn advance_to(&self, target_ms: u64) -> u64 {
        let previous = self.elapsed_ms.fetch_max(target_ms, Ordering::AcqRel);
        previous.max(target_ms)
    }

    /// Has at least `interval_ms` passed since `reference_ms`?
    pub fn has_elapsed(&self, reference_ms: u64, interval_ms: u64) -> bool {
        self.now_ms().saturating_sub(reference_ms) >= interval_ms
    }
}

/// Fixed-cadence task bookkeeping: one "last fired" reference per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicTask {
    interval_ms: u64,
    last_fired_ms: u64,
}

impl PeriodicTask {
    pub fn new(interval_ms: u64) -> Self {
        Self::starting_at(interval_ms, 0)
    }

    pub fn starting_at(interval_ms: u64, reference_ms: u64) -> Self {
        debug_assert!(interval_ms > 0, "periodic task interval must be positive");
        Self {
            interval_ms,
            last_fired_ms: reference_ms,
        }
    }

    /// Returns the elapsed interval if the task is due at `now_ms`, and moves
    /// the reference to `now_ms`.
    pub fn poll(&mut self, now_ms: u64) -> Option<u64> {
        let dt = now_ms.saturating_sub(self.last_fired_ms);
        if dt >= self.interval_ms {
            self.last_fired_ms = now_ms;
            Some(dt)
        } else {
            None
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn last_fired_ms(&self) -> u64 {
        self.last_fired_ms
    }
}

/// Wall-clock source scaled into virtual milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    started: Instant,
    time_scale: f64,
}

impl WallClock {
    /// `time_scale` is simulated milliseconds per wall millisecond.
    pub fn start(time_scale: f64) -> Self {
        Self {
            started: Instant::now(),
            time_scale,
        }
    }

    pub fn virtual_now_ms(&self) -> u64 {
        let wall_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        (wall_ms * self.time_scale) as u64
    }
}

/// Cadence of every periodic task, in simulated milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskIntervals {
    pub aircraft_ms: u64,
    pub charger_ms: u64,
    pub fault_service_ms: u64,
    pub telemetry_ms: u64,
}

impl Default for TaskIntervals {
    fn default() -> Self {
        Self {
            aircraft_ms: DEFAULT_AIRCRAFT_INTERVAL_MS,
            charger_ms: DEFAULT_CHARGER_INTERVAL_MS,
            fault_service_ms: DEFAULT_FAULT_SERVICE_INTERVAL_MS,
            telemetry_ms: DEFAULT_TELEMETRY_INTERVAL_MS,
        }
    }
}

impl TaskIntervals {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.aircraft_ms == 0
            || self.charger_ms == 0
            || self.fault_service_ms == 0
            || self.telemetry_ms == 0
        {
            return Err("task intervals must be positive");
        }
        // Chargers are serviced more often than aircraft tick.
        if self.charger_ms >= self.aircraft_ms {
            return Err("charger interval must be shorter than the aircraft interval");
        }
        Ok(())
    }
}
