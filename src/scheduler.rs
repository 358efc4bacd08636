//! Time-ordered fault schedule and the periodic service that delivers it.

use crate::fault::FaultLog;
use crate::fleet::{AircraftId, SignalBoard};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduledFault {
    pub time_ms: u64,
    pub aircraft: AircraftId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ScheduleStats {
    pub total_scheduled: u32,
    pub total_delivered: u32,
    pub currently_scheduled: u32,
}

/// Faults ordered by time, ties broken by ascending aircraft id. Entries are
/// only ever removed from the front.
#[derive(Debug, Clone, Default)]
pub struct FaultSchedule {
    entries: VecDeque<ScheduledFault>,
    stats: ScheduleStats,
}

impl FaultSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(mut entries: Vec<ScheduledFault>) -> Self {
        // (time_ms, aircraft) ordering is the tie-break policy
        entries.sort_unstable();
        let count = entries.len() as u32;
        Self {
            entries: entries.into(),
            stats: ScheduleStats {
                total_scheduled: count,
                total_delivered: 0,
                currently_scheduled: count,
            },
        }
    }

    /// Earliest remaining entry, without consuming it.
    pub fn peek(&self) -> Option<&ScheduledFault> {
        self.entries.front()
    }

    /// Remove the earliest entry if it is due at `now_ms`. Only the head is
    /// inspected, so at most one entry is returned per call.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<ScheduledFault> {
        if self.entries.front()?.time_ms > now_ms {
            return None;
        }
        let entry = self.entries.pop_front()?;
        self.stats.total_delivered += 1;
        self.stats.currently_scheduled = self.entries.len() as u32;
        Some(entry)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ScheduledFault> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &ScheduleStats {
        &self.stats
    }
}

/// Delivers due schedule entries as fault signals, one per poll.
#[derive(Debug, Default)]
pub struct FaultService {
    schedule: FaultSchedule,
    log: FaultLog,
}

impl FaultService {
    pub fn new(schedule: FaultSchedule) -> Self {
        Self {
            schedule,
            log: FaultLog::new(),
        }
    }

    pub fn poll(&mut self, now_ms: u64, board: &SignalBoard) -> Option<ScheduledFault> {
        let entry = self.schedule.pop_due(now_ms)?;
        let Some(cell) = board.get(entry.aircraft) else {
            warn!(aircraft = entry.aircraft.0, "fault scheduled for unknown aircraft");
            return Some(entry);
        };

        let delivery = cell.raise_fault();
        let fault_id = self.log.record_delivery(entry.aircraft, entry.time_ms, now_ms, delivery.into());
        info!(
            fault_id,
            aircraft = entry.aircraft.0,
            scheduled_ms = entry.time_ms,
            now_ms,
            delivery = ?delivery,
            "fault delivered"
        );
        Some(entry)
    }

    pub fn schedule(&self) -> &FaultSchedule {
        &self.schedule
    }

    pub fn log(&self) -> &FaultLog {
        &self.log
    }
}
