//! FIFO charge queue: many aircraft workers append, the charger manager drains.

use crate::fleet::AircraftId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub aircraft: AircraftId,
    pub requested_duration_ms: u64,
}

/// A request together with the ticket issued when it was enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRequest {
    pub ticket: u64,
    pub request: ChargeRequest,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub total_enqueued: u64,
    pub total_dequeued: u64,
    pub stale_discarded: u64,
    pub peak_depth: usize,
}

#[derive(Debug, Default)]
struct QueueInner {
    entries: VecDeque<QueuedRequest>,
    next_ticket: u64,
    stats: QueueStats,
}

#[derive(Debug, Default)]
pub struct ChargeQueue {
    inner: Mutex<QueueInner>,
}

impl ChargeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a request and return its ticket. Tickets increase strictly in
    /// enqueue order.
    pub fn enqueue(&self, request: ChargeRequest) -> u64 {
        let mut inner = self.lock();
        let ticket = inner.next_ticket;
        inner.next_ticket += 1;
        inner.entries.push_back(QueuedRequest { ticket, request });
        inner.stats.total_enqueued += 1;
        inner.stats.peak_depth = inner.stats.peak_depth.max(inner.entries.len());
        ticket
    }

    /// Remove the earliest-queued request.
    pub fn pop(&self) -> Option<QueuedRequest> {
        let mut inner = self.lock();
        let entry = inner.entries.pop_front();
        if entry.is_some() {
            inner.stats.total_dequeued += 1;
        }
        entry
    }

    /// Account for a dequeued request whose aircraft was no longer waiting.
    pub fn note_stale(&self) {
        self.lock().stats.stale_discarded += 1;
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Aircraft ids in queue order.
    pub fn pending_aircraft(&self) -> Vec<AircraftId> {
        self.lock().entries.iter().map(|e| e.request.aircraft).collect()
    }

    pub fn stats(&self) -> QueueStats {
        self.lock().stats
    }
}
