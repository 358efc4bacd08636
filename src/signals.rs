//! Per-aircraft signal cells.
//!
//! A cell is the only state an aircraft worker shares with the rest of the
//! simulation. Producer/consumer roles are fixed:
//!
//! - `fault`: raised by the fault service, consumed (cleared or escalated) by
//!   the aircraft worker, and a `TriggeredDuringCharging` escalation is consumed
//!   by the charger manager.
//! - `charge`: written by the charger manager, read by the aircraft worker,
//!   which acknowledges a grant once it has started charging on it.
//!
//! Every access goes through the cell's mutex, so each read-modify-write is
//! serialized with respect to the other actors.

use crate::fleet::ChargerId;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultSignal {
    #[default]
    Clear,
    Triggered,
    /// Escalated by the aircraft: its charger must be released immediately.
    TriggeredDuringCharging,
}

impl FaultSignal {
    pub fn is_triggered(self) -> bool {
        self == FaultSignal::Triggered
    }
}

/// Outcome of raising a fault on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultDelivery {
    Raised,
    /// A preemption is still pending; the fault surfaces once it is consumed.
    Latched,
    /// An earlier fault has not been consumed yet; the two collapse into one.
    Coalesced,
}

#[derive(Debug, Default)]
pub struct SignalState {
    pub fault: FaultSignal,
    pub charge: Option<ChargerId>,
    awaiting_ticket: Option<u64>,
    acknowledged: bool,
    retrigger_pending: bool,
}

impl SignalState {
    pub fn raise_fault(&mut self) -> FaultDelivery {
        match self.fault {
            FaultSignal::Clear => {
                self.fault = FaultSignal::Triggered;
                FaultDelivery::Raised
            }
            FaultSignal::Triggered => FaultDelivery::Coalesced,
            FaultSignal::TriggeredDuringCharging => {
                if self.retrigger_pending {
                    FaultDelivery::Coalesced
                } else {
                    self.retrigger_pending = true;
                    FaultDelivery::Latched
                }
            }
        }
    }

    /// Consume a pending charging preemption. Returns whether one was pending.
    pub fn take_preemption(&mut self) -> bool {
        if self.fault != FaultSignal::TriggeredDuringCharging {
            return false;
        }
        self.fault = if self.retrigger_pending {
            FaultSignal::Triggered
        } else {
            FaultSignal::Clear
        };
        self.retrigger_pending = false;
        true
    }

    /// Record the ticket of the request the aircraft is now waiting on.
    pub fn await_grant(&mut self, ticket: u64) {
        self.awaiting_ticket = Some(ticket);
    }

    pub fn cancel_wait(&mut self) {
        self.awaiting_ticket = None;
    }

    pub fn awaiting_ticket(&self) -> Option<u64> {
        self.awaiting_ticket
    }

    /// Grant `charger` if `ticket` is the request this aircraft still waits on.
    pub fn grant(&mut self, charger: ChargerId, ticket: u64) -> bool {
        if self.awaiting_ticket != Some(ticket) {
            return false;
        }
        self.awaiting_ticket = None;
        self.charge = Some(charger);
        self.acknowledged = false;
        true
    }

    /// The aircraft has started charging on its grant.
    pub fn acknowledge_grant(&mut self) {
        if self.charge.is_some() {
            self.acknowledged = true;
        }
    }

    pub fn grant_acknowledged(&self) -> bool {
        self.acknowledged
    }

    pub fn revoke_grant(&mut self) {
        self.charge = None;
        self.acknowledged = false;
    }
}

#[derive(Debug, Default)]
pub struct SignalCell {
    state: Mutex<SignalState>,
}

impl SignalCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access to the cell. A poisoned lock is recovered: every write
    /// to the state is a single assignment, so it is never left half-updated.
    pub fn lock(&self) -> MutexGuard<'_, SignalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fault(&self) -> FaultSignal {
        self.lock().fault
    }

    pub fn charge(&self) -> Option<ChargerId> {
        self.lock().charge
    }

    pub fn raise_fault(&self) -> FaultDelivery {
        self.lock().raise_fault()
    }
}
