use crate::fleet::AircraftId;
use crate::signals::FaultDelivery;
use heapless::Vec;
use serde::{Deserialize, Serialize};

const MAX_FAULT_HISTORY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryOutcome {
    Raised,
    Latched,
    Coalesced,
}

impl From<FaultDelivery> for DeliveryOutcome {
    fn from(delivery: FaultDelivery) -> Self {
        match delivery {
            FaultDelivery::Raised => DeliveryOutcome::Raised,
            FaultDelivery::Latched => DeliveryOutcome::Latched,
            FaultDelivery::Coalesced => DeliveryOutcome::Coalesced,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FaultRecord {
    pub id: u32,
    pub aircraft: AircraftId,
    pub scheduled_ms: u64,
    pub delivered_ms: u64,
    pub outcome: DeliveryOutcome,
}

/// Most recent fault deliveries plus running totals.
#[derive(Debug)]
pub struct FaultLog {
    history: Vec<FaultRecord, MAX_FAULT_HISTORY>,
    next_fault_id: u32,
    total_delivered: u32,
    total_coalesced: u32,
}

impl FaultLog {
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
            next_fault_id: 1,
            total_delivered: 0,
            total_coalesced: 0,
        }
    }

    pub fn record_delivery(
        &mut self,
        aircraft: AircraftId,
        scheduled_ms: u64,
        delivered_ms: u64,
        outcome: DeliveryOutcome,
    ) -> u32 {
        let fault_id = self.next_fault_id;
        self.next_fault_id = self.next_fault_id.wrapping_add(1);
        self.total_delivered += 1;
        if outcome == DeliveryOutcome::Coalesced {
            self.total_coalesced += 1;
        }

        if self.history.is_full() {
            self.history.remove(0);
        }
        let _ = self.history.push(FaultRecord {
            id: fault_id,
            aircraft,
            scheduled_ms,
            delivered_ms,
            outcome,
        });
        fault_id
    }

    pub fn recent(&self) -> &[FaultRecord] {
        &self.history
    }

    pub fn for_aircraft(&self, aircraft: AircraftId) -> impl Iterator<Item = &FaultRecord> {
        self.history.iter().filter(move |r| r.aircraft == aircraft)
    }

    pub fn total_delivered(&self) -> u32 {
        self.total_delivered
    }

    pub fn total_coalesced(&self) -> u32 {
        self.total_coalesced
    }
}

impl Default for FaultLog {
    fn default() -> Self {
        Self::new()
    }
}
