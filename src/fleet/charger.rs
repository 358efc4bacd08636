use super::{AircraftId, ChargerId, SignalBoard};
use crate::charge_queue::ChargeQueue;
use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const CHARGER_COUNT: usize = 3;
const MAX_EVENTS_PER_TICK: usize = 2 * CHARGER_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargerStatus {
    OutOfService,
    Ready,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargerEvent {
    Completed { charger: ChargerId, aircraft: AircraftId },
    Preempted { charger: ChargerId, aircraft: AircraftId },
    Assigned { charger: ChargerId, aircraft: AircraftId, duration_ms: u64 },
}

pub type ChargerEvents = ArrayVec<ChargerEvent, MAX_EVENTS_PER_TICK>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charger {
    id: ChargerId,
    status: ChargerStatus,
    remaining_ms: u64,
    current_aircraft: Option<AircraftId>,
    cumulative_use_ms: u64,
    assignment_history: Vec<AircraftId>,
}

impl Charger {
    fn new(id: ChargerId) -> Self {
        Self {
            id,
            status: ChargerStatus::Ready,
            remaining_ms: 0,
            current_aircraft: None,
            cumulative_use_ms: 0,
            assignment_history: Vec::new(),
        }
    }

    fn assign(&mut self, aircraft: AircraftId, duration_ms: u64) {
        debug_assert_eq!(self.status, ChargerStatus::Ready, "charger {} double-assigned", self.id.get());
        self.status = ChargerStatus::Busy;
        self.remaining_ms = duration_ms;
        self.current_aircraft = Some(aircraft);
        self.assignment_history.push(aircraft);
    }

    fn release(&mut self) -> Option<AircraftId> {
        self.status = ChargerStatus::Ready;
        self.remaining_ms = 0;
        self.current_aircraft.take()
    }

    pub fn id(&self) -> ChargerId {
        self.id
    }

    pub fn status(&self) -> ChargerStatus {
        self.status
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn current_aircraft(&self) -> Option<AircraftId> {
        self.current_aircraft
    }

    pub fn cumulative_use_ms(&self) -> u64 {
        self.cumulative_use_ms
    }

    pub fn assignment_history(&self) -> &[AircraftId] {
        &self.assignment_history
    }
}

/// Exclusive owner of the chargers. Aircraft only ever see their own grant.
#[derive(Debug, Clone)]
pub struct ChargerManager {
    chargers: [Charger; CHARGER_COUNT],
}

impl ChargerManager {
    pub fn new() -> Self {
        Self {
            chargers: std::array::from_fn(|index| Charger::new(ChargerId(index as u8 + 1))),
        }
    }

    /// One manager tick: every release is resolved before any assignment, so a
    /// charger freed now can be reused now but is never double-assigned.
    pub fn tick(&mut self, dt_ms: u64, queue: &ChargeQueue, board: &SignalBoard) -> ChargerEvents {
        let mut events = ChargerEvents::new();
        self.release_pass(dt_ms, board, &mut events);
        self.assign_pass(queue, board, &mut events);

        debug_assert!(self.busy_count() <= CHARGER_COUNT);
        events
    }

    fn release_pass(&mut self, dt_ms: u64, board: &SignalBoard, events: &mut ChargerEvents) {
        for charger in &mut self.chargers {
            if charger.status != ChargerStatus::Busy {
                continue;
            }
            let Some(aircraft) = charger.current_aircraft else {
                warn!(charger = charger.id.get(), "busy charger without aircraft, resetting");
                charger.release();
                continue;
            };
            let Some(cell) = board.get(aircraft) else {
                warn!(charger = charger.id.get(), aircraft = aircraft.0, "charger held by unknown aircraft");
                charger.release();
                continue;
            };

            let mut signals = cell.lock();
            let preempted = signals.take_preemption();
            charger.remaining_ms = charger.remaining_ms.saturating_sub(dt_ms);

            if preempted {
                signals.revoke_grant();
                charger.release();
                info!(charger = charger.id.get(), aircraft = aircraft.0, "charger preempted by fault");
                let _ = events.try_push(ChargerEvent::Preempted { charger: charger.id, aircraft });
            } else if charger.remaining_ms == 0 && signals.grant_acknowledged() {
                signals.revoke_grant();
                charger.release();
                debug!(charger = charger.id.get(), aircraft = aircraft.0, "charge session complete");
                let _ = events.try_push(ChargerEvent::Completed { charger: charger.id, aircraft });
            } else if charger.remaining_ms > 0 {
                charger.cumulative_use_ms += dt_ms;
            }
        }
    }

    fn assign_pass(&mut self, queue: &ChargeQueue, board: &SignalBoard, events: &mut ChargerEvents) {
        for charger in &mut self.chargers {
            if charger.status != ChargerStatus::Ready {
                continue;
            }
            // Pop until a request whose aircraft is still waiting turns up.
            loop {
                let Some(entry) = queue.pop() else {
                    return;
                };
                let aircraft = entry.request.aircraft;
                let granted = board
                    .get(aircraft)
                    .is_some_and(|cell| cell.lock().grant(charger.id, entry.ticket));
                if !granted {
                    queue.note_stale();
                    debug!(aircraft = aircraft.0, ticket = entry.ticket, "discarding stale charge request");
                    continue;
                }

                let duration_ms = entry.request.requested_duration_ms;
                charger.assign(aircraft, duration_ms);
                debug!(charger = charger.id.get(), aircraft = aircraft.0, duration_ms, "charger assigned");
                let _ = events.try_push(ChargerEvent::Assigned {
                    charger: charger.id,
                    aircraft,
                    duration_ms,
                });
                break;
            }
        }
    }

    pub fn take_out_of_service(&mut self, id: ChargerId) -> Result<(), &'static str> {
        let charger = &mut self.chargers[id.index()];
        match charger.status {
            ChargerStatus::Ready => {
                charger.status = ChargerStatus::OutOfService;
                info!(charger = id.get(), "charger out of service");
                Ok(())
            }
            ChargerStatus::Busy => Err("Charger is busy"),
            ChargerStatus::OutOfService => Err("Charger already out of service"),
        }
    }

    pub fn return_to_service(&mut self, id: ChargerId) -> Result<(), &'static str> {
        let charger = &mut self.chargers[id.index()];
        if charger.status != ChargerStatus::OutOfService {
            return Err("Charger is in service");
        }
        charger.status = ChargerStatus::Ready;
        info!(charger = id.get(), "charger back in service");
        Ok(())
    }

    pub fn charger(&self, id: ChargerId) -> &Charger {
        &self.chargers[id.index()]
    }

    pub fn chargers(&self) -> &[Charger] {
        &self.chargers
    }

    pub fn busy_count(&self) -> usize {
        self.chargers
            .iter()
            .filter(|c| c.status == ChargerStatus::Busy)
            .count()
    }
}

impl Default for ChargerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charge_queue::ChargeRequest;
    use crate::fleet::{Company, Fleet, ParameterTable};
    use crate::signals::FaultSignal;

    fn fleet_of(n: usize) -> Fleet {
        Fleet::from_companies(std::iter::repeat(Company::Bravo).take(n), &ParameterTable::default()).unwrap()
    }

    fn queue_request(fleet: &Fleet, queue: &ChargeQueue, id: usize, duration_ms: u64) {
        let ticket = queue.enqueue(ChargeRequest {
            aircraft: AircraftId(id),
            requested_duration_ms: duration_ms,
        });
        fleet.board().get(AircraftId(id)).unwrap().lock().await_grant(ticket);
    }

    fn acknowledge(fleet: &Fleet, id: usize) {
        fleet.board().get(AircraftId(id)).unwrap().lock().acknowledge_grant();
    }

    fn charger(n: u8) -> ChargerId {
        ChargerId::new(n).unwrap()
    }

    #[test]
    fn test_chargers_start_ready() {
        let manager = ChargerManager::new();
        assert_eq!(manager.chargers().len(), CHARGER_COUNT);
        assert!(manager.chargers().iter().all(|c| c.status() == ChargerStatus::Ready));
        assert_eq!(manager.charger(charger(2)).id(), charger(2));
    }

    #[test]
    fn test_four_requests_three_chargers_fifo() {
        let fleet = fleet_of(4);
        let queue = ChargeQueue::new();
        for id in [2, 0, 3, 1] {
            queue_request(&fleet, &queue, id, 10_000);
        }

        let mut manager = ChargerManager::new();
        let events = manager.tick(1000, &queue, fleet.board());
        assert_eq!(events.len(), 3);

        assert_eq!(manager.charger(charger(1)).current_aircraft(), Some(AircraftId(2)));
        assert_eq!(manager.charger(charger(2)).current_aircraft(), Some(AircraftId(0)));
        assert_eq!(manager.charger(charger(3)).current_aircraft(), Some(AircraftId(3)));
        assert_eq!(manager.busy_count(), 3);
        assert_eq!(queue.pending_aircraft(), vec![AircraftId(1)]);
        assert_eq!(fleet.board().get(AircraftId(1)).unwrap().charge(), None);
    }

    #[test]
    fn test_completion_releases_and_reassigns_same_tick() {
        let fleet = fleet_of(4);
        let queue = ChargeQueue::new();
        queue_request(&fleet, &queue, 0, 2000);
        queue_request(&fleet, &queue, 1, 10_000);
        queue_request(&fleet, &queue, 2, 10_000);
        queue_request(&fleet, &queue, 3, 10_000);

        let mut manager = ChargerManager::new();
        manager.tick(1000, &queue, fleet.board());
        for id in 0..3 {
            acknowledge(&fleet, id);
        }

        manager.tick(1000, &queue, fleet.board());
        assert_eq!(manager.charger(charger(1)).remaining_ms(), 1000);
        assert_eq!(manager.charger(charger(1)).cumulative_use_ms(), 1000);

        let events = manager.tick(1000, &queue, fleet.board());
        assert!(events.contains(&ChargerEvent::Completed {
            charger: charger(1),
            aircraft: AircraftId(0)
        }));
        assert!(events.contains(&ChargerEvent::Assigned {
            charger: charger(1),
            aircraft: AircraftId(3),
            duration_ms: 10_000
        }));
        assert_eq!(fleet.board().get(AircraftId(0)).unwrap().charge(), None);
        assert_eq!(fleet.board().get(AircraftId(3)).unwrap().charge(), Some(charger(1)));
        assert_eq!(manager.charger(charger(1)).assignment_history(), &[AircraftId(0), AircraftId(3)]);
    }

    #[test]
    fn test_unacknowledged_grant_is_held() {
        let fleet = fleet_of(1);
        let queue = ChargeQueue::new();
        queue_request(&fleet, &queue, 0, 0);

        let mut manager = ChargerManager::new();
        manager.tick(1000, &queue, fleet.board());
        manager.tick(1000, &queue, fleet.board());
        // Aircraft has not picked up the grant yet
        assert_eq!(manager.charger(charger(1)).status(), ChargerStatus::Busy);
        assert_eq!(fleet.board().get(AircraftId(0)).unwrap().charge(), Some(charger(1)));

        acknowledge(&fleet, 0);
        manager.tick(1000, &queue, fleet.board());
        assert_eq!(manager.charger(charger(1)).status(), ChargerStatus::Ready);
    }

    #[test]
    fn test_preemption_releases_within_one_tick() {
        let fleet = fleet_of(1);
        let queue = ChargeQueue::new();
        queue_request(&fleet, &queue, 0, 3_600_000);

        let mut manager = ChargerManager::new();
        manager.tick(1000, &queue, fleet.board());
        acknowledge(&fleet, 0);

        let cell = fleet.board().get(AircraftId(0)).unwrap();
        cell.lock().fault = FaultSignal::TriggeredDuringCharging;

        let events = manager.tick(1000, &queue, fleet.board());
        assert_eq!(
            events.as_slice(),
            &[ChargerEvent::Preempted { charger: charger(1), aircraft: AircraftId(0) }]
        );
        assert_eq!(manager.charger(charger(1)).status(), ChargerStatus::Ready);
        assert_eq!(cell.fault(), FaultSignal::Clear);
        assert_eq!(cell.charge(), None);
    }

    #[test]
    fn test_stale_request_is_skipped() {
        let fleet = fleet_of(2);
        let queue = ChargeQueue::new();
        queue_request(&fleet, &queue, 0, 5000);
        queue_request(&fleet, &queue, 1, 5000);
        // Aircraft 0 went to maintenance while queued
        fleet.board().get(AircraftId(0)).unwrap().lock().cancel_wait();

        let mut manager = ChargerManager::new();
        manager.tick(1000, &queue, fleet.board());
        assert_eq!(manager.charger(charger(1)).current_aircraft(), Some(AircraftId(1)));
        assert_eq!(manager.busy_count(), 1);
        assert_eq!(queue.stats().stale_discarded, 1);
    }

    #[test]
    fn test_out_of_service_charger_is_skipped() {
        let fleet = fleet_of(1);
        let queue = ChargeQueue::new();
        queue_request(&fleet, &queue, 0, 5000);

        let mut manager = ChargerManager::new();
        manager.take_out_of_service(charger(1)).unwrap();
        assert!(manager.take_out_of_service(charger(1)).is_err());

        manager.tick(1000, &queue, fleet.board());
        assert_eq!(manager.charger(charger(1)).status(), ChargerStatus::OutOfService);
        assert_eq!(manager.charger(charger(2)).current_aircraft(), Some(AircraftId(0)));
        assert!(manager.take_out_of_service(charger(2)).is_err());

        manager.return_to_service(charger(1)).unwrap();
        assert!(manager.return_to_service(charger(1)).is_err());
    }
}
