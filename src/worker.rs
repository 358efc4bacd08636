//! Per-aircraft worker: one independently scheduled unit of execution that
//! ticks its aircraft against the shared virtual clock.

use crate::charge_queue::ChargeQueue;
use crate::clock::{PeriodicTask, VirtualClock};
use crate::fleet::{AircraftId, AircraftStatus, FleetSlot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, trace};

#[derive(Debug)]
pub struct AircraftWorker {
    id: AircraftId,
    slot: FleetSlot,
    queue: Arc<ChargeQueue>,
    clock: VirtualClock,
    task: PeriodicTask,
    terminate: Arc<AtomicBool>,
    ticks: u64,
}

impl AircraftWorker {
    pub fn new(
        slot: FleetSlot,
        queue: Arc<ChargeQueue>,
        clock: VirtualClock,
        interval_ms: u64,
        terminate: Arc<AtomicBool>,
    ) -> Self {
        let id = slot.lock().id();
        let task = PeriodicTask::starting_at(interval_ms, clock.now_ms());
        Self {
            id,
            slot,
            queue,
            clock,
            task,
            terminate,
            ticks: 0,
        }
    }

    pub fn id(&self) -> AircraftId {
        self.id
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Standby -> InFlight.
    pub fn start(&self) -> bool {
        self.slot.lock().start()
    }

    /// Run one tick if the aircraft interval has elapsed. Returns whether a
    /// tick ran.
    pub fn poll(&mut self) -> bool {
        match self.task.poll(self.clock.now_ms()) {
            Some(dt_ms) => {
                self.tick(dt_ms);
                true
            }
            None => false,
        }
    }

    /// One complete tick. Lock order is aircraft, then signal cell, then queue.
    pub fn tick(&mut self, dt_ms: u64) {
        let mut aircraft = self.slot.lock();
        let mut signals = self.slot.signals().lock();

        let charge = signals.charge;
        let request = aircraft.tick(dt_ms, charge, &mut signals.fault);

        match aircraft.status() {
            AircraftStatus::InChargeQueue => {}
            AircraftStatus::Charging => {
                signals.cancel_wait();
                signals.acknowledge_grant();
            }
            _ => signals.cancel_wait(),
        }

        if let Some(request) = request {
            // Enqueue and register the ticket atomically with respect to the
            // charger manager, which needs the cell lock to grant.
            let ticket = self.queue.enqueue(request);
            signals.await_grant(ticket);
            debug!(
                aircraft = self.id.0,
                ticket,
                duration_ms = request.requested_duration_ms,
                "charge request queued"
            );
        }

        self.ticks += 1;
        trace!(aircraft = self.id.0, dt_ms, status = ?aircraft.status(), "aircraft tick");
    }

    /// Cooperative polling loop. Exits after the current tick once the
    /// termination flag is set.
    pub async fn run(mut self, poll_period: Duration) -> AircraftId {
        self.start();
        let mut interval = time::interval(poll_period);
        loop {
            interval.tick().await;
            self.poll();
            if self.terminate.load(Ordering::Acquire) {
                break;
            }
        }
        debug!(aircraft = self.id.0, ticks = self.ticks, "worker stopped");
        self.id
    }
}
