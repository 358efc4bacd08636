use crate::charge_queue::ChargeQueue;
use crate::clock::{PeriodicTask, TaskIntervals, VirtualClock, WallClock};
use crate::config::{ConfigError, SimulationConfig};
use crate::fault_injection::FaultInjector;
use crate::fleet::{ChargerEvents, ChargerManager, Fleet};
use crate::rng::SimRng;
use crate::scheduler::{FaultService, ScheduleStats, ScheduledFault};
use crate::summary::FleetSummary;
use crate::telemetry::{TelemetryFrame, TelemetryRecorder, TelemetrySink, TelemetryStats};
use crate::worker::AircraftWorker;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("telemetry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("aircraft worker failed: {0}")]
    Worker(#[from] JoinError),
}

/// What the driver did in one poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverActivity {
    pub charger_events: ChargerEvents,
    pub fault: Option<ScheduledFault>,
    pub telemetry_written: bool,
}

/// Charger manager, fault service and telemetry sampling, each on its own
/// cadence over the shared clock.
#[derive(Debug)]
pub struct SimulationDriver {
    chargers: ChargerManager,
    charger_task: PeriodicTask,
    faults: FaultService,
    fault_task: PeriodicTask,
    telemetry: TelemetryRecorder,
    telemetry_task: PeriodicTask,
}

impl SimulationDriver {
    pub fn new(intervals: &TaskIntervals, faults: FaultService, telemetry: TelemetryRecorder) -> Self {
        Self {
            chargers: ChargerManager::new(),
            charger_task: PeriodicTask::new(intervals.charger_ms),
            faults,
            fault_task: PeriodicTask::new(intervals.fault_service_ms),
            telemetry,
            telemetry_task: PeriodicTask::new(intervals.telemetry_ms),
        }
    }

    /// Run every task that is due at `now_ms`, in the order chargers, fault
    /// service, telemetry.
    pub fn poll(&mut self, now_ms: u64, queue: &ChargeQueue, fleet: &Fleet) -> DriverActivity {
        let mut activity = DriverActivity::default();

        if let Some(dt_ms) = self.charger_task.poll(now_ms) {
            activity.charger_events = self.chargers.tick(dt_ms, queue, fleet.board());
        }
        if self.fault_task.poll(now_ms).is_some() {
            activity.fault = self.faults.poll(now_ms, fleet.board());
        }
        if self.telemetry_task.poll(now_ms).is_some() {
            activity.telemetry_written = self.record_frame(now_ms, fleet);
        }
        activity
    }

    pub fn record_frame(&mut self, now_ms: u64, fleet: &Fleet) -> bool {
        self.telemetry.record(&TelemetryFrame::new(now_ms, fleet.snapshots()))
    }

    pub fn flush_telemetry(&mut self) {
        self.telemetry.flush();
    }

    pub fn chargers(&self) -> &ChargerManager {
        &self.chargers
    }

    pub fn chargers_mut(&mut self) -> &mut ChargerManager {
        &mut self.chargers
    }

    pub fn fault_service(&self) -> &FaultService {
        &self.faults
    }

    pub fn telemetry_stats(&self) -> &TelemetryStats {
        self.telemetry.stats()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub elapsed_ms: u64,
    pub summary: FleetSummary,
    pub schedule: ScheduleStats,
    pub telemetry: TelemetryStats,
}

/// A fully wired simulation: fleet, workers, queue and driver over one clock.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    seed: u64,
    clock: VirtualClock,
    fleet: Fleet,
    queue: Arc<ChargeQueue>,
    driver: SimulationDriver,
    workers: Vec<AircraftWorker>,
    terminate: Arc<AtomicBool>,
    started: bool,
}

impl Simulation {
    pub fn new(config: SimulationConfig, sink: Box<dyn TelemetrySink>) -> Result<Self, SimError> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(SimRng::entropy_seed);
        let mut rng = SimRng::new(seed);
        let fleet = Fleet::create(config.fleet_size, &config.companies, &mut rng)?;

        let mut injector = FaultInjector::new_with_config(config.faults.clone());
        let schedule = injector.generate(&fleet, config.horizon_ms(), &mut rng)?;

        let clock = VirtualClock::new();
        let queue = Arc::new(ChargeQueue::new());
        let terminate = Arc::new(AtomicBool::new(false));
        let workers = fleet
            .slots()
            .iter()
            .map(|slot| {
                AircraftWorker::new(
                    slot.clone(),
                    Arc::clone(&queue),
                    clock.clone(),
                    config.intervals.aircraft_ms,
                    Arc::clone(&terminate),
                )
            })
            .collect();

        let driver = SimulationDriver::new(
            &config.intervals,
            FaultService::new(schedule),
            TelemetryRecorder::new(sink),
        );

        info!(
            seed,
            aircraft = fleet.len(),
            horizon_hours = config.horizon_hours,
            faults_scheduled = injector.stats().total_faults_scheduled,
            "simulation initialized"
        );

        Ok(Self {
            config,
            seed,
            clock,
            fleet,
            queue,
            driver,
            workers,
            terminate,
            started: false,
        })
    }

    fn start_fleet(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        for worker in &self.workers {
            worker.start();
        }
    }

    /// Deterministic single-threaded step: advance the clock, poll every worker
    /// in id order, then poll the driver.
    pub fn step(&mut self, dt_ms: u64) -> DriverActivity {
        self.start_fleet();
        let now_ms = self.clock.advance(dt_ms);
        for worker in &mut self.workers {
            worker.poll();
        }
        self.driver.poll(now_ms, &self.queue, &self.fleet)
    }

    /// Step until the configured horizon is reached. A zero step falls back to
    /// the charger interval.
    pub fn run_stepped(&mut self, dt_ms: u64) -> SimulationReport {
        let horizon_ms = self.config.horizon_ms();
        let step_ms = if dt_ms == 0 { self.config.intervals.charger_ms } else { dt_ms };
        while self.clock.now_ms() < horizon_ms {
            self.step(step_ms.min(horizon_ms - self.clock.now_ms()));
        }
        self.finish();
        self.report()
    }

    /// Real-time run: one tokio task per aircraft, driver on this task, virtual
    /// time derived from the wall clock until the horizon.
    pub async fn run(mut self) -> Result<SimulationReport, SimError> {
        let horizon_ms = self.config.horizon_ms();
        let poll_period = Duration::from_millis(self.config.poll_period_ms);

        info!(
            horizon_ms,
            time_scale = self.config.time_scale,
            "simulation starting"
        );

        self.started = true;
        let handles: Vec<_> = self
            .workers
            .drain(..)
            .map(|worker| tokio::spawn(worker.run(poll_period)))
            .collect();

        let base_ms = self.clock.now_ms();
        let wall = WallClock::start(self.config.time_scale);
        let mut interval = time::interval(poll_period);
        loop {
            interval.tick().await;
            let now_ms = self.clock.advance_to((base_ms + wall.virtual_now_ms()).min(horizon_ms));
            self.driver.poll(now_ms, &self.queue, &self.fleet);
            if now_ms >= horizon_ms {
                break;
            }
        }

        self.terminate.store(true, Ordering::Release);
        for handle in handles {
            let id = handle.await?;
            debug!(aircraft = id.0, "worker joined");
        }

        self.finish();
        let report = self.report();
        info!(
            elapsed_ms = report.elapsed_ms,
            faults_delivered = report.summary.faults_delivered,
            frames = report.telemetry.frames_written,
            "simulation complete"
        );
        Ok(report)
    }

    fn finish(&mut self) {
        let now_ms = self.clock.now_ms();
        self.driver.record_frame(now_ms, &self.fleet);
        self.driver.flush_telemetry();
    }

    pub fn report(&self) -> SimulationReport {
        let summary = FleetSummary::collect(
            self.clock.now_ms(),
            &self.fleet.snapshots(),
            self.driver.chargers().chargers(),
            self.queue.stats(),
            self.driver.fault_service().log().total_delivered(),
        );
        SimulationReport {
            seed: self.seed,
            elapsed_ms: self.clock.now_ms(),
            summary,
            schedule: *self.driver.fault_service().schedule().stats(),
            telemetry: *self.driver.telemetry_stats(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn queue(&self) -> &ChargeQueue {
        &self.queue
    }

    pub fn driver(&self) -> &SimulationDriver {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut SimulationDriver {
        &mut self.driver
    }
}
