use super::{AircraftId, ChargerId, Company, CompanyParams, ParameterTable};
use crate::charge_queue::ChargeRequest;
use crate::clock::{minutes_to_ms, ms_to_hours, MS_PER_MINUTE};
use crate::config::ConfigError;
use crate::signals::FaultSignal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const CHARGE_THRESHOLD_PERCENT: f64 = 10.0;
pub const FULL_CHARGE_PERCENT: f64 = 100.0;
pub const MAINTENANCE_DURATION_MS: u64 = 30 * MS_PER_MINUTE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AircraftStatus {
    Standby,
    InFlight,
    InChargeQueue,
    Charging,
    UnderMaintenance,
    /// Reserved; no transition enters it.
    Suspended,
}

impl AircraftStatus {
    /// Telemetry status code.
    pub fn code(self) -> i8 {
        match self {
            AircraftStatus::Standby => -1,
            AircraftStatus::InFlight => 0,
            AircraftStatus::InChargeQueue => 1,
            AircraftStatus::Charging => 2,
            AircraftStatus::UnderMaintenance => 3,
            AircraftStatus::Suspended => 4,
        }
    }
}

/// Where maintenance was entered from, and therefore where it resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResumeTarget {
    InFlight,
    InChargeQueue,
    Charging,
}

impl ResumeTarget {
    pub fn status(self) -> AircraftStatus {
        match self {
            ResumeTarget::InFlight => AircraftStatus::InFlight,
            ResumeTarget::InChargeQueue => AircraftStatus::InChargeQueue,
            ResumeTarget::Charging => AircraftStatus::Charging,
        }
    }
}

/// Point-in-time copy of an aircraft's observable state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AircraftSnapshot {
    pub id: AircraftId,
    pub company: Company,
    pub passengers: u32,
    pub status: AircraftStatus,
    pub prev_status: Option<AircraftStatus>,
    pub battery_soc: f64,
    pub flight_time_hours: f64,
    pub miles_flown: f64,
    pub charge_time_hours: f64,
    /// Charge time of completed sessions only, including time charged before
    /// a fault interrupted the session.
    pub completed_charge_time_hours: f64,
    pub fault_count: u32,
    pub assigned_charger: Option<ChargerId>,
    pub flights: u32,
    pub charge_sessions: u32,
}

#[derive(Debug, Clone)]
pub struct Aircraft {
    id: AircraftId,
    company: Company,
    params: CompanyParams,
    nominal_charge_ms: u64,

    status: AircraftStatus,
    resume: Option<ResumeTarget>,

    battery_soc: f64,
    energy_used_wh: f64,
    flight_time_hours: f64,
    miles_flown: f64,
    charge_time_hours: f64,
    completed_charge_time_hours: f64,
    fault_count: u32,
    assigned_charger: Option<ChargerId>,
    charge_consumed_ms: u64,
    session_charge_ms: u64,
    downtime_ms: u64,

    flights: u32,
    charge_sessions: u32,
}

impl Aircraft {
    pub fn new(id: AircraftId, company: Company, table: &ParameterTable) -> Result<Self, ConfigError> {
        let params = *table.get(company)?;
        params.validate(company)?;

        Ok(Self {
            id,
            company,
            params,
            nominal_charge_ms: minutes_to_ms(params.time_to_charge_min),
            status: AircraftStatus::Standby,
            resume: None,
            battery_soc: FULL_CHARGE_PERCENT,
            energy_used_wh: 0.0,
            flight_time_hours: 0.0,
            miles_flown: 0.0,
            charge_time_hours: 0.0,
            completed_charge_time_hours: 0.0,
            fault_count: 0,
            assigned_charger: None,
            charge_consumed_ms: 0,
            session_charge_ms: 0,
            downtime_ms: 0,
            flights: 0,
            charge_sessions: 0,
        })
    }

    /// Standby -> InFlight. Returns false if the aircraft was already started.
    pub fn start(&mut self) -> bool {
        if self.status != AircraftStatus::Standby {
            return false;
        }
        self.status = AircraftStatus::InFlight;
        self.flights += 1;
        info!(aircraft = self.id.0, company = %self.company, "aircraft departed");
        true
    }

    /// Advance the state machine by `dt_ms`.
    ///
    /// `charge` is the current grant from the charger manager. `fault` is
    /// consumed: a handled fault is cleared, or escalated to
    /// [`FaultSignal::TriggeredDuringCharging`] when a charger has to be
    /// released. Returns a charge request when one must be queued.
    pub fn tick(
        &mut self,
        dt_ms: u64,
        charge: Option<ChargerId>,
        fault: &mut FaultSignal,
    ) -> Option<ChargeRequest> {
        let request = match self.status {
            AircraftStatus::InFlight => self.tick_in_flight(dt_ms, fault),
            AircraftStatus::InChargeQueue => {
                self.tick_in_queue(charge, fault);
                None
            }
            AircraftStatus::Charging => {
                self.tick_charging(dt_ms, charge, fault);
                None
            }
            AircraftStatus::UnderMaintenance => self.tick_maintenance(dt_ms, fault),
            AircraftStatus::Standby | AircraftStatus::Suspended => None,
        };

        debug_assert_eq!(
            self.assigned_charger.is_some(),
            self.status == AircraftStatus::Charging,
            "aircraft {} holds charger {:?} in status {:?}",
            self.id.0,
            self.assigned_charger,
            self.status
        );
        debug_assert!(
            (0.0..=FULL_CHARGE_PERCENT).contains(&self.battery_soc),
            "battery soc {} out of range",
            self.battery_soc
        );

        request
    }

    fn tick_in_flight(&mut self, dt_ms: u64, fault: &mut FaultSignal) -> Option<ChargeRequest> {
        if fault.is_triggered() {
            *fault = FaultSignal::Clear;
            self.enter_maintenance(ResumeTarget::InFlight);
            return None;
        }

        let hours = ms_to_hours(dt_ms);
        let miles = self.params.cruise_speed_mph * hours;
        self.flight_time_hours += hours;
        self.miles_flown += miles;
        self.energy_used_wh += miles * self.params.energy_use_wh_per_mile;

        let capacity_per_percent = self.params.battery_capacity_wh / FULL_CHARGE_PERCENT;
        self.battery_soc = (FULL_CHARGE_PERCENT - self.energy_used_wh / capacity_per_percent).max(0.0);

        if self.battery_soc <= CHARGE_THRESHOLD_PERCENT {
            self.status = AircraftStatus::InChargeQueue;
            debug!(aircraft = self.id.0, soc = self.battery_soc, "battery low, queueing for charge");
            return Some(self.charge_request(self.nominal_charge_ms));
        }
        None
    }

    fn tick_in_queue(&mut self, charge: Option<ChargerId>, fault: &mut FaultSignal) {
        if fault.is_triggered() {
            // A grant that arrived with the fault must be handed back at once.
            *fault = if charge.is_some() {
                FaultSignal::TriggeredDuringCharging
            } else {
                FaultSignal::Clear
            };
            self.enter_maintenance(ResumeTarget::InChargeQueue);
            return;
        }

        if let Some(charger) = charge {
            self.assigned_charger = Some(charger);
            self.status = AircraftStatus::Charging;
            debug!(aircraft = self.id.0, charger = charger.get(), "charging started");
        }
    }

    fn tick_charging(&mut self, dt_ms: u64, charge: Option<ChargerId>, fault: &mut FaultSignal) {
        if fault.is_triggered() {
            self.assigned_charger = None;
            // Nothing to preempt if the charger was already released.
            *fault = if charge.is_some() {
                FaultSignal::TriggeredDuringCharging
            } else {
                FaultSignal::Clear
            };
            self.enter_maintenance(ResumeTarget::Charging);
            return;
        }

        self.charge_time_hours += ms_to_hours(dt_ms);
        self.charge_consumed_ms += dt_ms;
        self.session_charge_ms += dt_ms;

        if charge.is_none() {
            self.completed_charge_time_hours += ms_to_hours(self.session_charge_ms);
            self.session_charge_ms = 0;
            self.energy_used_wh = 0.0;
            self.battery_soc = FULL_CHARGE_PERCENT;
            self.assigned_charger = None;
            self.charge_consumed_ms = 0;
            self.charge_sessions += 1;
            self.flights += 1;
            self.status = AircraftStatus::InFlight;
            debug!(aircraft = self.id.0, sessions = self.charge_sessions, "charge complete, departing");
        }
    }

    fn tick_maintenance(&mut self, dt_ms: u64, fault: &mut FaultSignal) -> Option<ChargeRequest> {
        if fault.is_triggered() {
            *fault = FaultSignal::Clear;
            self.fault_count += 1;
            self.downtime_ms = 0;
            debug!(aircraft = self.id.0, faults = self.fault_count, "fault during maintenance, downtime restarted");
        }

        self.downtime_ms += dt_ms;
        if self.downtime_ms < MAINTENANCE_DURATION_MS {
            return None;
        }

        self.downtime_ms = 0;
        match self.resume.take() {
            Some(ResumeTarget::InChargeQueue | ResumeTarget::Charging) => {
                let remaining_ms = self.nominal_charge_ms.saturating_sub(self.charge_consumed_ms);
                self.charge_consumed_ms = 0;
                self.status = AircraftStatus::InChargeQueue;
                info!(aircraft = self.id.0, remaining_ms, "maintenance complete, re-queueing for charge");
                Some(self.charge_request(remaining_ms))
            }
            Some(ResumeTarget::InFlight) | None => {
                self.status = AircraftStatus::InFlight;
                info!(aircraft = self.id.0, "maintenance complete, resuming flight");
                None
            }
        }
    }

    fn enter_maintenance(&mut self, from: ResumeTarget) {
        self.fault_count += 1;
        self.resume = Some(from);
        self.downtime_ms = 0;
        self.status = AircraftStatus::UnderMaintenance;
        info!(
            aircraft = self.id.0,
            company = %self.company,
            from = ?from,
            faults = self.fault_count,
            "fault, entering maintenance"
        );
    }

    fn charge_request(&self, requested_duration_ms: u64) -> ChargeRequest {
        ChargeRequest {
            aircraft: self.id,
            requested_duration_ms,
        }
    }

    pub fn snapshot(&self) -> AircraftSnapshot {
        AircraftSnapshot {
            id: self.id,
            company: self.company,
            passengers: self.params.passengers,
            status: self.status,
            prev_status: self.prev_status(),
            battery_soc: self.battery_soc,
            flight_time_hours: self.flight_time_hours,
            miles_flown: self.miles_flown,
            charge_time_hours: self.charge_time_hours,
            completed_charge_time_hours: self.completed_charge_time_hours,
            fault_count: self.fault_count,
            assigned_charger: self.assigned_charger,
            flights: self.flights,
            charge_sessions: self.charge_sessions,
        }
    }

    pub fn id(&self) -> AircraftId {
        self.id
    }

    pub fn company(&self) -> Company {
        self.company
    }

    pub fn nominal_charge_ms(&self) -> u64 {
        self.nominal_charge_ms
    }

    pub fn status(&self) -> AircraftStatus {
        self.status
    }

    pub fn prev_status(&self) -> Option<AircraftStatus> {
        self.resume.map(ResumeTarget::status)
    }

    pub fn battery_soc(&self) -> f64 {
        self.battery_soc
    }

    pub fn fault_count(&self) -> u32 {
        self.fault_count
    }

    pub fn assigned_charger(&self) -> Option<ChargerId> {
        self.assigned_charger
    }

    pub fn charge_consumed_ms(&self) -> u64 {
        self.charge_consumed_ms
    }

    pub fn downtime_ms(&self) -> u64 {
        self.downtime_ms
    }
}
