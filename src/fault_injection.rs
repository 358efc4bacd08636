use crate::clock::{MS_PER_HOUR, MS_PER_MINUTE};
use crate::config::ConfigError;
use crate::fleet::{Company, FailureTable, Fleet};
use crate::rng::SimRng;
use crate::scheduler::{FaultSchedule, ScheduledFault};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Fault injection statistics, per company.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct FaultInjectionStats {
    pub total_faults_scheduled: u32,
    pub alpha_faults: u32,
    pub bravo_faults: u32,
    pub charlie_faults: u32,
    pub delta_faults: u32,
    pub echo_faults: u32,
}

impl FaultInjectionStats {
    fn record(&mut self, company: Company) {
        self.total_faults_scheduled += 1;
        match company {
            Company::Alpha => self.alpha_faults += 1,
            Company::Bravo => self.bravo_faults += 1,
            Company::Charlie => self.charlie_faults += 1,
            Company::Delta => self.delta_faults += 1,
            Company::Echo => self.echo_faults += 1,
        }
    }

    pub fn for_company(&self, company: Company) -> u32 {
        match company {
            Company::Alpha => self.alpha_faults,
            Company::Bravo => self.bravo_faults,
            Company::Charlie => self.charlie_faults,
            Company::Delta => self.delta_faults,
            Company::Echo => self.echo_faults,
        }
    }
}

/// Configuration for fault injection behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultInjectionConfig {
    pub enabled: bool,
    pub failure_rates: FailureTable,
}

impl Default for FaultInjectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_rates: FailureTable::default(),
        }
    }
}

/// Builds the fault schedule once, before the simulation starts.
#[derive(Debug)]
pub struct FaultInjector {
    config: FaultInjectionConfig,
    stats: FaultInjectionStats,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self::new_with_config(FaultInjectionConfig::default())
    }

    pub fn new_with_config(config: FaultInjectionConfig) -> Self {
        Self {
            config,
            stats: FaultInjectionStats::default(),
        }
    }

    /// Draw exponential inter-arrival gaps for every aircraft until the horizon
    /// is passed. Arrivals strictly after `horizon_ms` are dropped.
    pub fn generate(
        &mut self,
        fleet: &Fleet,
        horizon_ms: u64,
        rng: &mut SimRng,
    ) -> Result<FaultSchedule, ConfigError> {
        self.stats = FaultInjectionStats::default();
        if !self.config.enabled {
            info!("fault injection disabled, empty schedule");
            return Ok(FaultSchedule::new());
        }

        let mut entries = Vec::new();
        for slot in fleet.slots() {
            let (id, company) = {
                let aircraft = slot.lock();
                (aircraft.id(), aircraft.company())
            };
            let per_hour = self.config.failure_rates.per_hour(company)?;
            if !(per_hour.is_finite() && per_hour >= 0.0) {
                return Err(ConfigError::InvalidFailureRate { company, rate: per_hour });
            }
            if per_hour == 0.0 {
                continue;
            }

            // Gaps are drawn in minutes
            let per_minute = per_hour * (MS_PER_MINUTE as f64 / MS_PER_HOUR as f64);
            let mut at_minutes = 0.0;
            loop {
                at_minutes += rng.exponential(per_minute);
                let time_ms = (at_minutes * MS_PER_MINUTE as f64).round();
                if time_ms > horizon_ms as f64 {
                    break;
                }
                entries.push(ScheduledFault {
                    time_ms: time_ms as u64,
                    aircraft: id,
                });
                self.stats.record(company);
            }
            debug!(aircraft = id.0, company = %company, per_hour, "fault arrivals drawn");
        }

        let schedule = FaultSchedule::from_entries(entries);
        info!(
            faults = schedule.len(),
            horizon_ms,
            "fault schedule generated"
        );
        Ok(schedule)
    }

    pub fn config(&self) -> &FaultInjectionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: FaultInjectionConfig) {
        self.config = config;
    }

    pub fn stats(&self) -> &FaultInjectionStats {
        &self.stats
    }
}

impl Default for FaultInjector {
    fn default() -> Self {
        Self::new()
    }
}
