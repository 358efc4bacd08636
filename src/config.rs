//! Run configuration and configuration errors.
//!
//! A [`SimulationConfig`] is usually loaded from an optional JSON file and then
//! overlaid with command-line flags. Every field has a default, so a partial
//! file is valid.

use crate::clock::{TaskIntervals, MS_PER_HOUR};
use crate::fault_injection::FaultInjectionConfig;
use crate::fleet::{Company, ParameterTable, MIN_FLEET_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_FLEET_SIZE: usize = 5;
const DEFAULT_HORIZON_HOURS: f64 = 3.0;
const DEFAULT_TIME_SCALE: f64 = 60.0;
const DEFAULT_POLL_PERIOD_MS: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid company code {0}")]
    InvalidCompany(u8),

    #[error("invalid charger number {0}")]
    InvalidCharger(u8),

    #[error("no parameter row for company {0}")]
    MissingParameters(Company),

    #[error("invalid {field} for company {company}: {value}")]
    InvalidParameter {
        company: Company,
        field: &'static str,
        value: f64,
    },

    #[error("no failure rate for company {0}")]
    MissingFailureRate(Company),

    #[error("invalid failure rate for company {company}: {rate}")]
    InvalidFailureRate { company: Company, rate: f64 },

    #[error("fleet size {size} is below the minimum of {minimum}")]
    FleetTooSmall { size: usize, minimum: usize },

    #[error("invalid task intervals: {0}")]
    InvalidInterval(&'static str),

    #[error("simulation horizon must be a positive number of hours, got {0}")]
    InvalidHorizon(f64),

    #[error("time scale must be positive, got {0}")]
    InvalidTimeScale(f64),

    #[error("wall poll period must be positive")]
    InvalidPollPeriod,

    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub fleet_size: usize,
    pub horizon_hours: f64,
    /// Simulated milliseconds per wall millisecond.
    pub time_scale: f64,
    /// Fixed seed for reproducible runs; drawn from the system time when absent.
    pub seed: Option<u64>,
    pub intervals: TaskIntervals,
    /// Wall-clock period of the cooperative polling loops.
    pub poll_period_ms: u64,
    pub companies: ParameterTable,
    pub faults: FaultInjectionConfig,
    pub telemetry_path: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fleet_size: DEFAULT_FLEET_SIZE,
            horizon_hours: DEFAULT_HORIZON_HOURS,
            time_scale: DEFAULT_TIME_SCALE,
            seed: None,
            intervals: TaskIntervals::default(),
            poll_period_ms: DEFAULT_POLL_PERIOD_MS,
            companies: ParameterTable::default(),
            faults: FaultInjectionConfig::default(),
            telemetry_path: None,
        }
    }
}

impl SimulationConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fleet_size < MIN_FLEET_SIZE {
            return Err(ConfigError::FleetTooSmall {
                size: self.fleet_size,
                minimum: MIN_FLEET_SIZE,
            });
        }
        if !(self.horizon_hours.is_finite() && self.horizon_hours > 0.0) {
            return Err(ConfigError::InvalidHorizon(self.horizon_hours));
        }
        if !(self.time_scale.is_finite() && self.time_scale > 0.0) {
            return Err(ConfigError::InvalidTimeScale(self.time_scale));
        }
        if self.poll_period_ms == 0 {
            return Err(ConfigError::InvalidPollPeriod);
        }
        self.intervals.validate().map_err(ConfigError::InvalidInterval)?;
        self.companies.validate()?;
        self.faults.failure_rates.validate()?;
        Ok(())
    }

    pub fn horizon_ms(&self) -> u64 {
        (self.horizon_hours * MS_PER_HOUR as f64).round() as u64
    }
}
