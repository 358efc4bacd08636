use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Manufacturer profile. Codes are part of the telemetry contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Company {
    Alpha,
    Bravo,
    Charlie,
    Delta,
    Echo,
}

impl Company {
    pub const ALL: [Company; 5] = [
        Company::Alpha,
        Company::Bravo,
        Company::Charlie,
        Company::Delta,
        Company::Echo,
    ];

    pub fn code(self) -> u8 {
        match self {
            Company::Alpha => 0,
            Company::Bravo => 1,
            Company::Charlie => 2,
            Company::Delta => 3,
            Company::Echo => 4,
        }
    }
}

impl TryFrom<u8> for Company {
    type Error = ConfigError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Company::ALL
            .get(usize::from(code))
            .copied()
            .ok_or(ConfigError::InvalidCompany(code))
    }
}

impl fmt::Display for Company {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Company::Alpha => "Alpha",
            Company::Bravo => "Bravo",
            Company::Charlie => "Charlie",
            Company::Delta => "Delta",
            Company::Echo => "Echo",
        };
        f.write_str(name)
    }
}

/// Static performance row for one manufacturer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompanyParams {
    pub cruise_speed_mph: f64,
    pub battery_capacity_wh: f64,
    pub time_to_charge_min: f64,
    pub energy_use_wh_per_mile: f64,
    pub passengers: u32,
}

impl CompanyParams {
    pub fn validate(&self, company: Company) -> Result<(), ConfigError> {
        let checks = [
            ("cruise_speed_mph", self.cruise_speed_mph),
            ("battery_capacity_wh", self.battery_capacity_wh),
            ("energy_use_wh_per_mile", self.energy_use_wh_per_mile),
        ];
        for (field, value) in checks {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidParameter { company, field, value });
            }
        }
        if !(self.time_to_charge_min.is_finite() && self.time_to_charge_min >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                company,
                field: "time_to_charge_min",
                value: self.time_to_charge_min,
            });
        }
        Ok(())
    }
}

/// Company -> performance parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterTable(BTreeMap<Company, CompanyParams>);

impl ParameterTable {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, company: Company, params: CompanyParams) {
        self.0.insert(company, params);
    }

    pub fn get(&self, company: Company) -> Result<&CompanyParams, ConfigError> {
        self.0.get(&company).ok_or(ConfigError::MissingParameters(company))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for company in Company::ALL {
            self.get(company)?.validate(company)?;
        }
        Ok(())
    }
}

impl Default for ParameterTable {
    fn default() -> Self {
        let row = |speed, capacity, charge, energy, passengers| CompanyParams {
            cruise_speed_mph: speed,
            battery_capacity_wh: capacity,
            time_to_charge_min: charge,
            energy_use_wh_per_mile: energy,
            passengers,
        };
        let mut table = Self::empty();
        table.insert(Company::Alpha, row(120.0, 320_000.0, 60.0, 1600.0, 4));
        table.insert(Company::Bravo, row(100.0, 100_000.0, 20.0, 1500.0, 5));
        table.insert(Company::Charlie, row(160.0, 220_000.0, 80.0, 2200.0, 3));
        table.insert(Company::Delta, row(90.0, 120_000.0, 62.0, 800.0, 2));
        table.insert(Company::Echo, row(30.0, 150_000.0, 30.0, 5800.0, 2));
        table
    }
}

/// Company -> expected faults per flight hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureTable(BTreeMap<Company, f64>);

impl FailureTable {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, company: Company, per_hour: f64) {
        self.0.insert(company, per_hour);
    }

    pub fn per_hour(&self, company: Company) -> Result<f64, ConfigError> {
        self.0
            .get(&company)
            .copied()
            .ok_or(ConfigError::MissingFailureRate(company))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for company in Company::ALL {
            let rate = self.per_hour(company)?;
            if !(rate.is_finite() && rate >= 0.0) {
                return Err(ConfigError::InvalidFailureRate { company, rate });
            }
        }
        Ok(())
    }
}

impl Default for FailureTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert(Company::Alpha, 0.25);
        table.insert(Company::Bravo, 0.10);
        table.insert(Company::Charlie, 0.05);
        table.insert(Company::Delta, 0.22);
        table.insert(Company::Echo, 0.61);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_codes_round_trip() {
        for company in Company::ALL {
            assert_eq!(Company::try_from(company.code()).unwrap(), company);
        }
        assert!(matches!(
            Company::try_from(5),
            Err(ConfigError::InvalidCompany(5))
        ));
    }

    #[test]
    fn test_default_tables_are_complete() {
        assert!(ParameterTable::default().validate().is_ok());
        assert!(FailureTable::default().validate().is_ok());
    }

    #[test]
    fn test_missing_row_is_reported() {
        let mut table = ParameterTable::default();
        table.0.remove(&Company::Delta);
        assert!(matches!(
            table.validate(),
            Err(ConfigError::MissingParameters(Company::Delta))
        ));
    }

    #[test]
    fn test_non_positive_parameter_rejected() {
        let mut table = ParameterTable::default();
        let mut params = *table.get(Company::Echo).unwrap();
        params.battery_capacity_wh = 0.0;
        table.insert(Company::Echo, params);
        assert!(matches!(
            table.validate(),
            Err(ConfigError::InvalidParameter { company: Company::Echo, field: "battery_capacity_wh", .. })
        ));
    }

    #[test]
    fn test_tables_deserialize_from_json() {
        let json = r#"{"alpha": 0.5, "bravo": 0.1, "charlie": 0.0, "delta": 1.0, "echo": 2.0}"#;
        let table: FailureTable = serde_json::from_str(json).unwrap();
        assert!((table.per_hour(Company::Echo).unwrap() - 2.0).abs() < f64::EPSILON);
        assert!(table.validate().is_ok());
    }
}
