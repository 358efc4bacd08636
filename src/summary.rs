use crate::charge_queue::QueueStats;
use crate::clock::ms_to_hours;
use crate::fleet::{AircraftSnapshot, Charger, Company};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySummary {
    pub company: Company,
    pub aircraft: usize,
    pub flights: u32,
    pub avg_flight_time_hours: f64,
    pub avg_distance_miles: f64,
    pub charge_sessions: u32,
    pub avg_charge_time_hours: f64,
    pub total_faults: u32,
    pub passenger_miles: f64,
}

impl CompanySummary {
    fn collect(company: Company, snapshots: &[AircraftSnapshot]) -> Self {
        let mut flights = 0;
        let mut sessions = 0;
        let mut faults = 0;
        let mut flight_hours = 0.0;
        let mut miles = 0.0;
        let mut charge_hours = 0.0;
        let mut passenger_miles = 0.0;
        let mut aircraft = 0;

        for s in snapshots.iter().filter(|s| s.company == company) {
            aircraft += 1;
            flights += s.flights;
            sessions += s.charge_sessions;
            faults += s.fault_count;
            flight_hours += s.flight_time_hours;
            miles += s.miles_flown;
            charge_hours += s.completed_charge_time_hours;
            passenger_miles += f64::from(s.passengers) * s.miles_flown;
        }

        let per = |total: f64, count: u32| if count == 0 { 0.0 } else { total / f64::from(count) };
        Self {
            company,
            aircraft,
            flights,
            avg_flight_time_hours: per(flight_hours, flights),
            avg_distance_miles: per(miles, flights),
            charge_sessions: sessions,
            avg_charge_time_hours: per(charge_hours, sessions),
            total_faults: faults,
            passenger_miles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargerSummary {
    pub charger: u8,
    pub sessions: usize,
    pub cumulative_use_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub elapsed_hours: f64,
    pub companies: Vec<CompanySummary>,
    pub chargers: Vec<ChargerSummary>,
    pub queue: QueueStats,
    pub faults_delivered: u32,
}

impl FleetSummary {
    pub fn collect(
        elapsed_ms: u64,
        snapshots: &[AircraftSnapshot],
        chargers: &[Charger],
        queue: QueueStats,
        faults_delivered: u32,
    ) -> Self {
        Self {
            elapsed_hours: ms_to_hours(elapsed_ms),
            companies: Company::ALL
                .iter()
                .map(|&company| CompanySummary::collect(company, snapshots))
                .collect(),
            chargers: chargers
                .iter()
                .map(|c| ChargerSummary {
                    charger: c.id().get(),
                    sessions: c.assignment_history().len(),
                    cumulative_use_hours: ms_to_hours(c.cumulative_use_ms()),
                })
                .collect(),
            queue,
            faults_delivered,
        }
    }

    pub fn company(&self, company: Company) -> Option<&CompanySummary> {
        self.companies.iter().find(|c| c.company == company)
    }

    pub fn total_faults(&self) -> u32 {
        self.companies.iter().map(|c| c.total_faults).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{AircraftId, AircraftStatus, ChargerManager};

    fn snapshot(id: usize, company: Company, flights: u32, sessions: u32) -> AircraftSnapshot {
        AircraftSnapshot {
            id: AircraftId(id),
            company,
            passengers: 4,
            status: AircraftStatus::InFlight,
            prev_status: None,
            battery_soc: 50.0,
            flight_time_hours: 2.0,
            miles_flown: 100.0,
            charge_time_hours: 1.0,
            completed_charge_time_hours: f64::from(sessions),
            fault_count: 1,
            assigned_charger: None,
            flights,
            charge_sessions: sessions,
        }
    }

    #[test]
    fn test_per_company_averages() {
        let snapshots = [
            snapshot(0, Company::Alpha, 2, 1),
            snapshot(1, Company::Alpha, 2, 1),
            snapshot(2, Company::Bravo, 1, 0),
        ];
        let manager = ChargerManager::new();
        let summary = FleetSummary::collect(0, &snapshots, manager.chargers(), QueueStats::default(), 3);

        let alpha = summary.company(Company::Alpha).unwrap();
        assert_eq!(alpha.aircraft, 2);
        assert_eq!(alpha.flights, 4);
        assert!((alpha.avg_flight_time_hours - 1.0).abs() < 1e-9);
        assert!((alpha.avg_distance_miles - 50.0).abs() < 1e-9);
        assert!((alpha.avg_charge_time_hours - 1.0).abs() < 1e-9);
        assert!((alpha.passenger_miles - 800.0).abs() < 1e-9);

        // No completed sessions: average is zero, not NaN
        let bravo = summary.company(Company::Bravo).unwrap();
        assert!(bravo.avg_charge_time_hours.abs() < f64::EPSILON);

        let echo = summary.company(Company::Echo).unwrap();
        assert_eq!(echo.aircraft, 0);
        assert_eq!(summary.total_faults(), 3);
        assert_eq!(summary.chargers.len(), 3);
    }

    #[test]
    fn test_interrupted_charging_does_not_inflate_average() {
        // 1.0 h charged in total, of which 0.5 h belongs to a session cut
        // short by a fault and not yet resumed
        let mut faulted = snapshot(0, Company::Delta, 1, 1);
        faulted.completed_charge_time_hours = 0.5;
        let manager = ChargerManager::new();
        let summary = FleetSummary::collect(0, &[faulted], manager.chargers(), QueueStats::default(), 1);

        let delta = summary.company(Company::Delta).unwrap();
        assert_eq!(delta.charge_sessions, 1);
        assert!((delta.avg_charge_time_hours - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_summary_serializes() {
        let manager = ChargerManager::new();
        let summary = FleetSummary::collect(1000, &[], manager.chargers(), QueueStats::default(), 0);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"companies\""));
        assert!(json.contains("\"alpha\""));
    }
}
