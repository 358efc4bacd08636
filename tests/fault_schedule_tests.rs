use fleetsim::*;
use fleetsim::clock::{MS_PER_HOUR, MS_PER_MINUTE};
use fleetsim::fault::DeliveryOutcome;
use fleetsim::fault_injection::{FaultInjectionConfig, FaultInjector};
use fleetsim::fleet::{FailureTable, ParameterTable};
use fleetsim::rng::SimRng;
use fleetsim::scheduler::{FaultSchedule, FaultService, ScheduledFault};
use fleetsim::signals::FaultSignal;
use fleetsim::telemetry::NullSink;

fn entry(time_ms: u64, id: usize) -> ScheduledFault {
    ScheduledFault {
        time_ms,
        aircraft: AircraftId(id),
    }
}

#[test]
fn test_simultaneous_faults_delivered_one_per_poll_by_id() {
    let fleet = Fleet::from_companies(Company::ALL, &ParameterTable::default()).unwrap();
    let schedule = FaultSchedule::from_entries(vec![entry(MS_PER_MINUTE, 3), entry(MS_PER_MINUTE, 1), entry(MS_PER_MINUTE, 2)]);
    let mut service = FaultService::new(schedule);

    let mut delivered = Vec::new();
    let mut now = MS_PER_MINUTE;
    while let Some(fault) = service.poll(now, fleet.board()) {
        delivered.push(fault.aircraft);
        now += MS_PER_MINUTE;
    }
    assert_eq!(delivered, vec![AircraftId(1), AircraftId(2), AircraftId(3)]);

    for id in 1..=3 {
        assert_eq!(fleet.board().get(AircraftId(id)).unwrap().fault(), FaultSignal::Triggered);
    }
    assert_eq!(fleet.board().get(AircraftId(0)).unwrap().fault(), FaultSignal::Clear);
}

#[test]
fn test_unconsumed_fault_is_coalesced_and_logged() {
    let fleet = Fleet::from_companies(Company::ALL, &ParameterTable::default()).unwrap();
    let schedule = FaultSchedule::from_entries(vec![entry(100, 0), entry(200, 0)]);
    let mut service = FaultService::new(schedule);

    service.poll(100, fleet.board());
    service.poll(200, fleet.board());

    let log = service.log();
    assert_eq!(log.total_delivered(), 2);
    assert_eq!(log.total_coalesced(), 1);
    let outcomes: Vec<_> = log.for_aircraft(AircraftId(0)).map(|r| r.outcome).collect();
    assert_eq!(outcomes, vec![DeliveryOutcome::Raised, DeliveryOutcome::Coalesced]);
    assert_eq!(service.schedule().stats().total_delivered, 2);
}

#[test]
fn test_late_poll_delivers_backlog_in_order() {
    let fleet = Fleet::from_companies(Company::ALL, &ParameterTable::default()).unwrap();
    let schedule = FaultSchedule::from_entries(vec![entry(500, 4), entry(100, 2), entry(300, 0)]);
    let mut service = FaultService::new(schedule);

    // Every entry is overdue; still only one per poll
    assert_eq!(service.poll(10_000, fleet.board()), Some(entry(100, 2)));
    assert_eq!(service.schedule().len(), 2);
    assert_eq!(service.poll(10_000, fleet.board()), Some(entry(300, 0)));
    assert_eq!(service.poll(10_000, fleet.board()), Some(entry(500, 4)));
    assert_eq!(service.poll(10_000, fleet.board()), None);

    let delivered_at: Vec<_> = service.log().recent().iter().map(|r| r.delivered_ms).collect();
    assert_eq!(delivered_at, vec![10_000; 3]);
}

#[test]
fn test_higher_rate_company_faults_more() {
    let fleet = Fleet::from_companies(Company::ALL, &ParameterTable::default()).unwrap();
    let mut injector = FaultInjector::new();
    injector
        .generate(&fleet, 2000 * MS_PER_HOUR, &mut SimRng::new(21))
        .unwrap();

    // Echo 0.61/h against Charlie 0.05/h
    let stats = injector.stats();
    assert!(stats.for_company(Company::Echo) > 5 * stats.for_company(Company::Charlie));
}

#[test]
fn test_simulation_delivers_no_more_than_scheduled() {
    let mut rates = FailureTable::empty();
    for company in Company::ALL {
        rates.insert(company, 3.0);
    }
    let config = SimulationConfig {
        fleet_size: 10,
        horizon_hours: 2.0,
        seed: Some(17),
        faults: FaultInjectionConfig {
            enabled: true,
            failure_rates: rates,
        },
        ..SimulationConfig::default()
    };

    let mut sim = Simulation::new(config, Box::new(NullSink)).unwrap();
    let scheduled = sim.driver().fault_service().schedule().len() as u32;
    assert!(scheduled > 0);

    let report = sim.run_stepped(15_000);
    assert!(report.summary.faults_delivered <= scheduled);
    assert!(report.summary.faults_delivered > 0);
    assert_eq!(report.schedule.total_scheduled, scheduled);
    assert_eq!(
        report.schedule.total_delivered,
        report.summary.faults_delivered
    );
    // Coalesced deliveries never add to an aircraft's fault count
    assert!(report.summary.total_faults() <= report.summary.faults_delivered);
}
