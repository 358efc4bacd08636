pub mod aircraft;
pub mod charger;
pub mod company;

pub use aircraft::{Aircraft, AircraftSnapshot, AircraftStatus, ResumeTarget};
pub use charger::{Charger, ChargerEvent, ChargerEvents, ChargerManager, ChargerStatus, CHARGER_COUNT};
pub use company::{Company, CompanyParams, FailureTable, ParameterTable};

use crate::config::ConfigError;
use crate::rng::SimRng;
use crate::signals::SignalCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Every company is represented at least once.
pub const MIN_FLEET_SIZE: usize = Company::ALL.len();

/// Stable arena index of an aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AircraftId(pub usize);

impl fmt::Display for AircraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Charger number, 1..=CHARGER_COUNT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8")]
pub struct ChargerId(u8);

impl ChargerId {
    pub fn new(number: u8) -> Option<Self> {
        (1..=CHARGER_COUNT as u8).contains(&number).then_some(Self(number))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        usize::from(self.0) - 1
    }
}

impl TryFrom<u8> for ChargerId {
    type Error = ConfigError;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Self::new(number).ok_or(ConfigError::InvalidCharger(number))
    }
}

/// One arena slot: the aircraft and its signal cell.
#[derive(Debug, Clone)]
pub struct FleetSlot {
    aircraft: Arc<Mutex<Aircraft>>,
    signals: Arc<SignalCell>,
}

impl FleetSlot {
    pub fn lock(&self) -> MutexGuard<'_, Aircraft> {
        self.aircraft.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn signals(&self) -> &Arc<SignalCell> {
        &self.signals
    }
}

/// Signal cells indexed by aircraft id.
#[derive(Debug, Clone, Default)]
pub struct SignalBoard {
    cells: Vec<Arc<SignalCell>>,
}

impl SignalBoard {
    pub fn get(&self, id: AircraftId) -> Option<&SignalCell> {
        self.cells.get(id.0).map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Fleet {
    slots: Vec<FleetSlot>,
    board: SignalBoard,
}

impl Fleet {
    /// Build a fleet of `size` aircraft: one per company, the remainder spread
    /// at random.
    pub fn create(size: usize, table: &ParameterTable, rng: &mut SimRng) -> Result<Self, ConfigError> {
        if size < MIN_FLEET_SIZE {
            return Err(ConfigError::FleetTooSmall {
                size,
                minimum: MIN_FLEET_SIZE,
            });
        }

        let mut counts = [1usize; MIN_FLEET_SIZE];
        for _ in MIN_FLEET_SIZE..size {
            counts[rng.below(MIN_FLEET_SIZE)] += 1;
        }

        let companies = Company::ALL
            .iter()
            .zip(counts)
            .flat_map(|(&company, count)| iter::repeat(company).take(count));
        Self::from_companies(companies, table)
    }

    /// Build a fleet with exactly the given composition; ids follow the order.
    pub fn from_companies(
        companies: impl IntoIterator<Item = Company>,
        table: &ParameterTable,
    ) -> Result<Self, ConfigError> {
        let mut fleet = Self::default();
        for (index, company) in companies.into_iter().enumerate() {
            let aircraft = Aircraft::new(AircraftId(index), company, table)?;
            let signals = Arc::new(SignalCell::new());
            fleet.board.cells.push(Arc::clone(&signals));
            fleet.slots.push(FleetSlot {
                aircraft: Arc::new(Mutex::new(aircraft)),
                signals,
            });
        }
        Ok(fleet)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, id: AircraftId) -> Option<&FleetSlot> {
        self.slots.get(id.0)
    }

    pub fn slots(&self) -> &[FleetSlot] {
        &self.slots
    }

    pub fn board(&self) -> &SignalBoard {
        &self.board
    }

    pub fn snapshot(&self, id: AircraftId) -> Option<AircraftSnapshot> {
        self.slot(id).map(|slot| slot.lock().snapshot())
    }

    pub fn snapshots(&self) -> Vec<AircraftSnapshot> {
        self.slots.iter().map(|slot| slot.lock().snapshot()).collect()
    }

    pub fn count_by_company(&self, company: Company) -> usize {
        self.slots.iter().filter(|slot| slot.lock().company() == company).count()
    }
}
