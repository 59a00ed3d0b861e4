use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::error::WorldError;
use crate::simulation::TICKS_PER_DAY;
use crate::world::cell::WeatherState;
use crate::world::species::Species;

const TICKS_PER_YEAR: u64 = TICKS_PER_DAY * 365;

/// Storage boundary for simulation state. The core only requires these
/// operations; the backing store is the implementer's choice. Failures
/// propagate as persistence errors and never mutate the core's state.
pub trait Repository: Send + Sync {
    fn save_weather_state(&self, cell_id: u64, state: WeatherState) -> Result<(), WorldError>;

    /// The state recorded for a cell at an exact timestamp.
    fn get_weather_state(
        &self,
        cell_id: u64,
        timestamp: u64,
    ) -> Result<Option<WeatherState>, WorldError>;

    /// All states for a cell within the trailing `days` of its history,
    /// oldest first.
    fn get_weather_history(&self, cell_id: u64, days: u32) -> Result<Vec<WeatherState>, WorldError>;

    /// Total recorded precipitation for a cell over a simulation year.
    fn get_annual_precipitation(&self, cell_id: u64, year: u32) -> Result<f64, WorldError>;

    fn save_species(&self, species: &[Species]) -> Result<(), WorldError>;

    fn load_species(&self) -> Result<Vec<Species>, WorldError>;
}

#[derive(Default)]
struct Store {
    weather: HashMap<u64, BTreeMap<u64, WeatherState>>,
    species: Vec<Species>,
}

/// Map-backed repository used by tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository for InMemoryRepository {
    fn save_weather_state(&self, cell_id: u64, state: WeatherState) -> Result<(), WorldError> {
        let mut store = self.store.lock().expect("repository lock poisoned");
        store
            .weather
            .entry(cell_id)
            .or_default()
            .insert(state.timestamp, state);
        Ok(())
    }

    fn get_weather_state(
        &self,
        cell_id: u64,
        timestamp: u64,
    ) -> Result<Option<WeatherState>, WorldError> {
        let store = self.store.lock().expect("repository lock poisoned");
        Ok(store
            .weather
            .get(&cell_id)
            .and_then(|history| history.get(&timestamp))
            .copied())
    }

    fn get_weather_history(&self, cell_id: u64, days: u32) -> Result<Vec<WeatherState>, WorldError> {
        let store = self.store.lock().expect("repository lock poisoned");
        let Some(history) = store.weather.get(&cell_id) else {
            return Ok(Vec::new());
        };
        let Some((&latest, _)) = history.iter().next_back() else {
            return Ok(Vec::new());
        };
        let window = days as u64 * TICKS_PER_DAY;
        let cutoff = latest.saturating_sub(window);
        Ok(history
            .range(cutoff..)
            .map(|(_, state)| *state)
            .collect())
    }

    fn get_annual_precipitation(&self, cell_id: u64, year: u32) -> Result<f64, WorldError> {
        let store = self.store.lock().expect("repository lock poisoned");
        let Some(history) = store.weather.get(&cell_id) else {
            return Ok(0.0);
        };
        let start = year as u64 * TICKS_PER_YEAR;
        let end = start + TICKS_PER_YEAR;
        Ok(history
            .range(start..end)
            .map(|(_, state)| state.precipitation)
            .sum())
    }

    fn save_species(&self, species: &[Species]) -> Result<(), WorldError> {
        let mut store = self.store.lock().expect("repository lock poisoned");
        store.species = species.to_vec();
        Ok(())
    }

    fn load_species(&self) -> Result<Vec<Species>, WorldError> {
        let store = self.store.lock().expect("repository lock poisoned");
        Ok(store.species.clone())
    }
}
