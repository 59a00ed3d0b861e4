use serde::{Deserialize, Serialize};
use tracing::info;

use crate::world::species::{SpeciesRegistry, SpeciesType};

/// Herbivore head-count supported per unit of biomass capacity.
const HERBIVORES_PER_CAPACITY: f64 = 10_000.0;
/// Body sizes beyond which structural support starts failing.
pub const SAFE_SIZE: f64 = 12.0;
pub const CRITICAL_SIZE: f64 = 20.0;
/// Atmospheric oxygen fraction ceiling.
const OXYGEN_CEILING: f64 = 0.40;
const PRESENT_OXYGEN: f64 = 0.21;

/// Notable events produced by an ecosystem update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EcosystemEvent {
    /// Herbivores exceeded carrying capacity; populations were halved.
    Starvation { affected_species: Vec<u32> },
    /// A species' population was zeroed by a mass extinction.
    Extinction { species_id: u32 },
    /// A mutated variant split into a new species.
    Speciation { parent_id: u32, child_id: u32 },
}

/// Biomass carrying capacity from local climate:
/// `rainfall·0.01·(1 − (T−20)/100)`, never negative.
pub fn biomass_capacity(annual_rainfall: f64, temperature: f64) -> f64 {
    (annual_rainfall * 0.01 * (1.0 - (temperature - 20.0) / 100.0)).max(0.0)
}

/// Starvation check: when the summed herbivore population exceeds what the
/// biomass capacity supports, every herbivore population is halved.
pub fn apply_trophic_pressure(
    registry: &mut SpeciesRegistry,
    capacity: f64,
) -> Option<EcosystemEvent> {
    let total_herbivores: u64 = registry
        .iter()
        .filter(|s| s.kind == SpeciesType::Herbivore)
        .map(|s| s.population)
        .sum();

    if (total_herbivores as f64) <= capacity * HERBIVORES_PER_CAPACITY {
        return None;
    }

    let mut affected = Vec::new();
    for s in registry.iter_mut() {
        if s.kind == SpeciesType::Herbivore && s.population > 0 {
            s.population /= 2;
            affected.push(s.id);
        }
    }
    info!(
        herbivores = total_herbivores,
        capacity, "Starvation event: herbivore populations halved"
    );
    Some(EcosystemEvent::Starvation {
        affected_species: affected,
    })
}

// === Oxygen and body size ===

/// Largest supportable arthropod body size for an oxygen fraction.
/// Diffusion-limited breathing scales with the square of partial pressure,
/// with an extra boost above the present-day level.
pub fn max_arthropod_size(oxygen: f64) -> f64 {
    let ratio = oxygen / PRESENT_OXYGEN;
    let mut size = 0.5 * ratio * ratio * 2.0;
    if oxygen > PRESENT_OXYGEN {
        size *= ratio.sqrt();
    }
    size
}

/// Advance atmospheric oxygen from flora biomass production.
pub fn update_atmosphere(oxygen: f64, flora_biomass: f64) -> f64 {
    (oxygen + flora_biomass * 0.001).clamp(0.0, OXYGEN_CEILING)
}

// === Mass extinction ===

/// Per-species extinction probability for an event of the given severity.
/// Large bodies fare worse; very small bodies are sheltered.
pub fn extinction_probability(severity: f64, size: f64) -> f64 {
    let mut p = severity;
    if size > 5.0 {
        p = (p + (size - 5.0) / 10.0).min(0.99);
    }
    if size < 1.0 {
        p = (p - (1.0 - size) * 0.3).max(0.1);
    }
    p
}

/// Apply a mass extinction: species whose probability reaches 0.75 lose
/// their entire population. Returns one event per extinguished species.
pub fn apply_mass_extinction(registry: &mut SpeciesRegistry, severity: f64) -> Vec<EcosystemEvent> {
    let mut events = Vec::new();
    for s in registry.iter_mut() {
        if s.is_extinct() {
            continue;
        }
        if extinction_probability(severity, s.size) >= 0.75 {
            s.population = 0;
            events.push(EcosystemEvent::Extinction { species_id: s.id });
        }
    }
    if !events.is_empty() {
        info!(severity, count = events.len(), "Mass extinction event");
    }
    events
}

// === Biomechanics ===

/// Structural fitness penalty for body size: full fitness up to the safe
/// size, exponential decay toward the critical size, floored at 0.01.
pub fn biomechanical_fitness(size: f64) -> f64 {
    if size <= SAFE_SIZE {
        return 1.0;
    }
    (-2.0 * (size - SAFE_SIZE) / (CRITICAL_SIZE - SAFE_SIZE))
        .exp()
        .max(0.01)
}

// === Island isolation ===

/// Body-size multiplier after `generations` of island isolation (in
/// millions of years): large species dwarf on resource-poor islands,
/// very small species grow toward the vacant niches.
pub fn island_size_multiplier(size: f64, resource_density: f64, generations: f64) -> f64 {
    let rd = resource_density.clamp(0.0, 1.0);
    if size > 3.0 {
        let rate = 0.001 * (1.0 - rd) * (size / 3.0);
        (-rate * generations).exp().max(0.3)
    } else if size < 0.5 {
        let rate = 0.0005 * rd;
        (rate * generations).exp().min(3.0)
    } else {
        1.0
    }
}
