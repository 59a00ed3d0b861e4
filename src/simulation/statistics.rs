use std::collections::HashMap;

use crate::world::cell::{Biome, WeatherKind};
use crate::world::GeneratedWorld;

/// Per-tick aggregate metrics for introspection and degenerate-state
/// detection.
#[derive(Debug, Clone, PartialEq)]
pub struct TickStatistics {
    pub tick: u64,
    pub biome_distribution: HashMap<Biome, u32>,
    pub weather_distribution: HashMap<WeatherKind, u32>,
    pub avg_temperature: f64,
    pub avg_precipitation: f64,
    pub living_species: usize,
    pub total_population: u64,
    /// Shannon diversity over biomes, normalized to [0, 1].
    pub diversity_index: f64,
}

/// Compute statistics for the current world state after a tick.
pub fn compute_statistics(world: &GeneratedWorld) -> TickStatistics {
    let total = world.weather.len() as f64;

    let mut weather_dist: HashMap<WeatherKind, u32> = HashMap::new();
    let mut total_temp = 0.0;
    let mut total_precip = 0.0;
    for state in &world.weather {
        *weather_dist.entry(state.state).or_insert(0) += 1;
        total_temp += state.temperature;
        total_precip += state.precipitation;
    }

    let biome_dist = world.biome_counts();
    let diversity = shannon_diversity(&biome_dist, world.map.biomes.len() as u32);

    TickStatistics {
        tick: world.tick_count,
        biome_distribution: biome_dist,
        weather_distribution: weather_dist,
        avg_temperature: if total > 0.0 { total_temp / total } else { 0.0 },
        avg_precipitation: if total > 0.0 { total_precip / total } else { 0.0 },
        living_species: world.species.iter().filter(|s| !s.is_extinct()).count(),
        total_population: world.species.iter().map(|s| s.population).sum(),
        diversity_index: diversity,
    }
}

/// Shannon diversity normalized to [0, 1]: 0 for a monoculture, 1 when all
/// present biomes cover equal area.
fn shannon_diversity(distribution: &HashMap<Biome, u32>, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total_f = total as f64;
    let mut entropy = 0.0;
    let mut present = 0u32;
    for &count in distribution.values() {
        if count > 0 {
            present += 1;
            let p = count as f64 / total_f;
            entropy -= p * p.ln();
        }
    }
    if present <= 1 {
        return 0.0;
    }
    entropy / (present as f64).ln()
}
