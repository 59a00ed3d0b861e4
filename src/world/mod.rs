pub mod cell;
pub mod geography;
pub mod minerals;
pub mod species;
pub mod topology;
pub mod vector;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::world::cell::{
    ClimateData, GeographyCell, MineralDeposit, OceanState, Satellite, WeatherState, WorldMap,
};
use crate::world::species::Species;
use crate::world::topology::CubeSphere;

/// Provenance and summary numbers stored with every generated world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldMetadata {
    pub seed: u64,
    /// Unix seconds at completion.
    pub generated_at: u64,
    /// Wall-clock generation time in milliseconds.
    pub generation_time_ms: u64,
    /// Cube-sphere face resolution.
    pub dimensions: u32,
    pub sea_level: f64,
    pub land_ratio: f64,
}

/// The aggregate owning everything the pipeline produced. Cells and the
/// heightmap are immutable after generation; species and weather mutate
/// through simulation ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedWorld {
    pub id: Uuid,
    pub name: String,
    pub topology: CubeSphere,
    pub map: WorldMap,
    /// Long-term climate per cell.
    pub climate: Vec<ClimateData>,
    /// Latest weather per cell.
    pub weather: Vec<WeatherState>,
    pub ocean: OceanState,
    pub minerals: Vec<MineralDeposit>,
    /// Species sorted by ascending ID.
    pub species: Vec<Species>,
    pub satellites: Vec<Satellite>,
    pub tick_count: u64,
    pub metadata: WorldMetadata,
}

impl GeneratedWorld {
    /// Land fraction actually realized by the heightmap and sea level.
    pub fn land_fraction(&self) -> f64 {
        let total = self.map.heightmap.len();
        if total == 0 {
            return 0.0;
        }
        let land = self
            .map
            .heightmap
            .values()
            .iter()
            .filter(|&&v| v > self.map.sea_level)
            .count();
        land as f64 / total as f64
    }

    /// Count cells per biome, for summaries and determinism checks.
    pub fn biome_counts(&self) -> HashMap<cell::Biome, u32> {
        let mut counts = HashMap::new();
        for &b in &self.map.biomes {
            *counts.entry(b).or_insert(0) += 1;
        }
        counts
    }
}

/// Build the read-only geography view consumed by the weather and ocean
/// systems: one entry per cell with elevation, ocean flag, river width and
/// the latitude-derived base temperature.
pub fn geography_cells(topo: &CubeSphere, map: &WorldMap) -> Vec<GeographyCell> {
    let mut river_width = vec![0.0_f64; topo.cell_count()];
    for river in &map.rivers {
        for (step, &c) in river.iter().enumerate() {
            let i = topo.cell_index(c);
            river_width[i] = river_width[i].max(geography::river_width_at(step));
        }
    }

    (0..topo.cell_count())
        .map(|i| {
            let c = topo.coordinate_of(i);
            let latitude = topo.latitude_of(c);
            let elevation = map.heightmap.get_index(i);
            GeographyCell {
                cell_id: i as u64,
                sphere_coord: Some(topo.to_sphere(c)),
                elevation,
                is_ocean: elevation <= map.sea_level,
                river_width: river_width[i],
                base_temperature: 30.0 - 50.0 * latitude.to_radians().sin().abs(),
            }
        })
        .collect()
}

/// Print a human-readable summary of a generated world.
pub fn print_world_summary(world: &GeneratedWorld) {
    println!("=== World Summary ===");
    println!("Name: {}", world.name);
    println!("Seed: {}", world.metadata.seed);
    println!(
        "Resolution: {} ({} cells)",
        world.metadata.dimensions,
        world.topology.cell_count()
    );
    println!(
        "Sea level: {:.0} m, land {:.1}%",
        world.map.sea_level,
        world.land_fraction() * 100.0
    );
    println!(
        "Elevation: {:.0} m to {:.0} m",
        world.map.heightmap.min_elev, world.map.heightmap.max_elev
    );
    println!(
        "Plates: {}, rivers: {}",
        world.map.plates.len(),
        world.map.rivers.len()
    );

    let counts = world.biome_counts();
    let mut sorted: Vec<_> = counts.iter().collect();
    sorted.sort_by_key(|(b, _)| b.name());
    println!("\nBiomes:");
    for (biome, count) in sorted {
        let pct = *count as f64 / world.topology.cell_count() as f64 * 100.0;
        println!("  {:<18} {:>6} ({:.1}%)", biome.name(), count, pct);
    }

    let mut mineral_counts: HashMap<&str, (u32, f64)> = HashMap::new();
    for d in &world.minerals {
        let entry = mineral_counts
            .entry(match d.kind {
                cell::MineralKind::Iron => "iron",
                cell::MineralKind::Copper => "copper",
                cell::MineralKind::Coal => "coal",
                cell::MineralKind::Gold => "gold",
                cell::MineralKind::Silver => "silver",
                cell::MineralKind::Gems => "gems",
                cell::MineralKind::Crystal => "crystal",
            })
            .or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += d.quantity;
    }
    if !mineral_counts.is_empty() {
        let mut sorted: Vec<_> = mineral_counts.into_iter().collect();
        sorted.sort_by_key(|&(name, _)| name);
        println!("\nMinerals:");
        for (name, (count, total)) in sorted {
            println!("  {:<10} {:>5} deposits, {:.0} total", name, count, total);
        }
    }

    let living = world.species.iter().filter(|s| !s.is_extinct()).count();
    println!("\nSpecies: {} ({} living)", world.species.len(), living);
    println!("Satellites: {}", world.satellites.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SeedSplitter;
    use crate::world::geography::{build_geography, GeographyParams};

    fn small_map() -> (CubeSphere, WorldMap) {
        let topo = CubeSphere::new(12);
        let params = GeographyParams {
            plate_count: 4,
            land_water_ratio: 0.4,
            erosion_rate: 1.0,
            rainfall_factor: 1.0,
        };
        let map = build_geography(&topo, &params, &SeedSplitter::new(21)).unwrap();
        (topo, map)
    }

    #[test]
    fn geography_cells_cover_every_cell() {
        let (topo, map) = small_map();
        let cells = geography_cells(&topo, &map);
        assert_eq!(cells.len(), topo.cell_count());
        for (i, cell) in cells.iter().enumerate() {
            assert_eq!(cell.cell_id, i as u64);
            assert!(cell.sphere_coord.is_some());
        }
    }

    #[test]
    fn ocean_flag_matches_sea_level() {
        let (topo, map) = small_map();
        for cell in geography_cells(&topo, &map) {
            assert_eq!(
                cell.is_ocean,
                cell.elevation <= map.sea_level,
                "Cell {} ocean flag wrong",
                cell.cell_id
            );
        }
    }

    #[test]
    fn base_temperature_peaks_at_equator() {
        let (topo, map) = small_map();
        let cells = geography_cells(&topo, &map);
        // Front-face equator cell vs a polar (top face) cell.
        let equator = topo.cell_index(topology::Coordinate::new(0, 6, 6));
        let pole = topo.cell_index(topology::Coordinate::new(4, 6, 6));
        assert!(
            cells[equator].base_temperature > cells[pole].base_temperature,
            "Equator {} should exceed pole {}",
            cells[equator].base_temperature,
            cells[pole].base_temperature
        );
        assert!(cells[pole].base_temperature < -10.0);
    }

    #[test]
    fn river_cells_carry_width() {
        let (topo, map) = small_map();
        let cells = geography_cells(&topo, &map);
        for river in &map.rivers {
            for &c in river {
                assert!(
                    cells[topo.cell_index(c)].river_width > 0.0,
                    "River cell {:?} has zero width",
                    c
                );
            }
        }
    }
}
