use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rand::RngCore;
use tracing::info;
use uuid::Uuid;

use crate::config::world::{ResolvedConfig, WorldConfig};
use crate::error::WorldError;
use crate::rng::SeedSplitter;
use crate::simulation::{evolution, ocean, weather};
use crate::world::cell::{OceanState, Satellite, SphereHeightmap, Wind, WorldMap};
use crate::world::geography::{assign_ocean_land, build_geography, GeographyParams};
use crate::world::topology::CubeSphere;
use crate::world::vector::Vector3D;
use crate::world::{geography_cells, GeneratedWorld, WorldMetadata};

/// Cooperative cancellation token checked at every stage boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

fn checkpoint(cancel: &CancelToken) -> Result<(), WorldError> {
    if cancel.is_cancelled() {
        Err(WorldError::Cancelled)
    } else {
        Ok(())
    }
}

/// Run the full generation pipeline:
/// config → geography → (weather | ocean, coupled through wind) →
/// minerals → evolution. Any stage failure aborts with the stage name and
/// no partial world is emitted.
pub fn generate_world(
    config: &WorldConfig,
    cancel: &CancelToken,
) -> Result<GeneratedWorld, WorldError> {
    let started = Instant::now();

    // --- Stage: config mapping ---
    checkpoint(cancel)?;
    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().next_u64());
    let resolved = ResolvedConfig::resolve(config, seed)?;
    let seeds = SeedSplitter::new(seed);
    let topo = CubeSphere::new(resolved.resolution);
    info!(
        seed,
        resolution = resolved.resolution,
        plates = resolved.plate_count,
        "Generation started"
    );

    // --- Stage: geography ---
    checkpoint(cancel)?;
    let mut map = if resolved.simulate_geology {
        let params = GeographyParams {
            plate_count: resolved.plate_count,
            land_water_ratio: resolved.land_water_ratio,
            erosion_rate: resolved.erosion_rate,
            rainfall_factor: 1.0,
        };
        build_geography(&topo, &params, &seeds)
            .map_err(|e| WorldError::stage("geography", e))?
    } else {
        minimal_map(&topo, resolved.land_water_ratio)
    };

    // --- Stage: weather and ocean, coupled through the wind field ---
    checkpoint(cancel)?;
    let geo = geography_cells(&topo, &map);
    let mut climate = weather::generate_climate(
        &topo,
        &geo,
        map.sea_level,
        resolved.global_temperature_modifier(),
        &seeds,
    );
    let (tmin, tmax) = resolved.temperature_range;
    let (pmin, pmax) = resolved.precipitation_range;
    for data in &mut climate {
        data.temperature = data.temperature.clamp(tmin, tmax);
        data.annual_rainfall = pmin + data.annual_rainfall / 2000.0 * (pmax - pmin);
    }
    map.biomes = weather::assign_biomes(&topo, &geo, &climate, map.sea_level);

    // Initial winds from the latitude bands (no pressure history yet).
    let equinox_declination = weather::solar_declination(80);
    let winds: Vec<Wind> = (0..topo.cell_count())
        .map(|i| weather::latitude_band_wind(topo.latitude_of(topo.coordinate_of(i))))
        .collect();
    let wind_vectors: Vec<Vector3D> = (0..topo.cell_count())
        .map(|i| weather::wind_to_tangent(topo.to_sphere(topo.coordinate_of(i)), winds[i]))
        .collect();

    let mut precipitation =
        weather::precipitation_field(&topo, &geo, &winds, map.sea_level, equinox_declination);
    weather::apply_rain_shadow(&topo, &geo, &winds, map.sea_level, &mut precipitation);

    let weather_seed = seeds.stream("weather");
    let weather_states: Vec<_> = (0..topo.cell_count())
        .map(|i| {
            let lat = topo.latitude_of(topo.coordinate_of(i));
            weather::generate_weather_state(
                &climate[i],
                precipitation[i],
                winds[i],
                lat,
                equinox_declination,
                0,
                12.0,
                crate::rng::tick_cell_seed(weather_seed, 0, i as u64, 0),
            )
        })
        .collect();

    let mut ocean_state: OceanState = ocean::init_ocean(&topo, &geo);
    ocean_state.currents = ocean::ekman_currents(&topo, &geo, &wind_vectors);
    ocean::run_thermohaline(&topo, &geo, &mut ocean_state, ocean::THERMOHALINE_ITERATIONS);

    // --- Stage: minerals ---
    checkpoint(cancel)?;
    let minerals = if resolved.simulate_geology {
        crate::world::minerals::distribute_minerals(
            &topo,
            &map,
            resolved.mineral_density,
            &config.resource_distribution,
            &seeds,
        )
    } else {
        Vec::new()
    };

    // --- Stage: evolution ---
    checkpoint(cancel)?;
    let species = if resolved.simulate_life {
        let count = ((resolved.initial_species_count as f64 * resolved.bio_diversity_rate)
            .round() as usize)
            .clamp(10, 50);
        let mut present: Vec<_> = map
            .biomes
            .iter()
            .copied()
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        present.sort_by_key(|b| b.name());
        evolution::generate_initial_species(count, &present, &seeds)
            .into_vec()
    } else {
        Vec::new()
    };

    let satellites = generate_satellites(&seeds);

    let mut id_rng = seeds.chacha("world-id");
    let mut id_bytes = [0u8; 16];
    id_rng.fill_bytes(&mut id_bytes);

    let land_ratio = {
        let land = map
            .heightmap
            .values()
            .iter()
            .filter(|&&v| v > map.sea_level)
            .count();
        land as f64 / map.heightmap.len() as f64
    };
    let sea_level = map.sea_level;

    let world = GeneratedWorld {
        id: Uuid::from_bytes(id_bytes),
        name: format!("World-{}", seed),
        topology: topo,
        map,
        climate,
        weather: weather_states,
        ocean: ocean_state,
        minerals,
        species,
        satellites,
        tick_count: 0,
        metadata: WorldMetadata {
            seed,
            generated_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            generation_time_ms: started.elapsed().as_millis() as u64,
            dimensions: resolved.resolution,
            sea_level,
            land_ratio,
        },
    };

    Ok(world)
}

/// Flat fallback terrain used when geology simulation is disabled: a tiny
/// monotone ramp so the sea-level search still realizes the requested
/// land/water split.
fn minimal_map(topo: &CubeSphere, land_ratio: f64) -> WorldMap {
    let mut heightmap = SphereHeightmap::new(topo.resolution());
    for i in 0..topo.cell_count() {
        heightmap.set_index(i, i as f64 * 1e-4);
    }
    heightmap.update_extremes();
    let sea_level = assign_ocean_land(&heightmap, land_ratio);
    let biomes = heightmap
        .values()
        .iter()
        .map(|&e| {
            if e <= sea_level {
                crate::world::cell::Biome::Ocean
            } else {
                crate::world::cell::Biome::Grassland
            }
        })
        .collect();
    WorldMap {
        heightmap,
        plates: Vec::new(),
        biomes,
        rivers: Vec::new(),
        sea_level,
    }
}

/// Draw 0–3 moons from the seed; masses and orbits bracket the Earth-Moon
/// system so tides span the category table.
fn generate_satellites(seeds: &SeedSplitter) -> Vec<Satellite> {
    let mut rng = seeds.cell_rng("satellites");
    let count = rng.index(4);
    (0..count)
        .map(|n| Satellite {
            name: format!("moon-{}", n),
            mass_kg: rng.range(0.2, 2.0) * 7.342e22,
            distance_m: rng.range(2.0e8, 6.0e8),
        })
        .collect()
}
