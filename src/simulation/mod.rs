pub mod ecosystem;
pub mod evolution;
pub mod ocean;
pub mod statistics;
pub mod weather;

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use tracing::debug;

use crate::rng::{tick_cell_seed, CellRng, SeedSplitter};
use crate::simulation::ecosystem::EcosystemEvent;
use crate::simulation::statistics::TickStatistics;
use crate::world::cell::{Biome, GeographyCell, Wind};
use crate::world::species::{Species, SpeciesRegistry, SpeciesType};
use crate::world::vector::Vector3D;
use crate::world::GeneratedWorld;

/// One tick is one hour of game time.
pub const TICKS_PER_DAY: u64 = 24;
/// Chance per tick of a spontaneous mass-extinction event.
const MASS_EXTINCTION_CHANCE: f64 = 0.0002;

/// Result of advancing the simulation one tick.
#[derive(Debug, Clone)]
pub struct TickResult {
    pub statistics: TickStatistics,
    pub events: Vec<EcosystemEvent>,
}

/// The time-stepped simulation driver. Holds the derived fields that are
/// expensive to rebuild (geography view, winds, precipitation potential)
/// and the species registry with its lineage reference traits.
pub struct Simulation {
    geo: Vec<GeographyCell>,
    winds: Vec<Wind>,
    wind_vectors: Vec<Vector3D>,
    precipitation: Vec<f64>,
    monsoon_boost: Vec<f64>,
    registry: SpeciesRegistry,
    /// Trait values each lineage is measured against for speciation.
    founders: BTreeMap<u32, Species>,
    biome_climate: HashMap<Biome, (f64, f64)>,
    mean_temperature: f64,
    mean_rainfall: f64,
    oxygen: f64,
    seeds: SeedSplitter,
    last_day: Option<u64>,
}

impl Simulation {
    pub fn new(world: &GeneratedWorld) -> Self {
        let geo = crate::world::geography_cells(&world.topology, &world.map);

        let registry = SpeciesRegistry::from_vec(world.species.clone())
            .expect("world species must satisfy invariants");
        let founders = registry.iter().map(|s| (s.id, s.clone())).collect();

        // Per-biome climate averages drive species fitness lookups.
        let mut sums: HashMap<Biome, (f64, f64, u32)> = HashMap::new();
        for (i, data) in world.climate.iter().enumerate() {
            let entry = sums.entry(world.map.biomes[i]).or_insert((0.0, 0.0, 0));
            entry.0 += data.temperature;
            entry.1 += data.annual_rainfall;
            entry.2 += 1;
        }
        let biome_climate = sums
            .into_iter()
            .map(|(b, (t, r, n))| (b, (t / n as f64, r / n as f64)))
            .collect();

        let cell_count = world.climate.len().max(1) as f64;
        let mean_temperature =
            world.climate.iter().map(|c| c.temperature).sum::<f64>() / cell_count;
        let mean_rainfall =
            world.climate.iter().map(|c| c.annual_rainfall).sum::<f64>() / cell_count;

        let cells = world.topology.cell_count();
        Self {
            geo,
            winds: vec![
                Wind {
                    direction_deg: 0.0,
                    speed: 0.0,
                };
                cells
            ],
            wind_vectors: vec![Vector3D::ZERO; cells],
            precipitation: vec![0.0; cells],
            monsoon_boost: vec![1.0; cells],
            registry,
            founders,
            biome_climate,
            mean_temperature,
            mean_rainfall,
            oxygen: 0.21,
            seeds: SeedSplitter::new(world.metadata.seed),
            last_day: None,
        }
    }

    pub fn oxygen(&self) -> f64 {
        self.oxygen
    }

    /// Advance game time by one tick: weather, ocean, then species in
    /// ascending-ID order, then stochastic events.
    pub fn advance_tick(&mut self, world: &mut GeneratedWorld) -> TickResult {
        world.tick_count += 1;
        let tick = world.tick_count;
        let day_of_year = ((tick / TICKS_PER_DAY) % 365) as u32 + 1;
        let hour = (tick % TICKS_PER_DAY) as f64;
        let declination = weather::solar_declination(day_of_year);

        // Winds, precipitation potential and ocean currents follow the
        // daily solar cycle, not the hourly one.
        let day = tick / TICKS_PER_DAY;
        if self.last_day != Some(day) {
            self.refresh_daily_fields(world, declination);
            self.last_day = Some(day);
        }

        self.update_weather(world, tick, declination, hour);

        // Ocean heat advection: one double-buffered pass per tick.
        world.ocean.temperature = ocean::thermohaline_step(
            &world.topology,
            &self.geo,
            &world.ocean.currents,
            &world.ocean.temperature,
        );

        let mut events = self.update_species(tick);

        // Trophic feedback and rare catastrophes.
        let capacity = ecosystem::biomass_capacity(self.mean_rainfall, self.mean_temperature);
        if let Some(event) = ecosystem::apply_trophic_pressure(&mut self.registry, capacity) {
            events.push(event);
        }
        let mut event_rng = CellRng::new(tick_cell_seed(
            self.seeds.stream("events"),
            tick,
            0,
            2,
        ));
        if event_rng.next_f64() < MASS_EXTINCTION_CHANCE {
            let severity = event_rng.range(0.3, 0.9);
            events.extend(ecosystem::apply_mass_extinction(&mut self.registry, severity));
        }

        // Flora photosynthesis feeds the atmosphere.
        let flora_biomass: f64 = self
            .registry
            .iter()
            .filter(|s| s.kind == SpeciesType::Flora)
            .map(|s| s.population as f64 * s.size)
            .sum::<f64>()
            / 1e9;
        self.oxygen = ecosystem::update_atmosphere(self.oxygen, flora_biomass);

        world.species = self.registry.iter().cloned().collect();

        let statistics = statistics::compute_statistics(world);
        debug!(
            tick,
            living = statistics.living_species,
            events = events.len(),
            "Tick complete"
        );
        TickResult { statistics, events }
    }

    /// Rebuild the wind field from the pressure gradient (latitude-band
    /// fallback where the gradient is negligible), apply monsoon coastal
    /// overrides, recompute precipitation potential and Ekman currents.
    fn refresh_daily_fields(&mut self, world: &mut GeneratedWorld, declination: f64) {
        let topo = &world.topology;

        let temperatures: Vec<f64> = (0..topo.cell_count())
            .map(|i| {
                let lat = topo.latitude_of(topo.coordinate_of(i));
                world.climate[i].temperature + weather::seasonal_modifier(lat, declination)
            })
            .collect();
        let pressures = weather::pressure_field(&self.geo, &temperatures);

        let computed: Vec<(Wind, Vector3D, f64)> = (0..topo.cell_count())
            .into_par_iter()
            .map(|i| {
                let c = topo.coordinate_of(i);
                let radial = topo.to_sphere(c);

                let gradient = weather::pressure_gradient_wind(topo, &pressures, c);
                let mut wind = if gradient.length() >= 0.5 {
                    weather::tangent_to_wind(radial, gradient)
                } else {
                    weather::latitude_band_wind(topo.latitude_of(c))
                };

                let mut boost = 1.0;
                if let Some((monsoon_wind, multiplier)) =
                    weather::monsoon(topo, &self.geo, c, declination)
                {
                    wind = monsoon_wind;
                    boost = multiplier;
                }

                let vector = weather::wind_to_tangent(radial, wind);
                (wind, vector, boost)
            })
            .collect();

        for (i, (wind, vector, boost)) in computed.into_iter().enumerate() {
            self.winds[i] = wind;
            self.wind_vectors[i] = vector;
            self.monsoon_boost[i] = boost;
        }

        self.precipitation = weather::precipitation_field(
            topo,
            &self.geo,
            &self.winds,
            world.map.sea_level,
            declination,
        );
        weather::apply_rain_shadow(
            topo,
            &self.geo,
            &self.winds,
            world.map.sea_level,
            &mut self.precipitation,
        );

        world.ocean.currents = ocean::ekman_currents(topo, &self.geo, &self.wind_vectors);
    }

    fn update_weather(&self, world: &mut GeneratedWorld, tick: u64, declination: f64, hour: f64) {
        let topo = &world.topology;
        let base_seed = self.seeds.stream("weather");
        let climate = &world.climate;
        let winds = &self.winds;
        let precipitation = &self.precipitation;
        let monsoon_boost = &self.monsoon_boost;

        world.weather = (0..topo.cell_count())
            .into_par_iter()
            .map(|i| {
                let lat = topo.latitude_of(topo.coordinate_of(i));
                let potential = precipitation[i] * monsoon_boost[i];
                weather::generate_weather_state(
                    &climate[i],
                    potential,
                    winds[i],
                    lat,
                    declination,
                    tick,
                    hour,
                    tick_cell_seed(base_seed, tick, i as u64, 0),
                )
            })
            .collect();
    }

    /// Update every living species in ascending-ID order: fitness and
    /// population first, then mutation and possible speciation.
    fn update_species(&mut self, tick: u64) -> Vec<EcosystemEvent> {
        let mut events = Vec::new();
        let evolution_seed = self.seeds.stream("evolution");
        let ids = self.registry.ids();

        // Snapshot populations for food/predation lookups so updates within
        // the tick read consistent values.
        let populations: HashMap<u32, (u64, SpeciesType, f64)> = self
            .registry
            .iter()
            .map(|s| (s.id, (s.population, s.kind, s.size)))
            .collect();
        let predators_of: HashMap<u32, u64> = {
            let mut map: HashMap<u32, u64> = HashMap::new();
            for s in self.registry.iter() {
                for &prey in &s.preferred_prey {
                    *map.entry(prey).or_insert(0) += s.population;
                }
            }
            map
        };

        for id in ids {
            let Some(species) = self.registry.get(id) else {
                continue;
            };
            if species.is_extinct() {
                continue;
            }

            let (temperature, moisture) = self.environment_for(species);
            let food = self.food_availability(species, &populations);
            let predation = {
                let hunted = predators_of.get(&id).copied().unwrap_or(0) as f64;
                (hunted / (species.population as f64 + 1.0) * 0.5).clamp(0.0, 1.0)
            };
            let competition = self.competition_for(species);

            let inputs = evolution::FitnessInputs {
                temperature,
                moisture,
                food_availability: food,
                predation_rate: predation,
                competition,
            };
            let fitness = evolution::fitness_score(species, &inputs)
                * ecosystem::biomechanical_fitness(species.size);
            let survival = evolution::survival_probability(species, fitness);

            let current = {
                let species = self
                    .registry
                    .get_mut(id)
                    .expect("species present for the whole tick");
                species.fitness_score = fitness;
                // Yearly reproduction spread across hourly ticks.
                let growth = 1.0
                    + species.reproduction_rate * (survival - 0.5)
                        / (365.0 * TICKS_PER_DAY as f64);
                let next = (species.population as f64 * growth).max(0.0) as u64;
                species.set_population(if next < 2 { 0 } else { next });
                if species.is_extinct() {
                    events.push(EcosystemEvent::Extinction { species_id: id });
                    continue;
                }
                species.clone()
            };

            // Mutation and speciation.
            let mut rng = CellRng::new(tick_cell_seed(evolution_seed, tick, id as u64, 1));
            let rate = evolution::effective_mutation_rate(&current, &mut rng);
            if rng.next_f64() < rate {
                let candidate = evolution::mutate_traits(&current, &mut rng);
                let reference = self.founders.get(&id).unwrap_or(&current).clone();

                if evolution::exceeds_speciation_threshold(&candidate, &reference) {
                    let new_id = self.registry.allocate_id();
                    let parent = self
                        .registry
                        .get_mut(id)
                        .expect("species present for the whole tick");
                    let name = format!("{}-g{}", parent.name, parent.generation + 1);
                    let child = evolution::speciate(parent, candidate, new_id, name);
                    // The parent lineage re-anchors on its current traits;
                    // the split consumed the accumulated divergence.
                    let parent_snapshot = parent.clone();
                    self.founders.insert(id, parent_snapshot);
                    self.founders.insert(new_id, child.clone());
                    self.registry
                        .insert(child)
                        .expect("speciation child must be valid");
                    events.push(EcosystemEvent::Speciation {
                        parent_id: id,
                        child_id: new_id,
                    });
                } else if let Some(species) = self.registry.get_mut(id) {
                    *species = candidate;
                }
            }
        }

        events
    }

    /// Mean temperature and rainfall over the species' preferred biomes,
    /// falling back to the world means where a biome is absent.
    fn environment_for(&self, species: &Species) -> (f64, f64) {
        let mut temp = 0.0;
        let mut rain = 0.0;
        let mut n = 0.0;
        for biome in &species.preferred_biomes {
            if let Some(&(t, r)) = self.biome_climate.get(biome) {
                temp += t;
                rain += r;
                n += 1.0;
            }
        }
        if n == 0.0 {
            (self.mean_temperature, self.mean_rainfall)
        } else {
            (temp / n, rain / n)
        }
    }

    fn food_availability(
        &self,
        species: &Species,
        populations: &HashMap<u32, (u64, SpeciesType, f64)>,
    ) -> f64 {
        match species.kind {
            SpeciesType::Flora => 1.0,
            SpeciesType::Herbivore => {
                let plants: f64 = species
                    .preferred_plants
                    .iter()
                    .filter_map(|id| populations.get(id))
                    .map(|&(pop, _, size)| pop as f64 * size)
                    .sum();
                (plants / (species.population as f64 * 5.0 + 1.0)).clamp(0.0, 1.0)
            }
            SpeciesType::Carnivore | SpeciesType::Omnivore => {
                let prey: f64 = species
                    .preferred_prey
                    .iter()
                    .chain(species.preferred_plants.iter())
                    .filter_map(|id| populations.get(id))
                    .map(|&(pop, _, _)| pop as f64)
                    .sum();
                (prey / (species.population as f64 * 10.0 + 1.0)).clamp(0.0, 1.0)
            }
        }
    }

    /// Living same-role species sharing a preferred biome crowd each other.
    fn competition_for(&self, species: &Species) -> f64 {
        let rivals = self
            .registry
            .iter()
            .filter(|other| {
                other.id != species.id
                    && !other.is_extinct()
                    && other.kind == species.kind
                    && other
                        .preferred_biomes
                        .iter()
                        .any(|b| species.preferred_biomes.contains(b))
            })
            .count();
        1.0 / (1.0 + 0.05 * rivals as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SeedSplitter;
    use crate::simulation::weather::{assign_biomes, generate_climate};
    use crate::world::cell::OceanState;
    use crate::world::geography::{build_geography, GeographyParams};
    use crate::world::topology::CubeSphere;
    use crate::world::{geography_cells, GeneratedWorld, WorldMetadata};
    use uuid::Uuid;

    fn build_test_world(seed: u64) -> GeneratedWorld {
        let topo = CubeSphere::new(12);
        let splitter = SeedSplitter::new(seed);
        let params = GeographyParams {
            plate_count: 4,
            land_water_ratio: 0.35,
            erosion_rate: 1.0,
            rainfall_factor: 1.0,
        };
        let mut map = build_geography(&topo, &params, &splitter).unwrap();
        let geo = geography_cells(&topo, &map);
        let climate = generate_climate(&topo, &geo, map.sea_level, 0.0, &splitter);
        map.biomes = assign_biomes(&topo, &geo, &climate, map.sea_level);

        let mut present: Vec<_> = map
            .biomes
            .iter()
            .copied()
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        present.sort_by_key(|b: &crate::world::cell::Biome| b.name());
        let registry = evolution::generate_initial_species(12, &present, &splitter);

        let mut world = GeneratedWorld {
            id: Uuid::from_bytes([7; 16]),
            name: format!("test-{}", seed),
            topology: topo,
            map,
            climate,
            weather: Vec::new(),
            ocean: OceanState::empty(topo.cell_count()),
            minerals: Vec::new(),
            species: registry.into_vec(),
            satellites: Vec::new(),
            tick_count: 0,
            metadata: WorldMetadata {
                seed,
                generated_at: 0,
                generation_time_ms: 0,
                dimensions: 12,
                sea_level: 0.0,
                land_ratio: 0.35,
            },
        };
        world.metadata.sea_level = world.map.sea_level;
        world.ocean = ocean::init_ocean(&world.topology, &geography_cells(&world.topology, &world.map));
        world
    }

    #[test]
    fn tick_advances_time_and_weather() {
        let mut world = build_test_world(42);
        let mut sim = Simulation::new(&world);
        let result = sim.advance_tick(&mut world);

        assert_eq!(world.tick_count, 1);
        assert_eq!(world.weather.len(), world.topology.cell_count());
        assert_eq!(result.statistics.tick, 1);
        assert!(result.statistics.living_species > 0);
        for state in &world.weather {
            assert_eq!(state.timestamp, 1);
            assert!((0.0..=100.0).contains(&state.humidity));
        }
    }

    #[test]
    fn simulation_is_deterministic() {
        let mut world_a = build_test_world(42);
        let mut sim_a = Simulation::new(&world_a);
        let mut world_b = build_test_world(42);
        let mut sim_b = Simulation::new(&world_b);

        for _ in 0..30 {
            sim_a.advance_tick(&mut world_a);
            sim_b.advance_tick(&mut world_b);
        }

        assert_eq!(world_a.weather, world_b.weather, "Weather diverged");
        assert_eq!(world_a.species, world_b.species, "Species diverged");
        assert_eq!(
            world_a.ocean.temperature, world_b.ocean.temperature,
            "Ocean diverged"
        );
    }

    #[test]
    fn populations_never_negative_and_peaks_hold() {
        let mut world = build_test_world(7);
        let mut sim = Simulation::new(&world);
        for _ in 0..50 {
            sim.advance_tick(&mut world);
        }
        for s in &world.species {
            assert!(
                s.peak_population >= s.population,
                "{} peak below current",
                s.name
            );
        }
    }

    #[test]
    fn species_ids_stay_sorted_in_world() {
        let mut world = build_test_world(9);
        let mut sim = Simulation::new(&world);
        for _ in 0..20 {
            sim.advance_tick(&mut world);
        }
        let ids: Vec<u32> = world.species.iter().map(|s| s.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted, "World species must stay in ID order");
    }

    #[test]
    fn day_rollover_refreshes_wind_field() {
        let mut world = build_test_world(11);
        let mut sim = Simulation::new(&world);
        sim.advance_tick(&mut world);
        let winds_day_one = sim.winds.clone();

        // Jump to the middle of the year: declination and winds shift.
        world.tick_count = TICKS_PER_DAY * 182 - 1;
        sim.advance_tick(&mut world);
        assert_ne!(
            winds_day_one, sim.winds,
            "Seasonal change should move the wind field"
        );
    }

    #[test]
    fn oxygen_rises_with_flora() {
        let mut world = build_test_world(13);
        let mut sim = Simulation::new(&world);
        let before = sim.oxygen();
        for _ in 0..10 {
            sim.advance_tick(&mut world);
        }
        assert!(
            sim.oxygen() >= before,
            "Flora should not reduce oxygen: {} -> {}",
            before,
            sim.oxygen()
        );
        assert!(sim.oxygen() <= 0.40);
    }
}
