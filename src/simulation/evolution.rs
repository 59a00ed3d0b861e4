use tracing::debug;

use crate::rng::{CellRng, SeedSplitter};
use crate::world::cell::Biome;
use crate::world::species::{Species, SpeciesRegistry, SpeciesType, ToleranceRange};

/// Fraction of the parent population a newly split species starts with.
const SPECIATION_POPULATION_SHARE: f64 = 0.1;
/// Trait divergence beyond which a variant becomes its own species.
const SPECIATION_THRESHOLD: f64 = 0.5;

/// Environmental inputs to a fitness evaluation, already averaged over the
/// species' occupied range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitnessInputs {
    /// Ambient temperature, °C.
    pub temperature: f64,
    /// Annual moisture, mm.
    pub moisture: f64,
    /// Food availability 0–1.
    pub food_availability: f64,
    /// Predation pressure 0–1.
    pub predation_rate: f64,
    /// Interspecific competition factor 0–1 (1 = no competition).
    pub competition: f64,
}

/// Multiplicative fitness: climate fit (geometric mean of temperature and
/// moisture tolerance fits), food, predation escape, and competition.
pub fn fitness_score(species: &Species, inputs: &FitnessInputs) -> f64 {
    let temp_fit = species.temperature_tolerance.fitness(inputs.temperature);
    let moist_fit = species.moisture_tolerance.fitness(inputs.moisture);
    let climate = (temp_fit * moist_fit).sqrt();

    let defense = (species.speed + species.camouflage + species.armor) / 3.0 / 100.0;
    let predation = 1.0 - inputs.predation_rate * (1.0 - defense);

    (climate * inputs.food_availability.clamp(0.0, 1.0)
        * predation.clamp(0.0, 1.0)
        * inputs.competition.clamp(0.0, 1.0))
    .clamp(0.0, 1.0)
}

/// Final survival probability folds in the species' own extinction risk.
pub fn survival_probability(species: &Species, fitness: f64) -> f64 {
    (fitness * (1.0 - species.extinction_risk)).clamp(0.0, 1.0)
}

/// Draw the effective mutation rate: 1–5% normally, 10–15% for species
/// squeezed through a population bottleneck.
pub fn effective_mutation_rate(species: &Species, rng: &mut CellRng) -> f64 {
    if species.is_bottlenecked() {
        rng.range(0.10, 0.15)
    } else {
        rng.range(0.01, 0.05)
    }
}

fn perturb(value: f64, rng: &mut CellRng) -> f64 {
    value * (1.0 + rng.range(-0.10, 0.10))
}

/// One mutation event: every heritable trait shifts by up to ±10%.
/// Returns the mutated variant; the input species is untouched.
pub fn mutate_traits(species: &Species, rng: &mut CellRng) -> Species {
    let mut variant = species.clone();
    variant.size = perturb(species.size, rng).max(0.01);
    variant.speed = perturb(species.speed, rng).clamp(0.0, 100.0);
    variant.armor = perturb(species.armor, rng).clamp(0.0, 100.0);
    variant.camouflage = perturb(species.camouflage, rng).clamp(0.0, 100.0);
    variant.calories_per_day = perturb(species.calories_per_day, rng).max(1.0);
    variant.reproduction_rate = perturb(species.reproduction_rate, rng).max(0.01);
    variant.lifespan = perturb(species.lifespan, rng).max(0.1);

    let tolerance_factor = 1.0 + rng.range(-0.10, 0.10);
    variant.temperature_tolerance = species.temperature_tolerance.scaled(tolerance_factor);
    variant.moisture_tolerance = species.moisture_tolerance.scaled(tolerance_factor);
    variant.elevation_tolerance = species.elevation_tolerance.scaled(tolerance_factor);
    variant
}

fn ratio_diverges(candidate: f64, reference: f64) -> bool {
    if reference.abs() < f64::EPSILON {
        return candidate.abs() > f64::EPSILON;
    }
    ((candidate - reference) / reference).abs() > SPECIATION_THRESHOLD
}

/// True when any heritable trait of `candidate` has drifted more than 50%
/// from the reference lineage values.
pub fn exceeds_speciation_threshold(candidate: &Species, reference: &Species) -> bool {
    ratio_diverges(candidate.size, reference.size)
        || ratio_diverges(candidate.speed, reference.speed)
        || ratio_diverges(candidate.armor, reference.armor)
        || ratio_diverges(candidate.camouflage, reference.camouflage)
        || ratio_diverges(candidate.calories_per_day, reference.calories_per_day)
        || ratio_diverges(candidate.reproduction_rate, reference.reproduction_rate)
        || ratio_diverges(candidate.lifespan, reference.lifespan)
}

/// Split a new species off the parent: the child takes the candidate's
/// traits, a tenth of the parent's population, the next generation number
/// and a parent link. The parent gives up that share of its population.
pub fn speciate(parent: &mut Species, candidate: Species, new_id: u32, name: String) -> Species {
    let child_population = ((parent.population as f64) * SPECIATION_POPULATION_SHARE) as u64;
    parent.population = parent.population.saturating_sub(child_population);

    let mut child = candidate;
    child.id = new_id;
    child.name = name;
    child.generation = parent.generation + 1;
    child.parent_species_id = Some(parent.id);
    child.population = child_population.max(1);
    child.peak_population = child.population;
    debug!(
        parent = parent.id,
        child = child.id,
        generation = child.generation,
        "Speciation event"
    );
    child
}

// === Genome operators ===

const GENOME_ALPHABET: [char; 4] = ['A', 'T', 'C', 'G'];

fn check_base(base: char) -> Result<(), String> {
    if GENOME_ALPHABET.contains(&base) {
        Ok(())
    } else {
        Err(format!("Base '{}' is not one of A/T/C/G", base))
    }
}

/// Replace the base at `pos`; length is preserved.
pub fn point_substitution(genome: &str, pos: usize, base: char) -> Result<String, String> {
    check_base(base)?;
    if pos >= genome.len() {
        return Err(format!("Position {} out of range (len {})", pos, genome.len()));
    }
    let mut chars: Vec<char> = genome.chars().collect();
    chars[pos] = base;
    Ok(chars.into_iter().collect())
}

/// Insert a base before `pos`; length grows by one.
pub fn insertion(genome: &str, pos: usize, base: char) -> Result<String, String> {
    check_base(base)?;
    if pos > genome.len() {
        return Err(format!("Position {} out of range (len {})", pos, genome.len()));
    }
    let mut chars: Vec<char> = genome.chars().collect();
    chars.insert(pos, base);
    Ok(chars.into_iter().collect())
}

/// Remove the base at `pos`; length shrinks by one.
pub fn deletion(genome: &str, pos: usize) -> Result<String, String> {
    if pos >= genome.len() {
        return Err(format!("Position {} out of range (len {})", pos, genome.len()));
    }
    let mut chars: Vec<char> = genome.chars().collect();
    chars.remove(pos);
    Ok(chars.into_iter().collect())
}

/// Duplicate a segment of 3–5 bases starting at `start`, inserting the copy
/// immediately after the original.
pub fn segment_duplication(genome: &str, start: usize, len: usize) -> Result<String, String> {
    if !(3..=5).contains(&len) {
        return Err(format!("Duplication length must be 3-5, got {}", len));
    }
    if start + len > genome.len() {
        return Err(format!(
            "Segment {}..{} out of range (len {})",
            start,
            start + len,
            genome.len()
        ));
    }
    let chars: Vec<char> = genome.chars().collect();
    let mut result: Vec<char> = Vec::with_capacity(chars.len() + len);
    result.extend_from_slice(&chars[..start + len]);
    result.extend_from_slice(&chars[start..start + len]);
    result.extend_from_slice(&chars[start + len..]);
    Ok(result.into_iter().collect())
}

// === Genetic drift ===

/// Wright-Fisher drift of a single biallelic locus: each generation
/// resamples the allele count binomially from the previous frequency.
/// Returns the frequency trajectory, one entry per generation. Fully
/// deterministic in the seed.
pub fn simulate_genetic_drift(
    seed: u64,
    generations: usize,
    population: u64,
    initial_frequency: f64,
) -> Vec<f64> {
    let mut rng = CellRng::new(seed);
    let mut freq = initial_frequency.clamp(0.0, 1.0);
    let mut trajectory = Vec::with_capacity(generations);

    for _ in 0..generations {
        if population == 0 {
            trajectory.push(freq);
            continue;
        }
        let mut carriers = 0u64;
        for _ in 0..population {
            if rng.next_f64() < freq {
                carriers += 1;
            }
        }
        freq = carriers as f64 / population as f64;
        trajectory.push(freq);
    }
    trajectory
}

// === Initial roster ===

/// Generate the starting species roster for a world: flora first, then
/// herbivores grazing on them, then carnivores and omnivores keyed to the
/// herbivores. Counts are decided by the orchestrator.
pub fn generate_initial_species(
    count: usize,
    available_biomes: &[Biome],
    seeds: &SeedSplitter,
) -> SpeciesRegistry {
    let mut rng = seeds.cell_rng("species");
    let mut registry = SpeciesRegistry::new();

    let land_biomes: Vec<Biome> = available_biomes
        .iter()
        .copied()
        .filter(|b| *b != Biome::Ocean)
        .collect();
    let pick_biome = |rng: &mut CellRng| -> Biome {
        if land_biomes.is_empty() {
            Biome::Grassland
        } else {
            land_biomes[rng.index(land_biomes.len())]
        }
    };

    let flora_count = (count / 3).max(1);
    let herbivore_count = (count / 3).max(1);
    let carnivore_count = count.saturating_sub(flora_count + herbivore_count).max(1);

    let mut flora_ids = Vec::new();
    for n in 0..flora_count {
        let id = registry.allocate_id();
        flora_ids.push(id);
        let biome = pick_biome(&mut rng);
        let species = Species {
            id,
            name: format!("flora-{}", n),
            kind: SpeciesType::Flora,
            generation: 0,
            size: rng.range(0.1, 3.0),
            speed: 0.0,
            armor: rng.range(0.0, 20.0),
            camouflage: rng.range(0.0, 40.0),
            calories_per_day: 0.0,
            preferred_prey: Vec::new(),
            preferred_plants: Vec::new(),
            preferred_biomes: vec![biome],
            temperature_tolerance: ToleranceRange::new(
                rng.range(-10.0, 0.0),
                rng.range(5.0, 20.0),
                rng.range(25.0, 40.0),
            ),
            moisture_tolerance: ToleranceRange::new(
                rng.range(0.0, 200.0),
                rng.range(400.0, 1000.0),
                rng.range(1200.0, 2000.0),
            ),
            elevation_tolerance: ToleranceRange::new(0.0, rng.range(100.0, 800.0), 3000.0),
            reproduction_rate: rng.range(2.0, 8.0),
            maturity_age: rng.range(0.1, 1.0),
            lifespan: rng.range(1.0, 80.0),
            population: rng.range(50_000.0, 200_000.0) as u64,
            peak_population: 0,
            extinction_risk: rng.range(0.01, 0.1),
            mutation_rate: rng.range(0.01, 0.05),
            fitness_score: 0.5,
            parent_species_id: None,
        };
        let mut s = species;
        s.peak_population = s.population;
        registry.insert(s).expect("generated flora must be valid");
    }

    let mut herbivore_ids = Vec::new();
    for n in 0..herbivore_count {
        let id = registry.allocate_id();
        herbivore_ids.push(id);
        let biome = pick_biome(&mut rng);
        let plants = vec![flora_ids[rng.index(flora_ids.len())]];
        let mut s = Species {
            id,
            name: format!("herbivore-{}", n),
            kind: SpeciesType::Herbivore,
            generation: 0,
            size: rng.range(0.2, 4.0),
            speed: rng.range(20.0, 70.0),
            armor: rng.range(0.0, 50.0),
            camouflage: rng.range(10.0, 60.0),
            calories_per_day: rng.range(800.0, 6000.0),
            preferred_prey: Vec::new(),
            preferred_plants: plants,
            preferred_biomes: vec![biome],
            temperature_tolerance: ToleranceRange::new(
                rng.range(-15.0, 0.0),
                rng.range(5.0, 25.0),
                rng.range(28.0, 42.0),
            ),
            moisture_tolerance: ToleranceRange::new(
                rng.range(0.0, 300.0),
                rng.range(400.0, 1100.0),
                rng.range(1300.0, 2000.0),
            ),
            elevation_tolerance: ToleranceRange::new(0.0, rng.range(100.0, 1200.0), 3500.0),
            reproduction_rate: rng.range(0.8, 4.0),
            maturity_age: rng.range(0.5, 4.0),
            lifespan: rng.range(4.0, 30.0),
            population: rng.range(10_000.0, 60_000.0) as u64,
            peak_population: 0,
            extinction_risk: rng.range(0.02, 0.15),
            mutation_rate: rng.range(0.01, 0.05),
            fitness_score: 0.5,
            parent_species_id: None,
        };
        s.peak_population = s.population;
        registry.insert(s).expect("generated herbivore must be valid");
    }

    for n in 0..carnivore_count {
        let id = registry.allocate_id();
        let biome = pick_biome(&mut rng);
        let omnivore = rng.next_f64() < 0.3;
        let prey = vec![herbivore_ids[rng.index(herbivore_ids.len())]];
        let plants = if omnivore {
            vec![flora_ids[rng.index(flora_ids.len())]]
        } else {
            Vec::new()
        };
        let mut s = Species {
            id,
            name: format!("{}-{}", if omnivore { "omnivore" } else { "carnivore" }, n),
            kind: if omnivore {
                SpeciesType::Omnivore
            } else {
                SpeciesType::Carnivore
            },
            generation: 0,
            size: rng.range(0.5, 6.0),
            speed: rng.range(30.0, 90.0),
            armor: rng.range(5.0, 40.0),
            camouflage: rng.range(10.0, 70.0),
            calories_per_day: rng.range(2000.0, 12_000.0),
            preferred_prey: prey,
            preferred_plants: plants,
            preferred_biomes: vec![biome],
            temperature_tolerance: ToleranceRange::new(
                rng.range(-20.0, -5.0),
                rng.range(0.0, 22.0),
                rng.range(26.0, 40.0),
            ),
            moisture_tolerance: ToleranceRange::new(
                rng.range(0.0, 250.0),
                rng.range(350.0, 1000.0),
                rng.range(1200.0, 2000.0),
            ),
            elevation_tolerance: ToleranceRange::new(0.0, rng.range(200.0, 1500.0), 4000.0),
            reproduction_rate: rng.range(0.3, 2.0),
            maturity_age: rng.range(1.0, 5.0),
            lifespan: rng.range(6.0, 35.0),
            population: rng.range(1_000.0, 12_000.0) as u64,
            peak_population: 0,
            extinction_risk: rng.range(0.03, 0.2),
            mutation_rate: rng.range(0.01, 0.05),
            fitness_score: 0.5,
            parent_species_id: None,
        };
        s.peak_population = s.population;
        registry.insert(s).expect("generated carnivore must be valid");
    }

    registry
}
