use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::rng::CellRng;

/// World configuration as produced by the interview layer: human
/// descriptive strings. Parsers are lenient; anything unrecognized falls
/// back to a documented default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// "small" | "medium" | "large".
    pub planet_size: String,
    /// e.g. "30% land, archipelagos".
    pub land_water_ratio: String,
    /// frozen | cold | temperate | warm | tropical | hot | varied.
    pub climate_range: String,
    /// 0–10.
    pub tech_level: f64,
    /// 0–10.
    pub magic_level: f64,
    /// young | mature | ancient.
    pub geological_age: String,
    pub sentient_species: Vec<String>,
    pub resource_distribution: HashMap<String, f64>,
    pub simulation_flags: HashMap<String, bool>,
    /// Optional override: fraction of the surface below water.
    pub sea_level: Option<f64>,
    /// Deterministic run when set; absent means a random seed.
    pub seed: Option<u64>,
}

impl WorldConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("Invalid TOML in {}: {}", path.display(), e))
    }
}

/// Configuration after parsing, with every knob resolved to a number the
/// pipeline consumes directly. Fully determined by `(config, seed)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub seed: u64,
    pub resolution: u32,
    pub plate_count: u32,
    pub land_water_ratio: f64,
    pub temperature_range: (f64, f64),
    pub precipitation_range: (f64, f64),
    pub mineral_density: f64,
    pub erosion_rate: f64,
    pub bio_diversity_rate: f64,
    pub initial_species_count: usize,
    pub simulate_geology: bool,
    pub simulate_life: bool,
    pub diseases_enabled: bool,
}

impl ResolvedConfig {
    /// Resolve a raw configuration against a concrete seed.
    pub fn resolve(config: &WorldConfig, seed: u64) -> Result<Self, WorldError> {
        let (resolution, plate_count) = parse_planet_size(&config.planet_size);

        let land_water_ratio = match config.sea_level {
            // The override expresses water fraction; land is the remainder.
            Some(value) => 1.0 - value.clamp(0.0, 1.0),
            None => parse_land_ratio(&config.land_water_ratio)?,
        };

        let (temperature_range, precipitation_range) = parse_climate_range(&config.climate_range);

        if !(0.0..=10.0).contains(&config.tech_level) {
            return Err(WorldError::config(
                "techLevel",
                format!("must be 0-10, got {}", config.tech_level),
            ));
        }
        if !(0.0..=10.0).contains(&config.magic_level) {
            return Err(WorldError::config(
                "magicLevel",
                format!("must be 0-10, got {}", config.magic_level),
            ));
        }
        let mineral_density = ((config.tech_level + config.magic_level) / 20.0).clamp(0.1, 1.0);

        let (erosion_rate, bio_diversity_rate) = parse_geological_age(&config.geological_age);

        let mut rng = CellRng::new(seed ^ 0x5EED_C0DE);
        let base = 3 * config.sentient_species.len() + 5 + rng.index(6);
        let initial_species_count = base.clamp(10, 50);

        let flag = |name: &str, default: bool| -> bool {
            config.simulation_flags.get(name).copied().unwrap_or(default)
        };
        let only_geology = flag("only_geology", false);
        let only_life = flag("only_life", false);
        if only_geology && only_life {
            return Err(WorldError::config(
                "simulationFlags",
                "only_geology and only_life are mutually exclusive",
            ));
        }
        let simulate_geology = flag("simulate_geology", true) && !only_life;
        let simulate_life = flag("simulate_life", true) && !only_geology;
        let diseases_enabled = !flag("disable_diseases", false);

        Ok(Self {
            seed,
            resolution,
            plate_count,
            land_water_ratio,
            temperature_range,
            precipitation_range,
            mineral_density,
            erosion_rate,
            bio_diversity_rate,
            initial_species_count,
            simulate_geology,
            simulate_life,
            diseases_enabled,
        })
    }

    /// Additive offset applied to the latitude temperature profile so the
    /// world's mean lands inside the configured range.
    pub fn global_temperature_modifier(&self) -> f64 {
        (self.temperature_range.0 + self.temperature_range.1) / 2.0 - 10.0
    }
}

fn parse_planet_size(text: &str) -> (u32, u32) {
    let lower = text.to_lowercase();
    if lower.contains("small") {
        (100, 3)
    } else if lower.contains("large") {
        (500, 8)
    } else {
        // "medium" and anything unrecognized.
        (200, 5)
    }
}

/// Parse "N% land…" descriptions. The first number found is the land
/// percentage, clamped to [0.1, 1.0]; no number means the 0.3 default.
fn parse_land_ratio(text: &str) -> Result<f64, WorldError> {
    let mut digits = String::new();
    for ch in text.chars() {
        if ch.is_ascii_digit() || (ch == '.' && !digits.is_empty()) {
            digits.push(ch);
        } else if !digits.is_empty() {
            break;
        }
    }
    if digits.is_empty() {
        return Ok(0.3);
    }
    let percent: f64 = digits
        .parse()
        .map_err(|_| WorldError::config("landWaterRatio", format!("unparseable '{}'", text)))?;
    Ok((percent / 100.0).clamp(0.1, 1.0))
}

fn parse_climate_range(text: &str) -> ((f64, f64), (f64, f64)) {
    match text.to_lowercase().trim() {
        "frozen" => ((-40.0, 0.0), (0.0, 400.0)),
        "cold" => ((-20.0, 10.0), (100.0, 600.0)),
        "warm" => ((0.0, 32.0), (400.0, 1500.0)),
        "tropical" => ((10.0, 38.0), (800.0, 2400.0)),
        "hot" => ((5.0, 45.0), (50.0, 800.0)),
        "varied" => ((-30.0, 40.0), (100.0, 2000.0)),
        // "temperate" and anything unrecognized.
        _ => ((-10.0, 25.0), (300.0, 1200.0)),
    }
}

fn parse_geological_age(text: &str) -> (f64, f64) {
    match text.to_lowercase().trim() {
        "young" => (0.3, 0.7),
        "ancient" => (2.5, 1.5),
        // "mature" and anything unrecognized.
        _ => (1.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> WorldConfig {
        WorldConfig {
            planet_size: "medium".to_string(),
            land_water_ratio: "30% land".to_string(),
            climate_range: "temperate".to_string(),
            tech_level: 5.0,
            magic_level: 3.0,
            geological_age: "mature".to_string(),
            sentient_species: vec!["elves".to_string(), "dwarves".to_string()],
            resource_distribution: HashMap::new(),
            simulation_flags: HashMap::new(),
            sea_level: None,
            seed: Some(42),
        }
    }

    #[test]
    fn planet_sizes() {
        assert_eq!(parse_planet_size("small"), (100, 3));
        assert_eq!(parse_planet_size("a Medium world"), (200, 5));
        assert_eq!(parse_planet_size("LARGE"), (500, 8));
        assert_eq!(parse_planet_size("gigantic?"), (200, 5), "Unknown -> medium");
    }

    #[test]
    fn land_ratio_parsing() {
        assert_eq!(parse_land_ratio("30% land").unwrap(), 0.3);
        assert_eq!(parse_land_ratio("mostly water, 15% land").unwrap(), 0.15);
        assert_eq!(parse_land_ratio("5% land").unwrap(), 0.1, "Clamped to 0.1");
        assert_eq!(parse_land_ratio("150% land").unwrap(), 1.0, "Clamped to 1.0");
        assert_eq!(parse_land_ratio("no numbers here").unwrap(), 0.3, "Default");
    }

    #[test]
    fn climate_ranges() {
        let (temp, precip) = parse_climate_range("frozen");
        assert!(temp.1 <= 0.0);
        assert!(precip.1 <= 400.0);
        let (temp, _) = parse_climate_range("tropical");
        assert!(temp.0 >= 10.0);
        assert_eq!(
            parse_climate_range("something else"),
            parse_climate_range("temperate"),
            "Unknown falls back to temperate"
        );
    }

    #[test]
    fn geological_ages() {
        assert_eq!(parse_geological_age("young"), (0.3, 0.7));
        assert_eq!(parse_geological_age("mature"), (1.0, 1.0));
        assert_eq!(parse_geological_age("ancient"), (2.5, 1.5));
        assert_eq!(parse_geological_age("???"), (1.0, 1.0));
    }

    #[test]
    fn resolve_mineral_density() {
        let mut config = base_config();
        config.tech_level = 5.0;
        config.magic_level = 3.0;
        let resolved = ResolvedConfig::resolve(&config, 42).unwrap();
        assert!((resolved.mineral_density - 0.4).abs() < 1e-9);

        config.tech_level = 0.0;
        config.magic_level = 0.0;
        let resolved = ResolvedConfig::resolve(&config, 42).unwrap();
        assert_eq!(resolved.mineral_density, 0.1, "Floor at 0.1");
    }

    #[test]
    fn resolve_rejects_out_of_range_tech() {
        let mut config = base_config();
        config.tech_level = 15.0;
        let err = ResolvedConfig::resolve(&config, 1).unwrap_err();
        assert!(err.to_string().contains("techLevel"), "Error: {}", err);
    }

    #[test]
    fn species_count_formula_and_clamp() {
        let mut config = base_config();
        // 2 sentients: 6 + 5..=10 -> 11..=16.
        let resolved = ResolvedConfig::resolve(&config, 42).unwrap();
        assert!(
            (11..=16).contains(&resolved.initial_species_count),
            "Got {}",
            resolved.initial_species_count
        );

        config.sentient_species.clear();
        let resolved = ResolvedConfig::resolve(&config, 42).unwrap();
        assert_eq!(resolved.initial_species_count, 10, "Clamped up to 10");

        config.sentient_species = (0..30).map(|i| format!("s{}", i)).collect();
        let resolved = ResolvedConfig::resolve(&config, 42).unwrap();
        assert_eq!(resolved.initial_species_count, 50, "Clamped down to 50");
    }

    #[test]
    fn species_count_deterministic_per_seed() {
        let config = base_config();
        let a = ResolvedConfig::resolve(&config, 42).unwrap();
        let b = ResolvedConfig::resolve(&config, 42).unwrap();
        assert_eq!(a.initial_species_count, b.initial_species_count);
    }

    #[test]
    fn sea_level_override_inverts_to_land_ratio() {
        let mut config = base_config();
        config.sea_level = Some(0.8);
        let resolved = ResolvedConfig::resolve(&config, 1).unwrap();
        assert!((resolved.land_water_ratio - 0.2).abs() < 1e-9);

        config.sea_level = Some(2.0);
        let resolved = ResolvedConfig::resolve(&config, 1).unwrap();
        assert_eq!(resolved.land_water_ratio, 0.0, "Clamped water fraction");
    }

    #[test]
    fn simulation_flags() {
        let mut config = base_config();
        let resolved = ResolvedConfig::resolve(&config, 1).unwrap();
        assert!(resolved.simulate_geology);
        assert!(resolved.simulate_life);
        assert!(resolved.diseases_enabled);

        config
            .simulation_flags
            .insert("only_geology".to_string(), true);
        let resolved = ResolvedConfig::resolve(&config, 1).unwrap();
        assert!(resolved.simulate_geology);
        assert!(!resolved.simulate_life);

        config.simulation_flags.clear();
        config
            .simulation_flags
            .insert("only_life".to_string(), true);
        let resolved = ResolvedConfig::resolve(&config, 1).unwrap();
        assert!(!resolved.simulate_geology);
        assert!(resolved.simulate_life);

        config
            .simulation_flags
            .insert("only_geology".to_string(), true);
        assert!(ResolvedConfig::resolve(&config, 1).is_err());

        config.simulation_flags.clear();
        config
            .simulation_flags
            .insert("disable_diseases".to_string(), true);
        let resolved = ResolvedConfig::resolve(&config, 1).unwrap();
        assert!(!resolved.diseases_enabled);
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
planet_size = "small"
land_water_ratio = "45% land"
climate_range = "tropical"
tech_level = 2.0
magic_level = 8.0
geological_age = "ancient"
sentient_species = ["merfolk"]
seed = 7
"#;
        let config: WorldConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.planet_size, "small");
        assert_eq!(config.seed, Some(7));
        let resolved = ResolvedConfig::resolve(&config, 7).unwrap();
        assert_eq!(resolved.resolution, 100);
        assert_eq!(resolved.plate_count, 3);
        assert!((resolved.land_water_ratio - 0.45).abs() < 1e-9);
        assert_eq!(resolved.erosion_rate, 2.5);
    }
}
