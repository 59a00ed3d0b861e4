use serde::{Deserialize, Serialize};

use crate::world::topology::Coordinate;
use crate::world::vector::Vector3D;

// === Enums ===

/// Closed biome classification assigned by the weather stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    Ocean,
    Beach,
    Desert,
    Grassland,
    Savanna,
    TemperateForest,
    Rainforest,
    Taiga,
    Tundra,
    Alpine,
    Mountain,
    Wetland,
}

impl Biome {
    pub const ALL: [Biome; 12] = [
        Biome::Ocean,
        Biome::Beach,
        Biome::Desert,
        Biome::Grassland,
        Biome::Savanna,
        Biome::TemperateForest,
        Biome::Rainforest,
        Biome::Taiga,
        Biome::Tundra,
        Biome::Alpine,
        Biome::Mountain,
        Biome::Wetland,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Biome::Ocean => "Ocean",
            Biome::Beach => "Beach",
            Biome::Desert => "Desert",
            Biome::Grassland => "Grassland",
            Biome::Savanna => "Savanna",
            Biome::TemperateForest => "Temperate Forest",
            Biome::Rainforest => "Rainforest",
            Biome::Taiga => "Taiga",
            Biome::Tundra => "Tundra",
            Biome::Alpine => "Alpine",
            Biome::Mountain => "Mountain",
            Biome::Wetland => "Wetland",
        }
    }
}

/// Instantaneous weather classification for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherKind {
    Clear,
    Cloudy,
    Rain,
    Storm,
    Snow,
}

// === Climate and weather ===

/// Long-term climate summary per cell, produced once by the weather stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateData {
    /// Mean surface temperature in °C.
    pub temperature: f64,
    /// Annual rainfall in mm.
    pub annual_rainfall: f64,
    /// Seasonal swing strength, 0 (equatorial) to 1.
    pub seasonality: f64,
    /// Soil drainage, 0 (waterlogged) to 1 (fast-draining).
    pub soil_drainage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Bearing the wind blows toward, degrees (0 = N, 90 = E).
    pub direction_deg: f64,
    /// Speed in m/s.
    pub speed: f64,
}

/// Weather for one cell at one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherState {
    pub timestamp: u64,
    pub state: WeatherKind,
    pub temperature: f64,
    /// Precipitation for the tick, mm.
    pub precipitation: f64,
    pub wind: Wind,
    /// Relative humidity 0–100.
    pub humidity: f64,
    /// Visibility in meters.
    pub visibility: f64,
}

// === Geography ===

/// Read-only view of a cell consumed by the weather and ocean systems.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographyCell {
    pub cell_id: u64,
    pub sphere_coord: Option<Vector3D>,
    /// Elevation in meters relative to the datum (not sea level).
    pub elevation: f64,
    pub is_ocean: bool,
    /// River width in meters; 0 when no river passes through.
    pub river_width: f64,
    /// Latitude-derived base temperature in °C before weather modifiers.
    pub base_temperature: f64,
}

/// Elevation field over all six faces, in meters, with observed extremes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SphereHeightmap {
    resolution: u32,
    data: Vec<f64>,
    pub min_elev: f64,
    pub max_elev: f64,
}

impl SphereHeightmap {
    pub fn new(resolution: u32) -> Self {
        let cells = 6 * resolution as usize * resolution as usize;
        Self {
            resolution,
            data: vec![0.0; cells],
            min_elev: 0.0,
            max_elev: 0.0,
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn index(&self, c: Coordinate) -> usize {
        let r = self.resolution as usize;
        c.face as usize * r * r + c.y as usize * r + c.x as usize
    }

    pub fn get(&self, c: Coordinate) -> f64 {
        self.data[self.index(c)]
    }

    pub fn get_index(&self, i: usize) -> f64 {
        self.data[i]
    }

    pub fn set(&mut self, c: Coordinate, elevation: f64) {
        let i = self.index(c);
        self.data[i] = elevation;
    }

    pub fn set_index(&mut self, i: usize, elevation: f64) {
        self.data[i] = elevation;
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Recompute min/max after a batch of edits.
    pub fn update_extremes(&mut self) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in &self.data {
            min = min.min(v);
            max = max.max(v);
        }
        self.min_elev = if min.is_finite() { min } else { 0.0 };
        self.max_elev = if max.is_finite() { max } else { 0.0 };
    }
}

/// A tectonic plate: a seed cell, a tangent velocity, and the cells along
/// its boundary with neighboring plates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plate {
    pub id: u32,
    pub seed_coordinate: Coordinate,
    pub velocity: Vector3D,
    pub boundary_coordinates: Vec<Coordinate>,
}

/// Terrain output of the geography stage. Biomes are filled in later by the
/// weather stage once climate data exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldMap {
    pub heightmap: SphereHeightmap,
    pub plates: Vec<Plate>,
    /// Biome per cell, indexed like the heightmap.
    pub biomes: Vec<Biome>,
    /// Rivers as ordered coordinate paths from source to sea.
    pub rivers: Vec<Vec<Coordinate>>,
    /// Elevation threshold separating ocean from land, meters.
    pub sea_level: f64,
}

// === Minerals and satellites ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MineralKind {
    Iron,
    Copper,
    Coal,
    Gold,
    Silver,
    Gems,
    Crystal,
}

impl MineralKind {
    pub const ALL: [MineralKind; 7] = [
        MineralKind::Iron,
        MineralKind::Copper,
        MineralKind::Coal,
        MineralKind::Gold,
        MineralKind::Silver,
        MineralKind::Gems,
        MineralKind::Crystal,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MineralDeposit {
    pub kind: MineralKind,
    pub coordinate: Coordinate,
    /// Extractable quantity in abstract units.
    pub quantity: f64,
}

/// A natural satellite contributing to tides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Satellite {
    pub name: String,
    pub mass_kg: f64,
    pub distance_m: f64,
}

// === Ocean ===

/// Sea-surface state per cell. Land cells carry zeroed entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OceanState {
    /// Sea-surface temperature in °C.
    pub temperature: Vec<f64>,
    /// Surface current as a tangent vector in 3-D space; magnitude in m/s.
    pub currents: Vec<Vector3D>,
}

impl OceanState {
    pub fn empty(cell_count: usize) -> Self {
        Self {
            temperature: vec![0.0; cell_count],
            currents: vec![Vector3D::ZERO; cell_count],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heightmap_get_set_round_trip() {
        let mut hm = SphereHeightmap::new(8);
        let c = Coordinate::new(3, 2, 5);
        hm.set(c, 1234.5);
        assert_eq!(hm.get(c), 1234.5);
        assert_eq!(hm.len(), 6 * 64);
    }

    #[test]
    fn heightmap_extremes_track_data() {
        let mut hm = SphereHeightmap::new(4);
        hm.set(Coordinate::new(0, 0, 0), -500.0);
        hm.set(Coordinate::new(5, 3, 3), 2000.0);
        hm.update_extremes();
        assert_eq!(hm.min_elev, -500.0);
        assert_eq!(hm.max_elev, 2000.0);
    }

    #[test]
    fn biome_serde_round_trip() {
        for b in Biome::ALL {
            let encoded = bincode::serialize(&b).expect("serialize");
            let decoded: Biome = bincode::deserialize(&encoded).expect("deserialize");
            assert_eq!(b, decoded);
        }
    }

    #[test]
    fn weather_state_serde_round_trip() {
        let state = WeatherState {
            timestamp: 42,
            state: WeatherKind::Storm,
            temperature: 18.5,
            precipitation: 25.0,
            wind: Wind {
                direction_deg: 270.0,
                speed: 17.0,
            },
            humidity: 88.0,
            visibility: 1200.0,
        };
        let encoded = bincode::serialize(&state).expect("serialize");
        let decoded: WeatherState = bincode::deserialize(&encoded).expect("deserialize");
        assert_eq!(state, decoded);
    }

    #[test]
    fn mineral_kinds_all_distinct() {
        for (i, a) in MineralKind::ALL.iter().enumerate() {
            for b in &MineralKind::ALL[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
