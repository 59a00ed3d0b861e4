use noise::{NoiseFn, Perlin};
use tracing::debug;

use crate::rng::{CellRng, SeedSplitter};
use crate::world::cell::{Biome, Plate, SphereHeightmap, WorldMap};
use crate::world::topology::{Coordinate, CubeSphere};
use crate::world::vector::Vector3D;

/// Parameters consumed by the geography stage, already resolved by the
/// orchestrator from the world configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GeographyParams {
    pub plate_count: u32,
    /// Fraction of the surface that should end up above sea level.
    pub land_water_ratio: f64,
    /// Scales erosion iteration counts (geological age).
    pub erosion_rate: f64,
    /// Scales hydraulic erosion strength.
    pub rainfall_factor: f64,
}

const BOUNDARY_UPLIFT: f64 = 2400.0;
const BOUNDARY_RIFT: f64 = -1100.0;
const NOISE_AMPLITUDE: f64 = 900.0;
const TALUS_THRESHOLD: f64 = 60.0;
const RIVER_SOURCE_FRACTION: f64 = 0.55;
const RIVER_MIN_LENGTH: usize = 5;

/// Run the full geography pipeline: plates, heightmap, erosion, sea level,
/// rivers. Biomes stay provisional (ocean/land only) until the weather
/// stage classifies them from climate data.
pub fn build_geography(
    topo: &CubeSphere,
    params: &GeographyParams,
    seeds: &SeedSplitter,
) -> Result<WorldMap, String> {
    if !(3..=8).contains(&params.plate_count) {
        return Err(format!(
            "plate_count must be 3-8, got {}",
            params.plate_count
        ));
    }

    let (plates, plate_of) = generate_plates(topo, params.plate_count, seeds);
    let mut heightmap = initial_heightmap(topo, &plates, &plate_of, seeds);
    erode(topo, &mut heightmap, params);
    heightmap.update_extremes();

    let sea_level = assign_ocean_land(&heightmap, params.land_water_ratio);
    let rivers = trace_rivers(topo, &heightmap, sea_level);

    let biomes: Vec<Biome> = heightmap
        .values()
        .iter()
        .map(|&e| if e <= sea_level { Biome::Ocean } else { Biome::Grassland })
        .collect();

    debug!(
        plates = plates.len(),
        rivers = rivers.len(),
        sea_level,
        "Geography stage complete"
    );

    Ok(WorldMap {
        heightmap,
        plates,
        biomes,
        rivers,
        sea_level,
    })
}

/// Draw K plate seeds on the sphere and label every cell with its nearest
/// seed by great-circle distance. Boundaries are cells with at least one
/// differently-labeled cardinal neighbor.
pub fn generate_plates(
    topo: &CubeSphere,
    count: u32,
    seeds: &SeedSplitter,
) -> (Vec<Plate>, Vec<u32>) {
    let mut rng = seeds.cell_rng("plates");

    let mut seed_coords: Vec<Coordinate> = Vec::with_capacity(count as usize);
    let mut seed_points: Vec<Vector3D> = Vec::with_capacity(count as usize);
    while seed_coords.len() < count as usize {
        let v = random_unit_vector(&mut rng);
        let c = topo.from_vector(v);
        if !seed_coords.contains(&c) {
            seed_points.push(topo.to_sphere(c));
            seed_coords.push(c);
        }
    }

    // Nearest seed by maximum dot product (equivalent to minimum arc).
    let plate_of: Vec<u32> = (0..topo.cell_count())
        .map(|i| {
            let p = topo.to_sphere(topo.coordinate_of(i));
            let mut best = 0u32;
            let mut best_dot = f64::NEG_INFINITY;
            for (k, s) in seed_points.iter().enumerate() {
                let d = p.dot(*s);
                if d > best_dot {
                    best_dot = d;
                    best = k as u32;
                }
            }
            best
        })
        .collect();

    let mut vel_rng = seeds.cell_rng("plate-velocity");
    let mut plates: Vec<Plate> = seed_coords
        .iter()
        .enumerate()
        .map(|(k, &c)| Plate {
            id: k as u32,
            seed_coordinate: c,
            velocity: random_tangent(&mut vel_rng, seed_points[k]),
            boundary_coordinates: Vec::new(),
        })
        .collect();

    for i in 0..topo.cell_count() {
        let c = topo.coordinate_of(i);
        let label = plate_of[i];
        let is_boundary = topo
            .cardinal_neighbors(c)
            .iter()
            .any(|&n| plate_of[topo.cell_index(n)] != label);
        if is_boundary {
            plates[label as usize].boundary_coordinates.push(c);
        }
    }

    (plates, plate_of)
}

fn random_unit_vector(rng: &mut CellRng) -> Vector3D {
    // Rejection sample within the unit ball, then project to the surface.
    loop {
        let v = Vector3D::new(
            rng.range(-1.0, 1.0),
            rng.range(-1.0, 1.0),
            rng.range(-1.0, 1.0),
        );
        let len = v.length();
        if len > 1e-3 && len <= 1.0 {
            return v.normalize();
        }
    }
}

/// Random velocity tangent to the sphere at `point`, in m/yr-equivalent
/// abstract units.
fn random_tangent(rng: &mut CellRng, point: Vector3D) -> Vector3D {
    loop {
        let raw = random_unit_vector(rng);
        let tangent = raw.sub(point.scale(raw.dot(point)));
        if tangent.length() > 1e-3 {
            return tangent.normalize().scale(rng.range(0.5, 2.0));
        }
    }
}

/// Seed the heightmap from plate interactions, then layer value noise.
///
/// Boundary cells are perturbed by the relative velocity of the plates that
/// meet there: convergent motion uplifts, divergent motion rifts.
fn initial_heightmap(
    topo: &CubeSphere,
    plates: &[Plate],
    plate_of: &[u32],
    seeds: &SeedSplitter,
) -> SphereHeightmap {
    let mut rng = seeds.cell_rng("plate-base");
    // Roughly half the plates ride high (continental), the rest sit low.
    let base_elevation: Vec<f64> = plates
        .iter()
        .map(|_| {
            if rng.next_f64() < 0.5 {
                rng.range(100.0, 900.0)
            } else {
                rng.range(-2200.0, -600.0)
            }
        })
        .collect();

    let mut heightmap = SphereHeightmap::new(topo.resolution());
    let perlin = Perlin::new(seeds.stream("heightmap") as u32);
    let detail = Perlin::new(seeds.stream("heightmap-detail") as u32);

    for i in 0..topo.cell_count() {
        let c = topo.coordinate_of(i);
        let p = topo.to_sphere(c);
        let plate = plate_of[i] as usize;

        // Layered value noise scaled by the plate interior.
        let coarse = perlin.get([p.x * 2.1, p.y * 2.1, p.z * 2.1]);
        let fine = detail.get([p.x * 6.7, p.y * 6.7, p.z * 6.7]);
        let noise_term = (coarse * 0.7 + fine * 0.3) * NOISE_AMPLITUDE;

        heightmap.set_index(i, base_elevation[plate] + noise_term);
    }

    // Boundary perturbations from relative plate motion.
    for plate in plates {
        for &c in &plate.boundary_coordinates {
            let i = topo.cell_index(c);
            let mine = plate_of[i];
            for n in topo.cardinal_neighbors(c) {
                let other = plate_of[topo.cell_index(n)];
                if other == mine {
                    continue;
                }
                let toward = topo.tangent_toward(c, n);
                let relative = plates[mine as usize]
                    .velocity
                    .sub(plates[other as usize].velocity);
                let closing = relative.dot(toward);
                let perturbation = if closing > 0.0 {
                    BOUNDARY_UPLIFT * closing.min(2.0) / 2.0
                } else {
                    BOUNDARY_RIFT * (-closing).min(2.0) / 2.0
                };
                heightmap.set_index(i, heightmap.get_index(i) + perturbation);
            }
        }
    }

    heightmap
}

/// Thermal erosion (relax steep slopes) followed by hydraulic erosion
/// (carry material along steepest descent). Iteration counts scale with
/// the erosion rate and rainfall factor.
fn erode(topo: &CubeSphere, heightmap: &mut SphereHeightmap, params: &GeographyParams) {
    let thermal_iters = (6.0 * params.erosion_rate).round().max(1.0) as usize;
    let hydraulic_iters = (4.0 * params.erosion_rate * params.rainfall_factor)
        .round()
        .max(1.0) as usize;

    for _ in 0..thermal_iters {
        let mut delta = vec![0.0_f64; topo.cell_count()];
        for i in 0..topo.cell_count() {
            let c = topo.coordinate_of(i);
            let here = heightmap.get_index(i);
            for n in topo.cardinal_neighbors(c) {
                let j = topo.cell_index(n);
                let diff = here - heightmap.get_index(j);
                if diff > TALUS_THRESHOLD {
                    let moved = (diff - TALUS_THRESHOLD) * 0.125;
                    delta[i] -= moved;
                    delta[j] += moved;
                }
            }
        }
        for (i, d) in delta.iter().enumerate() {
            heightmap.set_index(i, heightmap.get_index(i) + d);
        }
    }

    for _ in 0..hydraulic_iters {
        let mut delta = vec![0.0_f64; topo.cell_count()];
        for i in 0..topo.cell_count() {
            let c = topo.coordinate_of(i);
            let here = heightmap.get_index(i);
            if let Some((j, low)) = lowest_neighbor(topo, heightmap, c) {
                let diff = here - low;
                if diff > 0.0 {
                    // Carry a slice of the drop downhill; deposition at the
                    // receiving cell keeps total mass constant.
                    let moved = diff * 0.05 * params.rainfall_factor.min(2.0);
                    delta[i] -= moved;
                    delta[j] += moved * 0.6;
                }
            }
        }
        for (i, d) in delta.iter().enumerate() {
            heightmap.set_index(i, heightmap.get_index(i) + d);
        }
    }
}

fn lowest_neighbor(
    topo: &CubeSphere,
    heightmap: &SphereHeightmap,
    c: Coordinate,
) -> Option<(usize, f64)> {
    topo.cardinal_neighbors(c)
        .iter()
        .map(|&n| {
            let j = topo.cell_index(n);
            (j, heightmap.get_index(j))
        })
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
}

/// Binary-search the elevation threshold so that the fraction of cells
/// strictly above it matches `land_ratio`. Ratio 0 floods everything;
/// ratio 1 drains everything.
pub fn assign_ocean_land(heightmap: &SphereHeightmap, land_ratio: f64) -> f64 {
    let values = heightmap.values();
    if values.is_empty() {
        return 0.0;
    }
    let (min, max) = (heightmap.min_elev, heightmap.max_elev);
    if land_ratio <= 0.0 {
        return max + 1.0;
    }
    if land_ratio >= 1.0 {
        return min - 1.0;
    }

    let total = values.len() as f64;
    let mut lo = min - 1.0;
    let mut hi = max + 1.0;
    for _ in 0..64 {
        let mid = (lo + hi) / 2.0;
        let land = values.iter().filter(|&&v| v > mid).count() as f64 / total;
        if land > land_ratio {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    // Of the two bracketing thresholds, keep the one closest to the target.
    let land_lo = values.iter().filter(|&&v| v > lo).count() as f64 / total;
    let land_hi = values.iter().filter(|&&v| v > hi).count() as f64 / total;
    if (land_lo - land_ratio).abs() < (land_hi - land_ratio).abs() {
        lo
    } else {
        hi
    }
}

/// Trace rivers from high local maxima down the steepest descent until
/// ocean or a basin. A river persists only when its path is long enough to
/// have accumulated meaningful flow.
pub fn trace_rivers(
    topo: &CubeSphere,
    heightmap: &SphereHeightmap,
    sea_level: f64,
) -> Vec<Vec<Coordinate>> {
    let source_threshold = sea_level + (heightmap.max_elev - sea_level).max(0.0) * RIVER_SOURCE_FRACTION;
    let mut rivers = Vec::new();

    for i in 0..topo.cell_count() {
        let c = topo.coordinate_of(i);
        let here = heightmap.get_index(i);
        if here < source_threshold {
            continue;
        }
        let is_peak = topo
            .cardinal_neighbors(c)
            .iter()
            .all(|&n| heightmap.get(n) < here);
        if !is_peak {
            continue;
        }

        let mut path = vec![c];
        let mut current = c;
        let limit = topo.cell_count();
        while path.len() < limit {
            let here = heightmap.get(current);
            if here <= sea_level {
                break; // reached the ocean
            }
            match lowest_neighbor(topo, heightmap, current) {
                Some((j, low)) if low < here => {
                    let next = topo.coordinate_of(j);
                    if path.contains(&next) {
                        break; // basin loop
                    }
                    path.push(next);
                    current = next;
                }
                _ => break, // local basin
            }
        }

        if path.len() >= RIVER_MIN_LENGTH {
            rivers.push(path);
        }
    }

    rivers
}

/// Width in meters of the river at position `step` along its course.
/// Flow accumulates downstream, so rivers widen toward the mouth.
pub fn river_width_at(step: usize) -> f64 {
    4.0 * ((step + 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> GeographyParams {
        GeographyParams {
            plate_count: 5,
            land_water_ratio: 0.3,
            erosion_rate: 1.0,
            rainfall_factor: 1.0,
        }
    }

    fn small_topo() -> CubeSphere {
        CubeSphere::new(12)
    }

    #[test]
    fn plate_count_out_of_range_rejected() {
        let topo = small_topo();
        let mut params = test_params();
        params.plate_count = 2;
        let err = build_geography(&topo, &params, &SeedSplitter::new(1)).unwrap_err();
        assert!(err.contains("plate_count"), "Error: {}", err);
    }

    #[test]
    fn every_cell_belongs_to_a_plate() {
        let topo = small_topo();
        let (plates, plate_of) = generate_plates(&topo, 5, &SeedSplitter::new(42));
        assert_eq!(plates.len(), 5);
        assert_eq!(plate_of.len(), topo.cell_count());
        for &label in &plate_of {
            assert!((label as usize) < plates.len());
        }
    }

    #[test]
    fn plate_boundaries_touch_other_plates() {
        let topo = small_topo();
        let (plates, plate_of) = generate_plates(&topo, 4, &SeedSplitter::new(7));
        for plate in &plates {
            for &c in &plate.boundary_coordinates {
                let label = plate_of[topo.cell_index(c)];
                assert_eq!(label, plate.id);
                let crosses = topo
                    .cardinal_neighbors(c)
                    .iter()
                    .any(|&n| plate_of[topo.cell_index(n)] != label);
                assert!(crosses, "Boundary cell {:?} has no foreign neighbor", c);
            }
        }
    }

    #[test]
    fn plate_velocities_are_tangent() {
        let topo = small_topo();
        let (plates, _) = generate_plates(&topo, 6, &SeedSplitter::new(11));
        for plate in &plates {
            let radial = topo.to_sphere(plate.seed_coordinate);
            let dot = plate.velocity.dot(radial).abs();
            assert!(
                dot < 1e-6,
                "Plate {} velocity not tangent (radial dot {})",
                plate.id,
                dot
            );
        }
    }

    #[test]
    fn geography_is_deterministic() {
        let topo = small_topo();
        let params = test_params();
        let a = build_geography(&topo, &params, &SeedSplitter::new(42)).unwrap();
        let b = build_geography(&topo, &params, &SeedSplitter::new(42)).unwrap();
        assert_eq!(a, b, "Same seed must reproduce the same geography");
    }

    #[test]
    fn different_seeds_diverge() {
        let topo = small_topo();
        let params = test_params();
        let a = build_geography(&topo, &params, &SeedSplitter::new(1)).unwrap();
        let b = build_geography(&topo, &params, &SeedSplitter::new(2)).unwrap();
        assert_ne!(a.heightmap, b.heightmap);
    }

    #[test]
    fn sea_level_all_ocean_at_zero_ratio() {
        let topo = small_topo();
        let map = build_geography(&topo, &test_params(), &SeedSplitter::new(3)).unwrap();
        let sea = assign_ocean_land(&map.heightmap, 0.0);
        let land = map.heightmap.values().iter().filter(|&&v| v > sea).count();
        assert_eq!(land, 0, "Ratio 0.0 must flood every cell");
    }

    #[test]
    fn sea_level_all_land_at_full_ratio() {
        let topo = small_topo();
        let map = build_geography(&topo, &test_params(), &SeedSplitter::new(3)).unwrap();
        let sea = assign_ocean_land(&map.heightmap, 1.0);
        let land = map.heightmap.values().iter().filter(|&&v| v > sea).count();
        assert_eq!(land, map.heightmap.len(), "Ratio 1.0 must drain every cell");
    }

    #[test]
    fn sea_level_half_ratio_splits_closest_to_half() {
        let topo = small_topo();
        let map = build_geography(&topo, &test_params(), &SeedSplitter::new(3)).unwrap();
        let sea = assign_ocean_land(&map.heightmap, 0.5);
        let land = map.heightmap.values().iter().filter(|&&v| v > sea).count();
        let total = map.heightmap.len();
        let fraction = land as f64 / total as f64;
        assert!(
            (fraction - 0.5).abs() < 0.05,
            "Expected ~half land, got {:.3} ({} of {})",
            fraction,
            land,
            total
        );
    }

    #[test]
    fn configured_land_ratio_respected() {
        let topo = small_topo();
        let map = build_geography(&topo, &test_params(), &SeedSplitter::new(9)).unwrap();
        let land = map
            .heightmap
            .values()
            .iter()
            .filter(|&&v| v > map.sea_level)
            .count() as f64
            / map.heightmap.len() as f64;
        assert!(
            (land - 0.3).abs() < 0.05,
            "Expected ~30% land, got {:.1}%",
            land * 100.0
        );
    }

    #[test]
    fn rivers_flow_downhill_to_termination() {
        let topo = CubeSphere::new(16);
        let map = build_geography(&topo, &test_params(), &SeedSplitter::new(5)).unwrap();
        for river in &map.rivers {
            assert!(river.len() >= RIVER_MIN_LENGTH);
            for pair in river.windows(2) {
                let up = map.heightmap.get(pair[0]);
                let down = map.heightmap.get(pair[1]);
                assert!(
                    down < up,
                    "River rises from {:?} ({}) to {:?} ({})",
                    pair[0],
                    up,
                    pair[1],
                    down
                );
            }
        }
    }

    #[test]
    fn river_paths_are_connected() {
        let topo = CubeSphere::new(16);
        let map = build_geography(&topo, &test_params(), &SeedSplitter::new(5)).unwrap();
        for river in &map.rivers {
            for pair in river.windows(2) {
                let d = topo.distance(pair[0], pair[1]);
                assert!(
                    d < 0.3,
                    "River jumps from {:?} to {:?} ({} rad)",
                    pair[0],
                    pair[1],
                    d
                );
            }
        }
    }

    #[test]
    fn provisional_biomes_match_sea_level() {
        let topo = small_topo();
        let map = build_geography(&topo, &test_params(), &SeedSplitter::new(8)).unwrap();
        for (i, &biome) in map.biomes.iter().enumerate() {
            let underwater = map.heightmap.get_index(i) <= map.sea_level;
            assert_eq!(
                biome == Biome::Ocean,
                underwater,
                "Cell {} biome {:?} disagrees with elevation",
                i,
                biome
            );
        }
    }

    #[test]
    fn river_width_grows_downstream() {
        assert!(river_width_at(10) > river_width_at(1));
        assert!(river_width_at(0) > 0.0);
    }
}
