use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::rng::SeedSplitter;
use crate::world::cell::{MineralDeposit, MineralKind, WorldMap};
use crate::world::topology::CubeSphere;

fn kind_name(kind: MineralKind) -> &'static str {
    match kind {
        MineralKind::Iron => "iron",
        MineralKind::Copper => "copper",
        MineralKind::Coal => "coal",
        MineralKind::Gold => "gold",
        MineralKind::Silver => "silver",
        MineralKind::Gems => "gems",
        MineralKind::Crystal => "crystal",
    }
}

/// Scatter mineral deposits consistent with the generated geology.
///
/// Ore-bearing kinds concentrate along plate boundaries and high terrain
/// (where uplift exposed them); coal forms in low-lying land; gems and
/// crystal are rare everywhere. `density` in [0.1, 1.0] scales the overall
/// deposit probability; `weights` biases individual kinds by name.
pub fn distribute_minerals(
    topo: &CubeSphere,
    map: &WorldMap,
    density: f64,
    weights: &HashMap<String, f64>,
    seeds: &SeedSplitter,
) -> Vec<MineralDeposit> {
    let mut rng = seeds.cell_rng("minerals");
    let density = density.clamp(0.1, 1.0);
    let weight_for =
        |kind: MineralKind| -> f64 { weights.get(kind_name(kind)).copied().unwrap_or(1.0).max(0.0) };

    let boundary: HashSet<usize> = map
        .plates
        .iter()
        .flat_map(|p| p.boundary_coordinates.iter())
        .map(|&c| topo.cell_index(c))
        .collect();

    let relief = (map.heightmap.max_elev - map.sea_level).max(1.0);
    let mut deposits = Vec::new();

    for i in 0..topo.cell_count() {
        let elevation = map.heightmap.get_index(i);
        if elevation <= map.sea_level {
            continue;
        }
        let c = topo.coordinate_of(i);
        let height_frac = (elevation - map.sea_level) / relief;
        let near_boundary = boundary.contains(&i);

        // Tectonic ores along active boundaries.
        if near_boundary && rng.next_f64() < density * 0.5 * weight_for(MineralKind::Iron) {
            deposits.push(MineralDeposit {
                kind: MineralKind::Iron,
                coordinate: c,
                quantity: rng.range(20.0, 100.0),
            });
        }
        if near_boundary && rng.next_f64() < density * 0.3 * weight_for(MineralKind::Copper) {
            deposits.push(MineralDeposit {
                kind: MineralKind::Copper,
                coordinate: c,
                quantity: rng.range(15.0, 70.0),
            });
        }

        // Precious metals in high uplifted terrain.
        if height_frac > 0.6 {
            if rng.next_f64() < density * 0.2 * weight_for(MineralKind::Gold) {
                deposits.push(MineralDeposit {
                    kind: MineralKind::Gold,
                    coordinate: c,
                    quantity: rng.range(2.0, 15.0),
                });
            }
            if rng.next_f64() < density * 0.25 * weight_for(MineralKind::Silver) {
                deposits.push(MineralDeposit {
                    kind: MineralKind::Silver,
                    coordinate: c,
                    quantity: rng.range(5.0, 25.0),
                });
            }
        }

        // Coal in low-lying land where organic material accumulated.
        if height_frac < 0.25 && rng.next_f64() < density * 0.35 * weight_for(MineralKind::Coal) {
            deposits.push(MineralDeposit {
                kind: MineralKind::Coal,
                coordinate: c,
                quantity: rng.range(30.0, 150.0),
            });
        }

        // Rare kinds anywhere on land.
        if rng.next_f64() < density * 0.04 * weight_for(MineralKind::Gems) {
            deposits.push(MineralDeposit {
                kind: MineralKind::Gems,
                coordinate: c,
                quantity: rng.range(1.0, 8.0),
            });
        }
        if rng.next_f64() < density * 0.03 * weight_for(MineralKind::Crystal) {
            deposits.push(MineralDeposit {
                kind: MineralKind::Crystal,
                coordinate: c,
                quantity: rng.range(1.0, 6.0),
            });
        }
    }

    debug!(count = deposits.len(), "Mineral distribution complete");
    deposits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::geography::{build_geography, GeographyParams};

    fn test_map(seed: u64) -> (CubeSphere, WorldMap) {
        let topo = CubeSphere::new(12);
        let params = GeographyParams {
            plate_count: 5,
            land_water_ratio: 0.4,
            erosion_rate: 1.0,
            rainfall_factor: 1.0,
        };
        let map = build_geography(&topo, &params, &SeedSplitter::new(seed)).unwrap();
        (topo, map)
    }

    fn no_weights() -> HashMap<String, f64> {
        HashMap::new()
    }

    #[test]
    fn deposits_only_on_land() {
        let (topo, map) = test_map(42);
        let deposits = distribute_minerals(&topo, &map, 1.0, &no_weights(), &SeedSplitter::new(42));
        assert!(!deposits.is_empty(), "Full density should yield deposits");
        for d in &deposits {
            assert!(
                map.heightmap.get(d.coordinate) > map.sea_level,
                "Deposit {:?} is underwater",
                d
            );
        }
    }

    #[test]
    fn density_scales_deposit_count() {
        let (topo, map) = test_map(42);
        let sparse = distribute_minerals(&topo, &map, 0.1, &no_weights(), &SeedSplitter::new(42));
        let dense = distribute_minerals(&topo, &map, 1.0, &no_weights(), &SeedSplitter::new(42));
        assert!(
            dense.len() > sparse.len(),
            "Expected more deposits at density 1.0 ({}) than 0.1 ({})",
            dense.len(),
            sparse.len()
        );
    }

    #[test]
    fn distribution_is_deterministic() {
        let (topo, map) = test_map(7);
        let a = distribute_minerals(&topo, &map, 0.6, &no_weights(), &SeedSplitter::new(7));
        let b = distribute_minerals(&topo, &map, 0.6, &no_weights(), &SeedSplitter::new(7));
        assert_eq!(a, b);
    }

    #[test]
    fn weights_bias_kinds() {
        let (topo, map) = test_map(42);
        let mut weights = HashMap::new();
        weights.insert("iron".to_string(), 0.0);
        let deposits = distribute_minerals(&topo, &map, 1.0, &weights, &SeedSplitter::new(42));
        assert!(
            deposits.iter().all(|d| d.kind != MineralKind::Iron),
            "Zero weight must suppress the kind entirely"
        );
        assert!(
            deposits.iter().any(|d| d.kind == MineralKind::Coal),
            "Other kinds keep their default weight"
        );
    }

    #[test]
    fn quantities_are_positive() {
        let (topo, map) = test_map(9);
        for d in distribute_minerals(&topo, &map, 0.8, &no_weights(), &SeedSplitter::new(9)) {
            assert!(d.quantity > 0.0, "Deposit {:?} has no quantity", d);
        }
    }
}
