use serde::{Deserialize, Serialize};

use crate::simulation::weather::{bearing_to_cardinal, tangent_to_wind};
use crate::world::cell::{GeographyCell, OceanState, Satellite};
use crate::world::topology::CubeSphere;
use crate::world::vector::Vector3D;

/// Time step for thermohaline advection.
pub const THERMOHALINE_DT: f64 = 0.15;
/// Iterations for visible basin-scale heat transport.
pub const THERMOHALINE_ITERATIONS: usize = 50;
/// Currents slower than this carry no appreciable heat.
const MIN_ADVECTION_SPEED: f64 = 0.01;
/// Fraction of wind speed transferred into the surface current.
const WIND_DRAG: f64 = 0.05;
/// Earth-Moon reference for tidal normalization: mass / distance³.
const EARTH_MOON_BASELINE: f64 = 7.342e22 / (384_400_000.0_f64 * 384_400_000.0 * 384_400_000.0);

/// Initial sea-surface temperature by latitude:
/// `28·cos φ − 2·sin² φ`, clamped to [−2, 30] °C.
pub fn initial_sea_surface_temperature(latitude_deg: f64) -> f64 {
    let lat = latitude_deg.to_radians();
    (28.0 * lat.cos() - 2.0 * lat.sin() * lat.sin()).clamp(-2.0, 30.0)
}

/// Build the initial ocean state. Land cells carry zeroed entries.
pub fn init_ocean(topo: &CubeSphere, geo: &[GeographyCell]) -> OceanState {
    let mut state = OceanState::empty(topo.cell_count());
    for (i, cell) in geo.iter().enumerate() {
        if cell.is_ocean {
            let latitude = topo.latitude_of(topo.coordinate_of(i));
            state.temperature[i] = initial_sea_surface_temperature(latitude);
        }
    }
    state
}

/// Ekman surface currents: each ocean cell's wind, projected onto the
/// tangent plane, rotated 45° clockwise about the outward normal in the
/// northern hemisphere (counter-clockwise in the southern) and scaled by
/// wind drag. When the cell the current flows into is land, the magnitude
/// is damped to a tenth.
pub fn ekman_currents(
    topo: &CubeSphere,
    geo: &[GeographyCell],
    winds: &[Vector3D],
) -> Vec<Vector3D> {
    (0..topo.cell_count())
        .map(|i| {
            if !geo[i].is_ocean {
                return Vector3D::ZERO;
            }
            let c = topo.coordinate_of(i);
            let normal = topo.to_sphere(c);
            let wind = winds[i];
            let tangent_wind = wind.sub(normal.scale(wind.dot(normal)));
            if tangent_wind.length() < 1e-9 {
                return Vector3D::ZERO;
            }

            // Positive angles are counter-clockwise seen from outside the
            // sphere, so the northern 45°-right deflection is negative.
            let angle = if topo.latitude_of(c) >= 0.0 {
                -std::f64::consts::FRAC_PI_4
            } else {
                std::f64::consts::FRAC_PI_4
            };
            let mut current = tangent_wind
                .rotate_around_axis(normal, angle)
                .scale(WIND_DRAG);

            // Coastal damping: flowing into land kills most of the current.
            let bearing = tangent_to_wind(normal, current).direction_deg;
            let downstream = topo.neighbor(c, bearing_to_cardinal(bearing));
            if !geo[topo.cell_index(downstream)].is_ocean {
                current = current.scale(0.1);
            }
            current
        })
        .collect()
}

/// One thermohaline advection pass over a double buffer: every ocean cell
/// with a current faster than the threshold pulls its downstream neighbor's
/// temperature toward its own by `min(speed/10, 1)·dt`. All reads come from
/// the previous buffer, so the per-iteration result does not depend on cell
/// order; multiple upstream contributors are folded 50/50 into the value
/// already written this iteration.
pub fn thermohaline_step(
    topo: &CubeSphere,
    geo: &[GeographyCell],
    currents: &[Vector3D],
    temperatures: &[f64],
) -> Vec<f64> {
    let mut next = temperatures.to_vec();
    let mut touched = vec![false; next.len()];

    for i in 0..topo.cell_count() {
        if !geo[i].is_ocean {
            continue;
        }
        let speed = currents[i].length();
        if speed <= MIN_ADVECTION_SPEED {
            continue;
        }
        let c = topo.coordinate_of(i);
        let normal = topo.to_sphere(c);
        let bearing = tangent_to_wind(normal, currents[i]).direction_deg;
        let j = topo.cell_index(topo.neighbor(c, bearing_to_cardinal(bearing)));
        if !geo[j].is_ocean || j == i {
            continue;
        }

        let alpha = (speed / 10.0).min(1.0) * THERMOHALINE_DT;
        let contribution = temperatures[j] + (temperatures[i] - temperatures[j]) * alpha;
        if touched[j] {
            next[j] = 0.5 * next[j] + 0.5 * contribution;
        } else {
            next[j] = contribution;
            touched[j] = true;
        }
    }

    next
}

/// Run the full thermohaline relaxation, swapping buffers per iteration.
pub fn run_thermohaline(
    topo: &CubeSphere,
    geo: &[GeographyCell],
    state: &mut OceanState,
    iterations: usize,
) {
    for _ in 0..iterations {
        state.temperature = thermohaline_step(topo, geo, &state.currents, &state.temperature);
    }
}

// === Tides ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TidalCategory {
    Micro,
    Normal,
    Strong,
    Extreme,
}

/// Sum of satellite tidal contributions (`m/d³` each), normalized so the
/// Earth-Moon system equals 1.0.
pub fn tidal_strength(satellites: &[Satellite]) -> f64 {
    let total: f64 = satellites
        .iter()
        .filter(|s| s.distance_m > 0.0)
        .map(|s| s.mass_kg / (s.distance_m * s.distance_m * s.distance_m))
        .sum();
    total / EARTH_MOON_BASELINE
}

pub fn tidal_category(strength: f64) -> TidalCategory {
    if strength < 0.5 {
        TidalCategory::Micro
    } else if strength < 2.0 {
        TidalCategory::Normal
    } else if strength < 5.0 {
        TidalCategory::Strong
    } else {
        TidalCategory::Extreme
    }
}

/// Spring-to-neap amplitude ratio by number of moons.
pub fn spring_neap_ratio(moon_count: usize) -> f64 {
    match moon_count {
        0 | 1 => 1.0,
        2 => 1.5,
        3 => 1.8,
        _ => 2.0,
    }
}
