use noise::{NoiseFn, Perlin};

use crate::rng::{CellRng, SeedSplitter};
use crate::world::cell::{Biome, ClimateData, GeographyCell, WeatherKind, WeatherState, Wind};
use crate::world::topology::{Coordinate, CubeSphere, Direction};
use crate::world::vector::Vector3D;

/// Axial tilt in degrees; bounds the solar declination.
pub const AXIAL_TILT: f64 = 23.5;
/// Baseline sea-level pressure, millibars.
pub const BASELINE_PRESSURE: f64 = 1013.25;
/// Temperature lapse with altitude, °C per km.
pub const LAPSE_RATE: f64 = 6.5;
/// Moisture picked up per m/s of wind per upwind ocean cell.
const MOISTURE_PER_OCEAN_CELL: f64 = 0.05;
const MOISTURE_CAP: f64 = 100.0;
/// How many cells upwind the moisture fetch walks.
const FETCH_STEPS: usize = 8;

// === Orbital geometry ===

/// Solar declination for a day of the year, degrees in [−tilt, +tilt].
/// Day 172 maximizes (northern solstice), day 355 minimizes.
pub fn solar_declination(day_of_year: u32) -> f64 {
    AXIAL_TILT * (2.0 * std::f64::consts::PI / 365.0 * (day_of_year as f64 + 284.0)).sin()
}

/// Additive seasonal temperature offset for a latitude given the current
/// declination. Amplitude is 2.5 °C in the tropics, peaks at 15 °C at 45°,
/// and eases back to 8 °C at the poles; the sign follows the hemisphere's
/// season. Near the equator a small always-warming term applies.
pub fn seasonal_modifier(latitude_deg: f64, declination_deg: f64) -> f64 {
    let abs_lat = latitude_deg.abs();
    let amplitude = if abs_lat < 15.0 {
        2.5
    } else if abs_lat < 45.0 {
        2.5 + (abs_lat - 15.0) / 30.0 * 12.5
    } else {
        15.0 - (abs_lat - 45.0) / 45.0 * 7.0
    };

    let season_sign = latitude_deg.signum() * declination_deg / AXIAL_TILT;
    let mut offset = amplitude * season_sign;
    if abs_lat < 15.0 {
        offset += 2.0 * (1.0 - declination_deg.abs() / AXIAL_TILT);
    }
    offset
}

// === Pressure and wind ===

/// Surface pressure from temperature. Land responds faster than the
/// thermally damped ocean.
pub fn surface_pressure(temperature: f64, is_ocean: bool) -> f64 {
    let k = if is_ocean { 0.2 } else { 0.5 };
    BASELINE_PRESSURE - (temperature - 15.0) * k
}

/// Pressure field over all cells from their current temperatures.
pub fn pressure_field(geo: &[GeographyCell], temperatures: &[f64]) -> Vec<f64> {
    geo.iter()
        .zip(temperatures)
        .map(|(cell, &t)| surface_pressure(t, cell.is_ocean))
        .collect()
}

/// Wind vector at a cell from the local pressure gradient: the average of
/// the four cardinal down-gradient pulls, scaled to 10 m/s per mb.
pub fn pressure_gradient_wind(topo: &CubeSphere, pressures: &[f64], c: Coordinate) -> Vector3D {
    let here = pressures[topo.cell_index(c)];
    let mut sum = Vector3D::ZERO;
    let mut count = 0.0;
    for n in topo.cardinal_neighbors(c) {
        let tangent = topo.tangent_toward(c, n);
        if tangent == Vector3D::ZERO {
            continue;
        }
        let diff = pressures[topo.cell_index(n)] - here;
        sum = sum.add(tangent.scale(-diff));
        count += 1.0;
    }
    if count == 0.0 {
        return Vector3D::ZERO;
    }
    sum.scale(10.0 / count)
}

/// Convert a tangent vector at a surface point to a compass wind
/// (bearing the air moves toward, 0 = N, 90 = E).
pub fn tangent_to_wind(radial: Vector3D, tangent: Vector3D) -> Wind {
    let up = radial.normalize();
    let polar = Vector3D::new(0.0, 1.0, 0.0);
    let north = polar.sub(up.scale(polar.dot(up))).normalize();
    if north == Vector3D::ZERO {
        // At the poles every direction is south; report calm northward air.
        return Wind {
            direction_deg: 0.0,
            speed: tangent.length(),
        };
    }
    let east = north.cross(up);
    let n = tangent.dot(north);
    let e = tangent.dot(east);
    let bearing = e.atan2(n).to_degrees();
    Wind {
        direction_deg: (bearing % 360.0 + 360.0) % 360.0,
        speed: tangent.length(),
    }
}

/// Inverse of `tangent_to_wind`: rebuild the tangent vector a compass wind
/// describes at a surface point.
pub fn wind_to_tangent(radial: Vector3D, wind: Wind) -> Vector3D {
    let up = radial.normalize();
    let polar = Vector3D::new(0.0, 1.0, 0.0);
    let north = polar.sub(up.scale(polar.dot(up))).normalize();
    if north == Vector3D::ZERO {
        return Vector3D::ZERO;
    }
    let east = north.cross(up);
    let rad = wind.direction_deg.to_radians();
    north
        .scale(rad.cos())
        .add(east.scale(rad.sin()))
        .scale(wind.speed)
}

/// Prevailing wind by latitude band, used before a pressure field exists:
/// easterly trades to 30°, westerlies to 60°, polar easterlies beyond.
/// Coriolis deflects the flow 15° equatorward of the band axis in each
/// hemisphere.
pub fn latitude_band_wind(latitude_deg: f64) -> Wind {
    let abs_lat = latitude_deg.abs();
    let (base_bearing, speed) = if abs_lat < 30.0 {
        // Trades blow toward the west.
        (270.0, 5.0 + (abs_lat / 30.0) * 5.0)
    } else if abs_lat < 60.0 {
        (90.0, 8.0 + ((abs_lat - 30.0) / 30.0) * 5.0)
    } else {
        (270.0, 3.0 + ((abs_lat - 60.0) / 30.0) * 3.0)
    };

    let deflection = if latitude_deg >= 0.0 { 15.0 } else { -15.0 };
    Wind {
        direction_deg: ((base_bearing + deflection) % 360.0 + 360.0) % 360.0,
        speed,
    }
}

/// The cardinal step that best matches a compass bearing.
pub fn bearing_to_cardinal(bearing_deg: f64) -> Direction {
    let b = (bearing_deg % 360.0 + 360.0) % 360.0;
    if !(45.0..315.0).contains(&b) {
        Direction::North
    } else if b < 135.0 {
        Direction::East
    } else if b < 225.0 {
        Direction::South
    } else {
        Direction::West
    }
}

// === Climate generation ===

/// Build the long-term climate for every cell: latitude profile minus the
/// altitude lapse, Perlin-driven rainfall, latitude seasonality, and soil
/// drainage from height above sea level.
pub fn generate_climate(
    topo: &CubeSphere,
    geo: &[GeographyCell],
    sea_level: f64,
    global_temp_modifier: f64,
    seeds: &SeedSplitter,
) -> Vec<ClimateData> {
    let rain_noise = Perlin::new(seeds.stream("rainfall") as u32);

    geo.iter()
        .enumerate()
        .map(|(i, cell)| {
            let c = topo.coordinate_of(i);
            let latitude = topo.latitude_of(c);
            let altitude = (cell.elevation - sea_level).max(0.0);
            let temperature = 30.0 - 50.0 * latitude.to_radians().sin().abs()
                - LAPSE_RATE * altitude / 1000.0
                + global_temp_modifier;

            let p = cell.sphere_coord.unwrap_or(Vector3D::ZERO);
            let n = rain_noise.get([p.x * 3.0, p.y * 3.0, p.z * 3.0]);
            let annual_rainfall = ((n + 1.0) / 2.0 * 2000.0).clamp(0.0, 2000.0);

            let seasonality = latitude.abs() / 90.0 * 0.8;
            let soil_drainage = if cell.elevation <= sea_level {
                0.0
            } else {
                (0.3 + (cell.elevation - sea_level) / 5000.0).min(1.0)
            };

            ClimateData {
                temperature,
                annual_rainfall,
                seasonality,
                soil_drainage,
            }
        })
        .collect()
}

// === Precipitation model ===

/// Per-cell precipitation potential (mm per weather event) from onshore
/// moisture transport: orographic lift on windward slopes, the ITCZ band
/// that follows the declination, and a flat-land baseline. Moisture is
/// depleted fivefold each time the fetch crosses a rising ridge.
pub fn precipitation_field(
    topo: &CubeSphere,
    geo: &[GeographyCell],
    winds: &[Wind],
    sea_level: f64,
    declination_deg: f64,
) -> Vec<f64> {
    // Air travels at the water surface over ocean, not the sea floor.
    let effective = |j: usize| {
        if geo[j].is_ocean {
            sea_level
        } else {
            geo[j].elevation
        }
    };

    (0..topo.cell_count())
        .map(|i| {
            let c = topo.coordinate_of(i);
            let wind = winds[i];
            let upwind_dir = bearing_to_cardinal(wind.direction_deg).opposite();

            // Walk upwind gathering moisture from ocean cells.
            let mut moisture = 0.0_f64;
            let mut cursor = c;
            let mut prev_elev = effective(i);
            for _ in 0..FETCH_STEPS {
                cursor = topo.neighbor(cursor, upwind_dir);
                let j = topo.cell_index(cursor);
                if geo[j].is_ocean {
                    moisture += MOISTURE_PER_OCEAN_CELL * wind.speed;
                } else if effective(j) > prev_elev {
                    // A ridge between the source and this cell wrings
                    // moisture out before it arrives.
                    moisture /= 5.0;
                }
                prev_elev = effective(j);
            }
            moisture = moisture.min(MOISTURE_CAP);

            let upwind_neighbor = topo.cell_index(topo.neighbor(c, upwind_dir));
            let rise = effective(i) - effective(upwind_neighbor);

            let mut precip = 0.0;
            let orographic = rise > 0.0 && !geo[i].is_ocean;
            if orographic {
                precip += moisture * rise * 0.001;
            } else if moisture > 40.0 {
                precip += (moisture - 40.0) * 0.3;
            }

            // ITCZ bonus where the cell sits under the thermal equator.
            let latitude = topo.latitude_of(c);
            let itcz_offset = (latitude - declination_deg).abs();
            if itcz_offset < 10.0 {
                precip += 50.0 * (1.0 - itcz_offset / 10.0);
            }

            precip
        })
        .collect()
}

/// Apply the rain shadow: high cells sitting downwind of a mountain keep
/// only a fifth of their precipitation.
pub fn apply_rain_shadow(
    topo: &CubeSphere,
    geo: &[GeographyCell],
    winds: &[Wind],
    sea_level: f64,
    precipitation: &mut [f64],
) {
    for i in 0..topo.cell_count() {
        let c = topo.coordinate_of(i);
        if geo[i].elevation - sea_level <= 2000.0 {
            continue;
        }
        let upwind_dir = bearing_to_cardinal(winds[i].direction_deg).opposite();
        let upwind = topo.neighbor(c, upwind_dir);
        if geo[topo.cell_index(upwind)].elevation > geo[i].elevation {
            precipitation[i] *= 0.2;
        }
    }
}

/// Monsoon circulation: in hemisphere summer a land cell bordering ocean
/// receives an onshore wind (sea to land) and strongly amplified
/// precipitation. Returns None outside the monsoon season or away from
/// coasts.
pub fn monsoon(
    topo: &CubeSphere,
    geo: &[GeographyCell],
    c: Coordinate,
    declination_deg: f64,
) -> Option<(Wind, f64)> {
    let i = topo.cell_index(c);
    if geo[i].is_ocean {
        return None;
    }
    let latitude = topo.latitude_of(c);
    // Summer: the declination sits in this cell's hemisphere.
    if latitude * declination_deg <= 0.0 || declination_deg.abs() < 0.5 * AXIAL_TILT {
        return None;
    }

    let ocean_neighbor = topo
        .cardinal_neighbors(c)
        .into_iter()
        .find(|&n| geo[topo.cell_index(n)].is_ocean)?;

    // Onshore flow: from the ocean neighbor toward the land cell.
    let tangent = topo.tangent_toward(ocean_neighbor, c);
    let mut wind = tangent_to_wind(topo.to_sphere(ocean_neighbor), tangent);
    wind.speed = 9.0 + 4.0 * (declination_deg.abs() / AXIAL_TILT);

    let multiplier = 3.0 + declination_deg.abs() / AXIAL_TILT;
    Some((wind, multiplier))
}

// === Weather state ===

/// Classify instantaneous weather from the measured fields.
pub fn classify_weather(
    temperature: f64,
    precipitation: f64,
    humidity: f64,
    wind_speed: f64,
) -> WeatherKind {
    if precipitation > 20.0 || wind_speed > 15.0 {
        WeatherKind::Storm
    } else if temperature <= 0.0 && precipitation > 2.0 {
        WeatherKind::Snow
    } else if precipitation > 2.0 {
        WeatherKind::Rain
    } else if (30.0..60.0).contains(&humidity) {
        WeatherKind::Cloudy
    } else {
        WeatherKind::Clear
    }
}

/// Diurnal temperature offset for an hour of day: coldest before dawn,
/// peaking at +7.5 °C at 14:00.
pub fn diurnal_offset(hour: f64) -> f64 {
    7.5 * (2.0 * std::f64::consts::PI * (hour - 8.0) / 24.0).sin()
}

fn visibility_for(state: WeatherKind) -> f64 {
    match state {
        WeatherKind::Storm => 500.0,
        WeatherKind::Snow => 1000.0,
        WeatherKind::Rain => 2500.0,
        WeatherKind::Cloudy => 8000.0,
        WeatherKind::Clear => 10000.0,
    }
}

/// Generate the weather state for one cell at one tick. Deterministic in
/// the provided seed.
#[allow(clippy::too_many_arguments)]
pub fn generate_weather_state(
    climate: &ClimateData,
    precipitation_potential: f64,
    wind: Wind,
    latitude_deg: f64,
    declination_deg: f64,
    timestamp: u64,
    hour: f64,
    seed: u64,
) -> WeatherState {
    let mut rng = CellRng::new(seed);

    let temperature = climate.temperature
        + seasonal_modifier(latitude_deg, declination_deg)
        + diurnal_offset(hour)
        + rng.range(-1.5, 1.5);

    // Rain falls in events: the potential sets the size, the annual
    // rainfall sets the odds.
    let event_chance = (climate.annual_rainfall / 2000.0 * 0.6).clamp(0.02, 0.75);
    let precipitation = if rng.next_f64() < event_chance {
        (precipitation_potential * rng.range(0.4, 1.2)).max(0.5)
    } else {
        0.0
    };

    let humidity = (climate.annual_rainfall / 2000.0 * 70.0
        + precipitation.min(30.0)
        + rng.range(-5.0, 5.0))
    .clamp(0.0, 100.0);

    let state = classify_weather(temperature, precipitation, humidity, wind.speed);

    WeatherState {
        timestamp,
        state,
        temperature,
        precipitation,
        wind,
        humidity,
        visibility: visibility_for(state),
    }
}

// === Biome classification ===

/// Classify every cell into the closed biome set from its climate,
/// elevation and sea level. Runs once after climate generation and again
/// after climate-shifting events.
pub fn assign_biomes(
    topo: &CubeSphere,
    geo: &[GeographyCell],
    climate: &[ClimateData],
    sea_level: f64,
) -> Vec<Biome> {
    (0..topo.cell_count())
        .map(|i| {
            let cell = &geo[i];
            if cell.is_ocean {
                return Biome::Ocean;
            }
            let c = topo.coordinate_of(i);
            let altitude = cell.elevation - sea_level;
            let coastal = topo
                .cardinal_neighbors(c)
                .iter()
                .any(|&n| geo[topo.cell_index(n)].is_ocean);
            if coastal && altitude < 30.0 {
                return Biome::Beach;
            }
            if altitude > 3000.0 {
                return Biome::Alpine;
            }
            if altitude > 2000.0 {
                return Biome::Mountain;
            }

            let data = &climate[i];
            if data.temperature < -5.0 {
                return Biome::Tundra;
            }
            if data.temperature < 3.0 {
                return Biome::Taiga;
            }
            if data.soil_drainage < 0.35 && data.annual_rainfall > 800.0 {
                return Biome::Wetland;
            }
            if data.annual_rainfall < 250.0 {
                return Biome::Desert;
            }
            if data.temperature > 20.0 && data.annual_rainfall > 1500.0 {
                return Biome::Rainforest;
            }
            if data.temperature > 20.0 && data.seasonality > 0.2 {
                return Biome::Savanna;
            }
            if data.annual_rainfall > 700.0 {
                return Biome::TemperateForest;
            }
            Biome::Grassland
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::geography::{build_geography, GeographyParams};
    use crate::world::{geography_cells, topology::Coordinate};

    fn flat_world(topo: &CubeSphere, elevation: f64) -> Vec<GeographyCell> {
        (0..topo.cell_count())
            .map(|i| GeographyCell {
                cell_id: i as u64,
                sphere_coord: Some(topo.to_sphere(topo.coordinate_of(i))),
                elevation,
                is_ocean: elevation <= 0.0,
                river_width: 0.0,
                base_temperature: 20.0,
            })
            .collect()
    }

    #[test]
    fn declination_solstices_and_equinox() {
        assert!((solar_declination(172) - 23.5).abs() < 0.1, "Day 172");
        assert!((solar_declination(355) + 23.5).abs() < 0.1, "Day 355");
        assert!(solar_declination(80).abs() < 0.5, "Day 80 near equinox");
        for day in 1..=365 {
            assert!(
                solar_declination(day).abs() <= 23.5 + 0.1,
                "Day {} exceeds tilt",
                day
            );
        }
    }

    #[test]
    fn seasonal_modifier_hemisphere_signs() {
        let summer = AXIAL_TILT;
        // Northern summer warms the north, cools the south.
        assert!((seasonal_modifier(45.0, summer) - 15.0).abs() < 0.01);
        assert!((seasonal_modifier(-45.0, summer) + 15.0).abs() < 0.01);
        // Poles ease back to 8 °C amplitude.
        assert!((seasonal_modifier(90.0, summer) - 8.0).abs() < 0.01);
    }

    #[test]
    fn seasonal_modifier_equator_small_and_warm() {
        let equinox = seasonal_modifier(0.0, 0.0);
        assert!(equinox > 0.0 && equinox <= 2.5, "Equinox equator: {}", equinox);
        let solstice = seasonal_modifier(0.0, AXIAL_TILT);
        assert!(solstice.abs() < 3.0, "Solstice equator: {}", solstice);
    }

    #[test]
    fn pressure_baseline_and_responsiveness() {
        assert_eq!(surface_pressure(15.0, false), BASELINE_PRESSURE);
        assert_eq!(surface_pressure(15.0, true), BASELINE_PRESSURE);
        let hot_land = surface_pressure(35.0, false);
        let hot_ocean = surface_pressure(35.0, true);
        assert!(
            (BASELINE_PRESSURE - hot_land) > (BASELINE_PRESSURE - hot_ocean),
            "Land pressure should respond more strongly"
        );
        assert_eq!(hot_land, BASELINE_PRESSURE - 10.0);
        assert_eq!(hot_ocean, BASELINE_PRESSURE - 4.0);
    }

    #[test]
    fn gradient_wind_flows_downhill_in_pressure() {
        let topo = CubeSphere::new(16);
        // Pressure rising eastward across the front face.
        let pressures: Vec<f64> = (0..topo.cell_count())
            .map(|i| {
                let c = topo.coordinate_of(i);
                1000.0 + c.x as f64
            })
            .collect();
        let c = Coordinate::new(0, 8, 8);
        let wind = pressure_gradient_wind(&topo, &pressures, c);
        let east = topo.tangent_toward(c, topo.neighbor(c, Direction::East));
        assert!(
            wind.dot(east) < 0.0,
            "Wind should blow from high (east) to low (west)"
        );
    }

    #[test]
    fn latitude_band_speeds() {
        let trades = latitude_band_wind(15.0);
        assert!((5.0..=10.0).contains(&trades.speed), "Trades: {:?}", trades);
        let westerlies = latitude_band_wind(50.0);
        assert!(
            (8.0..=13.0).contains(&westerlies.speed),
            "Westerlies: {:?}",
            westerlies
        );
        let polar = latitude_band_wind(75.0);
        assert!((3.0..=6.0).contains(&polar.speed), "Polar: {:?}", polar);
    }

    #[test]
    fn latitude_band_directions() {
        // Trades have a westward component, westerlies eastward.
        let trades = latitude_band_wind(15.0);
        assert!(
            trades.direction_deg > 180.0 && trades.direction_deg < 360.0,
            "Trades bearing {}",
            trades.direction_deg
        );
        let westerlies = latitude_band_wind(50.0);
        assert!(
            westerlies.direction_deg > 0.0 && westerlies.direction_deg < 180.0,
            "Westerlies bearing {}",
            westerlies.direction_deg
        );
        // Coriolis deflection differs by hemisphere.
        assert_ne!(
            latitude_band_wind(15.0).direction_deg,
            latitude_band_wind(-15.0).direction_deg
        );
    }

    #[test]
    fn bearing_to_cardinal_quadrants() {
        assert_eq!(bearing_to_cardinal(0.0), Direction::North);
        assert_eq!(bearing_to_cardinal(90.0), Direction::East);
        assert_eq!(bearing_to_cardinal(180.0), Direction::South);
        assert_eq!(bearing_to_cardinal(270.0), Direction::West);
        assert_eq!(bearing_to_cardinal(350.0), Direction::North);
    }

    #[test]
    fn climate_lapse_cools_highlands() {
        let topo = CubeSphere::new(8);
        let mut geo = flat_world(&topo, 100.0);
        let i = topo.cell_index(Coordinate::new(0, 4, 4));
        geo[i].elevation = 3100.0;
        let climate = generate_climate(&topo, &geo, 0.0, 0.0, &SeedSplitter::new(1));
        let lowland = topo.cell_index(Coordinate::new(0, 3, 4));
        let drop = climate[lowland].temperature - climate[i].temperature;
        assert!(
            (drop - LAPSE_RATE * 3.0).abs() < 0.5,
            "Expected ~{} °C lapse, got {}",
            LAPSE_RATE * 3.0,
            drop
        );
    }

    #[test]
    fn climate_drainage_and_seasonality() {
        let topo = CubeSphere::new(8);
        let mut geo = flat_world(&topo, -100.0);
        let land = topo.cell_index(Coordinate::new(4, 4, 4));
        geo[land].elevation = 1000.0;
        geo[land].is_ocean = false;
        let climate = generate_climate(&topo, &geo, 0.0, 0.0, &SeedSplitter::new(2));

        let ocean_cell = topo.cell_index(Coordinate::new(0, 4, 4));
        assert_eq!(climate[ocean_cell].soil_drainage, 0.0);
        assert!((climate[land].soil_drainage - 0.5).abs() < 0.01);
        // Polar cell (top face center) has near-maximum seasonality.
        assert!(climate[land].seasonality > 0.7);
        assert!(climate[ocean_cell].seasonality < 0.3);
    }

    #[test]
    fn rainfall_within_bounds_and_deterministic() {
        let topo = CubeSphere::new(8);
        let geo = flat_world(&topo, 100.0);
        let a = generate_climate(&topo, &geo, 0.0, 0.0, &SeedSplitter::new(5));
        let b = generate_climate(&topo, &geo, 0.0, 0.0, &SeedSplitter::new(5));
        assert_eq!(a, b);
        for data in &a {
            assert!((0.0..=2000.0).contains(&data.annual_rainfall));
        }
    }

    #[test]
    fn orographic_rain_on_windward_slope() {
        let topo = CubeSphere::new(16);
        // Ocean everywhere except a mountain wall east of the fetch.
        let mut geo = flat_world(&topo, -500.0);
        let peak = Coordinate::new(0, 10, 8);
        let i = topo.cell_index(peak);
        geo[i].elevation = 2500.0;
        geo[i].is_ocean = false;

        // Uniform westerly wind (blowing toward the east).
        let winds: Vec<Wind> = (0..topo.cell_count())
            .map(|_| Wind {
                direction_deg: 90.0,
                speed: 10.0,
            })
            .collect();

        let precip = precipitation_field(&topo, &geo, &winds, 0.0, 0.0);
        assert!(
            precip[i] > 0.0,
            "Windward mountain cell should get orographic rain"
        );
    }

    #[test]
    fn flat_coastal_land_gets_baseline_rain() {
        let topo = CubeSphere::new(16);
        let mut geo = flat_world(&topo, -500.0);
        // A flat island cell at the equator with ocean all around.
        let island = Coordinate::new(0, 8, 8);
        let i = topo.cell_index(island);
        geo[i].elevation = 10.0;
        geo[i].is_ocean = false;

        let winds: Vec<Wind> = (0..topo.cell_count())
            .map(|_| Wind {
                direction_deg: 90.0,
                speed: 12.0,
            })
            .collect();
        let precip = precipitation_field(&topo, &geo, &winds, 0.0, 0.0);
        assert!(
            precip[i] > 0.0,
            "Flat land with long ocean fetch should still see rain, got {}",
            precip[i]
        );
    }

    #[test]
    fn rain_shadow_cuts_leeward_precipitation() {
        let topo = CubeSphere::new(16);
        let mut geo = flat_world(&topo, 500.0);
        let ridge = topo.cell_index(Coordinate::new(0, 7, 8));
        let lee = topo.cell_index(Coordinate::new(0, 8, 8));
        geo[ridge].elevation = 4000.0;
        geo[lee].elevation = 2600.0;

        let winds: Vec<Wind> = (0..topo.cell_count())
            .map(|_| Wind {
                direction_deg: 90.0,
                speed: 10.0,
            })
            .collect();
        let mut precip = vec![10.0; topo.cell_count()];
        apply_rain_shadow(&topo, &geo, &winds, 0.0, &mut precip);
        assert!(
            (precip[lee] - 2.0).abs() < 1e-9,
            "Leeward cell should keep 20%, got {}",
            precip[lee]
        );
        assert_eq!(precip[ridge], 10.0, "The ridge itself is not shadowed");
    }

    #[test]
    fn monsoon_summer_coastal_cell() {
        let topo = CubeSphere::new(16);
        let mut geo = flat_world(&topo, -500.0);
        // Northern-hemisphere coastal land cell.
        let land = Coordinate::new(0, 8, 4);
        let i = topo.cell_index(land);
        geo[i].elevation = 50.0;
        geo[i].is_ocean = false;

        let (wind, multiplier) =
            monsoon(&topo, &geo, land, AXIAL_TILT).expect("summer coast should monsoon");
        assert!(
            multiplier >= 3.0,
            "Monsoon multiplier should be at least 3, got {}",
            multiplier
        );
        assert!(wind.speed > 5.0);

        // Winter: no monsoon.
        assert!(monsoon(&topo, &geo, land, -AXIAL_TILT).is_none());
        // Ocean cells never monsoon.
        let ocean = Coordinate::new(0, 9, 4);
        assert!(monsoon(&topo, &geo, ocean, AXIAL_TILT).is_none());
    }

    #[test]
    fn monsoon_wind_is_onshore() {
        let topo = CubeSphere::new(16);
        let mut geo = flat_world(&topo, -500.0);
        let land = Coordinate::new(0, 8, 4);
        let i = topo.cell_index(land);
        geo[i].elevation = 50.0;
        geo[i].is_ocean = false;

        let (wind, _) = monsoon(&topo, &geo, land, AXIAL_TILT).unwrap();
        // Following the wind's cardinal from the ocean neighbor should reach
        // the land cell.
        let onshore_step = bearing_to_cardinal(wind.direction_deg);
        let reached = topo
            .cardinal_neighbors(land)
            .into_iter()
            .filter(|&n| geo[topo.cell_index(n)].is_ocean)
            .any(|n| topo.neighbor(n, onshore_step) == land);
        assert!(reached, "Monsoon wind bearing {} is not onshore", wind.direction_deg);
    }

    #[test]
    fn weather_classification_table() {
        assert_eq!(classify_weather(20.0, 25.0, 50.0, 5.0), WeatherKind::Storm);
        assert_eq!(classify_weather(20.0, 0.0, 50.0, 16.0), WeatherKind::Storm);
        assert_eq!(classify_weather(-2.0, 5.0, 50.0, 5.0), WeatherKind::Snow);
        assert_eq!(classify_weather(10.0, 5.0, 50.0, 5.0), WeatherKind::Rain);
        assert_eq!(classify_weather(10.0, 1.0, 45.0, 5.0), WeatherKind::Cloudy);
        assert_eq!(classify_weather(10.0, 1.0, 20.0, 5.0), WeatherKind::Clear);
        assert_eq!(classify_weather(10.0, 1.0, 65.0, 5.0), WeatherKind::Clear);
    }

    #[test]
    fn diurnal_peak_mid_afternoon() {
        assert!((diurnal_offset(14.0) - 7.5).abs() < 1e-9);
        assert!(diurnal_offset(3.0) < 0.0, "Pre-dawn should be cold");
        for h in 0..24 {
            assert!(diurnal_offset(h as f64).abs() <= 7.5 + 1e-9);
        }
    }

    #[test]
    fn weather_state_deterministic_per_seed() {
        let climate = ClimateData {
            temperature: 18.0,
            annual_rainfall: 1200.0,
            seasonality: 0.3,
            soil_drainage: 0.5,
        };
        let wind = Wind {
            direction_deg: 90.0,
            speed: 6.0,
        };
        let a = generate_weather_state(&climate, 12.0, wind, 30.0, 10.0, 7, 14.0, 99);
        let b = generate_weather_state(&climate, 12.0, wind, 30.0, 10.0, 7, 14.0, 99);
        assert_eq!(a, b);
        assert!((0.0..=100.0).contains(&a.humidity));
        assert!(a.visibility > 0.0);
    }

    #[test]
    fn biomes_from_generated_world() {
        let topo = CubeSphere::new(16);
        let params = GeographyParams {
            plate_count: 5,
            land_water_ratio: 0.4,
            erosion_rate: 1.0,
            rainfall_factor: 1.0,
        };
        let map = build_geography(&topo, &params, &SeedSplitter::new(77)).unwrap();
        let geo = geography_cells(&topo, &map);
        let climate = generate_climate(&topo, &geo, map.sea_level, 0.0, &SeedSplitter::new(77));
        let biomes = assign_biomes(&topo, &geo, &climate, map.sea_level);

        assert_eq!(biomes.len(), topo.cell_count());
        for (i, &b) in biomes.iter().enumerate() {
            if geo[i].is_ocean {
                assert_eq!(b, Biome::Ocean, "Ocean cell {} classified {:?}", i, b);
            } else {
                assert_ne!(b, Biome::Ocean, "Land cell {} classified ocean", i);
            }
        }
        // Polar faces should hold cold biomes somewhere.
        let has_cold = biomes
            .iter()
            .any(|&b| matches!(b, Biome::Tundra | Biome::Taiga | Biome::Alpine));
        assert!(has_cold, "Expected cold biomes near the poles");
    }
}
