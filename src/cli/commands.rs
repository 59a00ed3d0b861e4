use std::path::Path;

use crate::config::simulation::SimulationConfig;
use crate::config::world::WorldConfig;
use crate::persistence;
use crate::pipeline::{self, CancelToken};
use crate::simulation::Simulation;
use crate::world::topology::Coordinate;
use crate::world::{print_world_summary, GeneratedWorld};

/// Generate a world from a configuration file and save the initial
/// snapshot.
pub fn generate(worldgen_path: &str, output_dir: &str) -> Result<(), String> {
    let config = if Path::new(worldgen_path).exists() {
        WorldConfig::from_file(Path::new(worldgen_path))?
    } else {
        eprintln!("No config at {}, using defaults", worldgen_path);
        WorldConfig::default()
    };

    let cancel = CancelToken::new();
    let world = pipeline::generate_world(&config, &cancel).map_err(|e| e.to_string())?;
    print_world_summary(&world);

    let path = persistence::save_snapshot(&world, Path::new(output_dir))
        .map_err(|e| format!("Cannot save snapshot: {}", e))?;
    println!("\nWorld saved to {}", path.display());
    Ok(())
}

/// Run the simulation loop: tick at the configured rate, snapshot
/// periodically, stop cleanly on ctrl-c.
pub async fn simulate(config: &SimulationConfig, world_path: Option<&str>) -> Result<(), String> {
    let snapshot_dir = Path::new(&config.snapshot_directory);
    let mut world = match world_path {
        Some(path) => {
            eprintln!("Loading world from {}", path);
            persistence::load_snapshot(Path::new(path))
                .map_err(|e| format!("Failed to load snapshot: {}", e))?
        }
        None => {
            eprintln!("Loading latest snapshot from {}", config.snapshot_directory);
            persistence::load_latest_valid_snapshot(snapshot_dir)
                .map_err(|e| format!("Failed to load snapshot: {}", e))?
        }
    };

    eprintln!(
        "World loaded: {} cells, tick {}, {} species",
        world.topology.cell_count(),
        world.tick_count,
        world.species.len()
    );

    let mut sim = Simulation::new(&world);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let tick_interval_ms = (1000.0 / config.tick_rate_hz) as u64;
    let mut ticks_since_snapshot: u32 = 0;

    eprintln!(
        "Simulation running (tick rate: {}Hz, snapshot every {} ticks)",
        config.tick_rate_hz, config.snapshot_interval
    );

    loop {
        let tick_start = std::time::Instant::now();
        let result = sim.advance_tick(&mut world);

        for event in &result.events {
            eprintln!("Tick {}: {:?}", world.tick_count, event);
        }

        ticks_since_snapshot += 1;
        if ticks_since_snapshot >= config.snapshot_interval {
            match persistence::save_snapshot(&world, snapshot_dir) {
                Ok(path) => {
                    ticks_since_snapshot = 0;
                    eprintln!("Snapshot saved: {}", path.display());
                    if let Err(e) =
                        persistence::prune_snapshots(snapshot_dir, config.max_snapshots as usize)
                    {
                        eprintln!("Warning: snapshot pruning failed: {}", e);
                    }
                }
                Err(e) => eprintln!("Warning: snapshot save failed: {}", e),
            }
        }

        if world.tick_count % 1000 == 0 {
            eprintln!(
                "Tick {} | Species: {} | Avg temp: {:.1} | Diversity: {:.3}",
                world.tick_count,
                result.statistics.living_species,
                result.statistics.avg_temperature,
                result.statistics.diversity_index
            );
        }

        // Rate limiting: sleep the remaining slice of the tick budget.
        let elapsed = tick_start.elapsed();
        let target = std::time::Duration::from_millis(tick_interval_ms);
        if elapsed < target {
            tokio::select! {
                _ = tokio::time::sleep(target - elapsed) => {}
                _ = &mut shutdown => {
                    eprintln!("\nShutdown signal received");
                    break;
                }
            }
        } else {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    eprintln!("\nShutdown signal received");
                    break;
                }
                else => {}
            }
        }
    }

    eprintln!("Saving final snapshot...");
    match persistence::save_snapshot(&world, snapshot_dir) {
        Ok(path) => eprintln!("Final snapshot saved: {}", path.display()),
        Err(e) => eprintln!("Warning: final snapshot save failed: {}", e),
    }

    eprintln!("Simulation stopped at tick {}", world.tick_count);
    Ok(())
}

/// Inspect a cell or print a world summary from the latest snapshot.
pub fn inspect(
    config: &SimulationConfig,
    cell: Option<String>,
    world_path: Option<String>,
) -> Result<(), String> {
    let world = match world_path {
        Some(path) => persistence::load_snapshot(Path::new(&path))
            .map_err(|e| format!("Failed to load snapshot: {}", e))?,
        None => {
            let snapshot_dir = Path::new(&config.snapshot_directory);
            persistence::load_latest_valid_snapshot(snapshot_dir)
                .map_err(|e| format!("Failed to load snapshot: {}", e))?
        }
    };

    match cell {
        Some(spec) => inspect_cell(&world, &spec),
        None => {
            print_world_summary(&world);
            Ok(())
        }
    }
}

/// Print one cell's layers. Cell spec format: "face,x,y".
fn inspect_cell(world: &GeneratedWorld, spec: &str) -> Result<(), String> {
    let parts: Vec<&str> = spec.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("Cell spec must be face,x,y — got '{}'", spec));
    }
    let face: u8 = parts[0]
        .trim()
        .parse()
        .map_err(|_| format!("Invalid face in '{}'", spec))?;
    let x: u32 = parts[1]
        .trim()
        .parse()
        .map_err(|_| format!("Invalid x in '{}'", spec))?;
    let y: u32 = parts[2]
        .trim()
        .parse()
        .map_err(|_| format!("Invalid y in '{}'", spec))?;

    let r = world.topology.resolution();
    if face > 5 || x >= r || y >= r {
        return Err(format!(
            "Cell {},{},{} out of range (faces 0-5, grid 0-{})",
            face,
            x,
            y,
            r - 1
        ));
    }

    let c = Coordinate::new(face, x, y);
    let i = world.topology.cell_index(c);

    println!("=== Cell {:?} ===", c);
    println!("Latitude: {:.2}°", world.topology.latitude_of(c));
    println!("Elevation: {:.1} m (sea level {:.1})", world.map.heightmap.get(c), world.map.sea_level);
    println!("Biome: {}", world.map.biomes[i].name());
    if let Some(climate) = world.climate.get(i) {
        println!(
            "Climate: {:.1} °C, {:.0} mm/yr, seasonality {:.2}, drainage {:.2}",
            climate.temperature,
            climate.annual_rainfall,
            climate.seasonality,
            climate.soil_drainage
        );
    }
    if let Some(weather) = world.weather.get(i) {
        println!(
            "Weather: {:?}, {:.1} °C, wind {:.1} m/s @ {:.0}°, humidity {:.0}%",
            weather.state,
            weather.temperature,
            weather.wind.speed,
            weather.wind.direction_deg,
            weather.humidity
        );
    }
    let deposits: Vec<_> = world
        .minerals
        .iter()
        .filter(|d| d.coordinate == c)
        .collect();
    if !deposits.is_empty() {
        println!("Minerals:");
        for d in deposits {
            println!("  {:?}: {:.0}", d.kind, d.quantity);
        }
    }
    Ok(())
}
