use clap::{Parser, Subcommand};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use planetforge::cli::commands;
use planetforge::config::simulation::SimulationConfig;
use planetforge::persistence;
use planetforge::world::print_world_summary;

#[derive(Parser)]
#[command(name = "planetforge")]
#[command(about = "Deterministic planet generation and environmental simulation core")]
#[command(version)]
struct Cli {
    /// Path to the simulation configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new world from a world configuration
    Generate {
        /// Path to the world configuration file
        #[arg(short, long, default_value = "worldgen.toml")]
        worldgen: String,

        /// Output snapshot directory
        #[arg(short, long, default_value = "snapshots")]
        output: String,
    },

    /// Run the time-stepped simulation
    Simulate {
        /// Path to a specific world snapshot to load
        #[arg(short, long)]
        world: Option<String>,
    },

    /// Inspect world or cell state
    Inspect {
        /// Cell to inspect as "face,x,y"
        #[arg(long)]
        cell: Option<String>,

        /// Snapshot file to inspect (default: latest)
        #[arg(short, long)]
        world: Option<String>,
    },

    /// Manage world snapshots
    Snapshots {
        #[command(subcommand)]
        action: SnapshotAction,
    },
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// List available snapshots
    List {
        /// Snapshot directory
        #[arg(short, long, default_value = "snapshots")]
        dir: String,
    },

    /// Restore and display a world from a snapshot file
    Restore {
        /// Path to the snapshot file
        file: String,
    },
}

fn load_config(path: &str) -> SimulationConfig {
    if Path::new(path).exists() {
        match SimulationConfig::from_file(Path::new(path)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        SimulationConfig::default()
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(&cli.config);

    // RUST_LOG wins when set; otherwise the configured log_level applies.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Generate { worldgen, output } => {
            if let Err(e) = commands::generate(&worldgen, &output) {
                eprintln!("Generation error: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Simulate { world } => {
            if let Err(e) = commands::simulate(&config, world.as_deref()).await {
                eprintln!("Simulation error: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Inspect { cell, world } => {
            if let Err(e) = commands::inspect(&config, cell, world) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Snapshots { action } => match action {
            SnapshotAction::List { dir } => {
                let snapshot_dir = Path::new(&dir);
                match persistence::list_snapshots(snapshot_dir) {
                    Ok(snapshots) => {
                        if snapshots.is_empty() {
                            println!("No snapshots found in {}", snapshot_dir.display());
                        } else {
                            println!("{:<40} {:>8} {:>12}", "File", "Tick", "Size");
                            println!("{}", "-".repeat(62));
                            for s in &snapshots {
                                let name =
                                    s.path.file_name().and_then(|n| n.to_str()).unwrap_or("?");
                                println!(
                                    "{:<40} {:>8} {:>9} KB",
                                    name,
                                    s.tick_count,
                                    s.file_size / 1024
                                );
                            }
                            println!(
                                "\n{} snapshot(s) in {}",
                                snapshots.len(),
                                snapshot_dir.display()
                            );
                        }
                    }
                    Err(e) => {
                        eprintln!("Error listing snapshots: {}", e);
                        std::process::exit(1);
                    }
                }
            }
            SnapshotAction::Restore { file } => {
                let path = Path::new(&file);
                match persistence::load_snapshot(path) {
                    Ok(world) => {
                        println!("Restored world from {}", path.display());
                        print_world_summary(&world);
                    }
                    Err(e) => {
                        eprintln!("Error restoring snapshot: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        },
    }
}
