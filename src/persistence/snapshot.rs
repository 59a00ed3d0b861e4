use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::world::GeneratedWorld;

/// Metadata about a snapshot file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotMetadata {
    pub path: PathBuf,
    pub tick_count: u64,
    pub timestamp: u64,
    pub file_size: u64,
}

/// Errors that can occur during snapshot operations.
#[derive(Debug)]
pub enum SnapshotError {
    Io(io::Error),
    Serialize(String),
    Deserialize(String),
    Corrupt(PathBuf),
    NoValidSnapshots,
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Io(e) => write!(f, "I/O error: {}", e),
            SnapshotError::Serialize(e) => write!(f, "Serialization error: {}", e),
            SnapshotError::Deserialize(e) => write!(f, "Deserialization error: {}", e),
            SnapshotError::Corrupt(path) => {
                write!(f, "Corrupt snapshot: {}", path.display())
            }
            SnapshotError::NoValidSnapshots => {
                write!(
                    f,
                    "No valid snapshots found. Generate a new world with: planetforge generate"
                )
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<io::Error> for SnapshotError {
    fn from(e: io::Error) -> Self {
        SnapshotError::Io(e)
    }
}

/// Build a snapshot filename from tick count and timestamp.
fn snapshot_filename(tick_count: u64, timestamp: u64) -> String {
    format!("world-tick{}-{}.bin", tick_count, timestamp)
}

/// Parse tick count and timestamp from a snapshot filename.
/// Expected format: `world-tick{N}-{timestamp}.bin`
fn parse_snapshot_filename(filename: &str) -> Option<(u64, u64)> {
    let stem = filename.strip_suffix(".bin")?;
    let rest = stem.strip_prefix("world-tick")?;
    let (tick_str, ts_str) = rest.split_once('-')?;
    let tick = tick_str.parse::<u64>().ok()?;
    let ts = ts_str.parse::<u64>().ok()?;
    Some((tick, ts))
}

fn unix_timestamp_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Save a world snapshot to the snapshot directory using atomic write.
///
/// Writes to a temporary file first, then atomically renames to the final
/// path, so a partial write never corrupts an existing snapshot.
pub fn save_snapshot(world: &GeneratedWorld, snapshot_dir: &Path) -> Result<PathBuf, SnapshotError> {
    fs::create_dir_all(snapshot_dir)?;

    let ts = unix_timestamp_now();
    let filename = snapshot_filename(world.tick_count, ts);
    let target = snapshot_dir.join(&filename);
    let tmp = snapshot_dir.join(format!(".{}.tmp", filename));

    let encoded = bincode::serialize(world).map_err(|e| SnapshotError::Serialize(e.to_string()))?;

    if let Err(e) = fs::write(&tmp, &encoded) {
        let _ = fs::remove_file(&tmp);
        return Err(SnapshotError::Io(e));
    }

    if let Err(e) = fs::rename(&tmp, &target) {
        let _ = fs::remove_file(&tmp);
        return Err(SnapshotError::Io(e));
    }

    Ok(target)
}

/// Load a world from a snapshot file.
///
/// Validates that the deserialized world's cell fields are consistent with
/// its topology.
pub fn load_snapshot(path: &Path) -> Result<GeneratedWorld, SnapshotError> {
    let data = fs::read(path)?;
    let world: GeneratedWorld =
        bincode::deserialize(&data).map_err(|e| SnapshotError::Deserialize(e.to_string()))?;

    let cells = world.topology.cell_count();
    if world.map.biomes.len() != cells || world.map.heightmap.len() != cells {
        return Err(SnapshotError::Corrupt(path.to_path_buf()));
    }

    Ok(world)
}

/// List all valid snapshots in a directory, newest first.
pub fn list_snapshots(snapshot_dir: &Path) -> Result<Vec<SnapshotMetadata>, SnapshotError> {
    if !snapshot_dir.exists() {
        return Ok(Vec::new());
    }

    let mut snapshots = Vec::new();

    for entry in fs::read_dir(snapshot_dir)? {
        let entry = entry?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };

        // Skip temp files.
        if filename.starts_with('.') {
            continue;
        }

        if let Some((tick_count, timestamp)) = parse_snapshot_filename(&filename) {
            let file_size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            snapshots.push(SnapshotMetadata {
                path: path.clone(),
                tick_count,
                timestamp,
                file_size,
            });
        }
    }

    snapshots.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then(b.tick_count.cmp(&a.tick_count))
    });

    Ok(snapshots)
}

/// Prune old snapshots, keeping only the `max_snapshots` most recent.
///
/// Returns the list of deleted file paths.
pub fn prune_snapshots(
    snapshot_dir: &Path,
    max_snapshots: usize,
) -> Result<Vec<PathBuf>, SnapshotError> {
    let snapshots = list_snapshots(snapshot_dir)?;

    let mut deleted = Vec::new();
    if snapshots.len() > max_snapshots {
        for snapshot in &snapshots[max_snapshots..] {
            fs::remove_file(&snapshot.path)?;
            deleted.push(snapshot.path.clone());
        }
    }

    Ok(deleted)
}

/// Load the most recent valid snapshot, falling back to older ones if the
/// latest is corrupt. Errors only when no valid snapshots exist.
pub fn load_latest_valid_snapshot(snapshot_dir: &Path) -> Result<GeneratedWorld, SnapshotError> {
    let snapshots = list_snapshots(snapshot_dir)?;

    if snapshots.is_empty() {
        return Err(SnapshotError::NoValidSnapshots);
    }

    for snapshot in &snapshots {
        match load_snapshot(&snapshot.path) {
            Ok(world) => return Ok(world),
            Err(e) => {
                warn!(
                    path = %snapshot.path.display(),
                    error = %e,
                    "Corrupt snapshot, trying next"
                );
            }
        }
    }

    Err(SnapshotError::NoValidSnapshots)
}
