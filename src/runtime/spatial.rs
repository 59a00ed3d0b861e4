use std::collections::HashMap;
use std::sync::RwLock;

use glam::DVec3;

/// Default bucket edge length in meters.
pub const DEFAULT_CELL_SIZE: f64 = 100.0;

type CellKey = (i64, i64);

/// The two maps move together, so they live behind one lock.
#[derive(Debug, Default)]
struct GridState {
    /// Bucket -> entities with their exact positions.
    cells: HashMap<CellKey, HashMap<u64, DVec3>>,
    /// Entity -> containing bucket.
    entity_cells: HashMap<u64, CellKey>,
}

/// Uniform-grid spatial hash over entity positions. Buckets are keyed by
/// `floor(pos / cell_size)` in the ground plane; reads take the shared
/// side of the lock, every mutation the exclusive side.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f64,
    state: RwLock<GridState>,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl SpatialGrid {
    pub fn new(cell_size: f64) -> Self {
        assert!(cell_size > 0.0, "Cell size must be positive");
        Self {
            cell_size,
            state: RwLock::new(GridState::default()),
        }
    }

    fn key_for(&self, pos: DVec3) -> CellKey {
        (
            (pos.x / self.cell_size).floor() as i64,
            (pos.y / self.cell_size).floor() as i64,
        )
    }

    /// Insert or move an entity. Re-inserting at the same position is a
    /// no-op; moving across a bucket boundary rehomes the entity.
    pub fn insert(&self, id: u64, pos: DVec3) {
        let key = self.key_for(pos);
        let mut state = self.state.write().expect("spatial grid lock poisoned");

        if let Some(&old_key) = state.entity_cells.get(&id) {
            if old_key != key {
                let emptied = match state.cells.get_mut(&old_key) {
                    Some(bucket) => {
                        bucket.remove(&id);
                        bucket.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    state.cells.remove(&old_key);
                }
            }
        }

        state.cells.entry(key).or_default().insert(id, pos);
        state.entity_cells.insert(id, key);
    }

    /// Remove an entity. Returns false when it was not present.
    pub fn remove(&self, id: u64) -> bool {
        let mut state = self.state.write().expect("spatial grid lock poisoned");
        let Some(key) = state.entity_cells.remove(&id) else {
            return false;
        };
        let emptied = match state.cells.get_mut(&key) {
            Some(bucket) => {
                bucket.remove(&id);
                bucket.is_empty()
            }
            None => false,
        };
        if emptied {
            state.cells.remove(&key);
        }
        true
    }

    pub fn get_position(&self, id: u64) -> Option<DVec3> {
        let state = self.state.read().expect("spatial grid lock poisoned");
        let key = state.entity_cells.get(&id)?;
        state.cells.get(key)?.get(&id).copied()
    }

    /// All entities within `radius` of `center` (exact Euclidean check
    /// after the bucket sweep). Results are sorted by ID for stable output.
    pub fn query_radius(&self, center: DVec3, radius: f64) -> Vec<u64> {
        if radius < 0.0 {
            return Vec::new();
        }
        let state = self.state.read().expect("spatial grid lock poisoned");
        let center_key = self.key_for(center);
        let reach = (radius / self.cell_size).ceil() as i64;
        let r2 = radius * radius;

        let mut hits = Vec::new();
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                let key = (center_key.0 + dx, center_key.1 + dy);
                if let Some(bucket) = state.cells.get(&key) {
                    for (&id, &pos) in bucket {
                        if center.distance_squared(pos) <= r2 {
                            hits.push(id);
                        }
                    }
                }
            }
        }
        hits.sort_unstable();
        hits
    }

    /// All entities inside the axis-aligned box (inclusive bounds).
    pub fn query_area(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<u64> {
        if min_x > max_x || min_y > max_y {
            return Vec::new();
        }
        let state = self.state.read().expect("spatial grid lock poisoned");
        let lo = (
            (min_x / self.cell_size).floor() as i64,
            (min_y / self.cell_size).floor() as i64,
        );
        let hi = (
            (max_x / self.cell_size).floor() as i64,
            (max_y / self.cell_size).floor() as i64,
        );

        let mut hits = Vec::new();
        for cx in lo.0..=hi.0 {
            for cy in lo.1..=hi.1 {
                if let Some(bucket) = state.cells.get(&(cx, cy)) {
                    for (&id, &pos) in bucket {
                        if pos.x >= min_x && pos.x <= max_x && pos.y >= min_y && pos.y <= max_y {
                            hits.push(id);
                        }
                    }
                }
            }
        }
        hits.sort_unstable();
        hits
    }

    pub fn count(&self) -> usize {
        self.state
            .read()
            .expect("spatial grid lock poisoned")
            .entity_cells
            .len()
    }

    pub fn cell_count(&self) -> usize {
        self.state
            .read()
            .expect("spatial grid lock poisoned")
            .cells
            .len()
    }
}
