pub mod repository;
pub mod snapshot;

pub use repository::{InMemoryRepository, Repository};
pub use snapshot::{
    list_snapshots, load_latest_valid_snapshot, load_snapshot, prune_snapshots, save_snapshot,
    SnapshotError, SnapshotMetadata,
};
