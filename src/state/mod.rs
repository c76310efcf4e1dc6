//! Scheduler state persistence.

mod snapshot;

pub use snapshot::{SchedulerSnapshot, SnapshotStore, SNAPSHOT_VERSION};
