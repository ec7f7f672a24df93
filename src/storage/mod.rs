//! Filesystem data lake operations.
//!
//! Published snapshots live under `<data_dir>/snapshots/<season>/<yyyy-mm-dd>/`:
//! - `manifest.json`: snapshot metadata and ranking parameters
//! - `records.jsonl`: raw metric rows
//! - `ranked.jsonl`: the leaderboard rows
//!
//! Snapshots are append-only; a published directory is never rewritten.

pub mod jsonl;

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Leaderboard, Snapshot, SnapshotId, SnapshotInfo};

pub use jsonl::JsonlSnapshotStore;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Snapshot for season {season} on {taken_on} already exists")]
    SnapshotExists { season: i32, taken_on: NaiveDate },

    #[error("Malformed line {line} in {path}: {source}")]
    MalformedLine {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Leaderboard {leaderboard} does not belong to snapshot {snapshot}")]
    LeaderboardMismatch {
        snapshot: SnapshotId,
        leaderboard: SnapshotId,
    },
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }

    pub fn season_dir(&self, season: i32) -> PathBuf {
        self.snapshots_dir().join(season.to_string())
    }

    pub fn snapshot_dir(&self, season: i32, taken_on: NaiveDate) -> PathBuf {
        self.season_dir(season)
            .join(taken_on.format("%Y-%m-%d").to_string())
    }

    /// Scratch space for snapshots being published.
    pub fn staging_dir(&self) -> PathBuf {
        self.snapshots_dir().join(".staging")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

/// Snapshot persistence injected into the pipeline.
///
/// Implementations must make a published snapshot visible all at once and
/// must refuse to overwrite one.
pub trait SnapshotStore {
    /// Persist a snapshot together with its leaderboard.
    fn publish(&self, snapshot: &Snapshot, leaderboard: &Leaderboard)
        -> Result<SnapshotInfo, StorageError>;

    fn load_snapshot(&self, season: i32, taken_on: NaiveDate) -> Result<Snapshot, StorageError>;

    fn load_leaderboard(&self, season: i32, taken_on: NaiveDate)
        -> Result<Leaderboard, StorageError>;

    /// Published snapshots ordered by (season, date), optionally for one season.
    fn list(&self, season: Option<i32>) -> Result<Vec<SnapshotInfo>, StorageError>;

    /// Most recent snapshot of `season`.
    fn latest(&self, season: i32) -> Result<Option<SnapshotInfo>, StorageError> {
        Ok(self.list(Some(season))?.pop())
    }

    /// Most recent snapshot of `season` taken on or before `date`.
    fn latest_on_or_before(
        &self,
        season: i32,
        date: NaiveDate,
    ) -> Result<Option<SnapshotInfo>, StorageError> {
        Ok(self
            .list(Some(season))?
            .into_iter()
            .filter(|info| info.taken_on <= date)
            .last())
    }

    /// Seasons with at least one snapshot, oldest first.
    fn seasons(&self) -> Result<Vec<i32>, StorageError> {
        let mut seasons: Vec<i32> = self.list(None)?.iter().map(|info| info.season).collect();
        seasons.dedup();
        Ok(seasons)
    }
}
