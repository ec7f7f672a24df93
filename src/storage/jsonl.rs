//! JSONL (JSON Lines) storage.
//!
//! JSONL is the source of truth for snapshot rows.
//! Each line is a valid JSON object representing one player.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use super::{SnapshotStore, StorageConfig, StorageError};
use crate::calculate::composite::DEFAULT_SCORE_PRECISION;
use crate::models::{
    Leaderboard, MetricName, MetricRecord, RankedRecord, Snapshot, SnapshotId, SnapshotInfo,
};

const MANIFEST_FILE: &str = "manifest.json";
const RECORDS_FILE: &str = "records.jsonl";
const RANKED_FILE: &str = "ranked.jsonl";

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    /// Create a new JSONL writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Ensure the parent directory exists.
    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Write entities, replacing the entire file.
    pub fn write_all(&self, entities: &[T]) -> Result<usize, StorageError> {
        self.ensure_dir()?;

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        let mut count = 0;

        for entity in entities {
            let json = serde_json::to_string(entity)?;
            writeln!(writer, "{}", json)?;
            count += 1;
        }

        writer.flush()?;
        debug!("Wrote {} entities to {:?}", count, self.path);

        Ok(count)
    }
}

/// JSONL file reader.
///
/// Reads are strict: one malformed line rejects the whole file.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all entities from the file. Blank lines are ignored.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Err(StorageError::PathNotFound(self.path.clone()));
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entities = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let entity = serde_json::from_str(&line).map_err(|source| StorageError::MalformedLine {
                path: self.path.clone(),
                line: idx + 1,
                source,
            })?;
            entities.push(entity);
        }

        debug!("Read {} entities from {:?}", entities.len(), self.path);
        Ok(entities)
    }
}

/// Metadata written next to a snapshot's rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub id: SnapshotId,
    pub season: i32,
    pub taken_on: NaiveDate,
    pub player_count: usize,
    /// Metrics the leaderboard was ranked on
    pub metrics: Vec<MetricName>,
    pub min_minutes: u32,
    /// Decimal places of the composite score
    #[serde(default = "default_score_precision")]
    pub score_precision: u32,
    pub published_at: DateTime<Utc>,
}

fn default_score_precision() -> u32 {
    DEFAULT_SCORE_PRECISION
}

impl SnapshotManifest {
    fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            id: self.id.clone(),
            season: self.season,
            taken_on: self.taken_on,
            player_count: self.player_count,
        }
    }
}

/// Snapshot store backed by the local data lake.
#[derive(Debug, Clone)]
pub struct JsonlSnapshotStore {
    config: StorageConfig,
}

impl JsonlSnapshotStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn read_manifest(&self, dir: &Path) -> Result<SnapshotManifest, StorageError> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Err(StorageError::PathNotFound(path));
        }
        let file = File::open(&path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn existing_dir(&self, season: i32, taken_on: NaiveDate) -> Result<PathBuf, StorageError> {
        let dir = self.config.snapshot_dir(season, taken_on);
        if !dir.is_dir() {
            return Err(StorageError::PathNotFound(dir));
        }
        Ok(dir)
    }

    fn write_contents(
        dir: &Path,
        snapshot: &Snapshot,
        leaderboard: &Leaderboard,
    ) -> Result<(), StorageError> {
        JsonlWriter::<MetricRecord>::new(dir.join(RECORDS_FILE)).write_all(&snapshot.records)?;
        JsonlWriter::<RankedRecord>::new(dir.join(RANKED_FILE)).write_all(&leaderboard.records)?;

        let manifest = SnapshotManifest {
            id: snapshot.id.clone(),
            season: snapshot.season,
            taken_on: snapshot.taken_on,
            player_count: snapshot.records.len(),
            metrics: leaderboard.metrics.clone(),
            min_minutes: leaderboard.min_minutes,
            score_precision: leaderboard.score_precision,
            published_at: Utc::now(),
        };
        let mut writer = BufWriter::new(File::create(dir.join(MANIFEST_FILE))?);
        serde_json::to_writer_pretty(&mut writer, &manifest)?;
        writer.flush()?;
        Ok(())
    }

    /// Date directories of one season, skipping anything that is not a date.
    fn snapshot_dates(&self, season_dir: &Path) -> Result<Vec<NaiveDate>, StorageError> {
        let mut dates = Vec::new();
        for entry in fs::read_dir(season_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            match name.to_str().and_then(|n| NaiveDate::parse_from_str(n, "%Y-%m-%d").ok()) {
                Some(date) => dates.push(date),
                None => debug!("Skipping non-snapshot directory {:?}", entry.path()),
            }
        }
        dates.sort();
        Ok(dates)
    }

    /// Season directories, oldest first.
    fn season_dirs(&self) -> Result<Vec<i32>, StorageError> {
        let dir = self.config.snapshots_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut seasons = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(season) = entry.file_name().to_str().and_then(|n| n.parse::<i32>().ok()) {
                seasons.push(season);
            }
        }
        seasons.sort_unstable();
        Ok(seasons)
    }
}

impl SnapshotStore for JsonlSnapshotStore {
    fn publish(
        &self,
        snapshot: &Snapshot,
        leaderboard: &Leaderboard,
    ) -> Result<SnapshotInfo, StorageError> {
        if leaderboard.snapshot_id != snapshot.id {
            return Err(StorageError::LeaderboardMismatch {
                snapshot: snapshot.id.clone(),
                leaderboard: leaderboard.snapshot_id.clone(),
            });
        }

        let target = self.config.snapshot_dir(snapshot.season, snapshot.taken_on);
        let exists = || StorageError::SnapshotExists {
            season: snapshot.season,
            taken_on: snapshot.taken_on,
        };
        if target.exists() {
            return Err(exists());
        }

        // Each publish writes into its own directory; concurrent publishers of
        // the same snapshot never share or delete each other's files.
        let staging_root = self.config.staging_dir();
        fs::create_dir_all(&staging_root)?;
        let staging = tempfile::Builder::new()
            .prefix(&format!("{}-", snapshot.id))
            .tempdir_in(&staging_root)?;

        Self::write_contents(staging.path(), snapshot, leaderboard)?;

        fs::create_dir_all(self.config.season_dir(snapshot.season))?;
        if let Err(e) = fs::rename(staging.path(), &target) {
            return Err(if target.exists() { exists() } else { e.into() });
        }

        info!(
            "Published snapshot {} ({} players) to {:?}",
            snapshot.id,
            snapshot.records.len(),
            target
        );
        Ok(snapshot.info())
    }

    fn load_snapshot(&self, season: i32, taken_on: NaiveDate) -> Result<Snapshot, StorageError> {
        let dir = self.existing_dir(season, taken_on)?;
        let manifest = self.read_manifest(&dir)?;
        let records = JsonlReader::<MetricRecord>::new(dir.join(RECORDS_FILE)).read_all()?;

        Ok(Snapshot {
            id: manifest.id,
            season: manifest.season,
            taken_on: manifest.taken_on,
            records,
        })
    }

    fn load_leaderboard(
        &self,
        season: i32,
        taken_on: NaiveDate,
    ) -> Result<Leaderboard, StorageError> {
        let dir = self.existing_dir(season, taken_on)?;
        let manifest = self.read_manifest(&dir)?;
        let records = JsonlReader::<RankedRecord>::new(dir.join(RANKED_FILE)).read_all()?;

        Ok(Leaderboard {
            snapshot_id: manifest.id,
            season: manifest.season,
            taken_on: manifest.taken_on,
            metrics: manifest.metrics,
            min_minutes: manifest.min_minutes,
            score_precision: manifest.score_precision,
            records,
        })
    }

    fn list(&self, season: Option<i32>) -> Result<Vec<SnapshotInfo>, StorageError> {
        let seasons = match season {
            Some(s) => vec![s],
            None => self.season_dirs()?,
        };

        let mut infos = Vec::new();
        for season in seasons {
            let season_dir = self.config.season_dir(season);
            if !season_dir.is_dir() {
                continue;
            }
            for date in self.snapshot_dates(&season_dir)? {
                let manifest = self.read_manifest(&self.config.snapshot_dir(season, date))?;
                infos.push(manifest.info());
            }
        }

        infos.sort_by_key(|info| (info.season, info.taken_on));
        Ok(infos)
    }
}
