//! Snapshots - dated captures of every tracked player's metrics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{MetricRecord, SnapshotId};

/// An immutable capture of one season's metrics at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Derived from season + date
    pub id: SnapshotId,

    /// Season ending year (2025 = the 2024-25 season)
    pub season: i32,

    /// Date the capture was taken
    pub taken_on: NaiveDate,

    /// One row per player
    pub records: Vec<MetricRecord>,
}

impl Snapshot {
    pub fn new(season: i32, taken_on: NaiveDate, records: Vec<MetricRecord>) -> Self {
        Self {
            id: snapshot_id(season, taken_on),
            season,
            taken_on,
            records,
        }
    }

    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            id: self.id.clone(),
            season: self.season,
            taken_on: self.taken_on,
            player_count: self.records.len(),
        }
    }
}

/// The ID a snapshot of `season` taken on `taken_on` receives.
pub fn snapshot_id(season: i32, taken_on: NaiveDate) -> SnapshotId {
    SnapshotId::generate(&[&season.to_string(), &taken_on.to_string()])
}

/// Snapshot metadata without the player rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub id: SnapshotId,
    pub season: i32,
    pub taken_on: NaiveDate,
    pub player_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_id_is_derived() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let a = Snapshot::new(2025, date, vec![]);
        let b = Snapshot::new(2025, date, vec![MetricRecord::new("x", "X")]);

        // Same season and date -> same snapshot identity regardless of contents
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, snapshot_id(2025, date));
    }

    #[test]
    fn test_snapshot_info() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 14).unwrap();
        let snapshot = Snapshot::new(
            2024,
            date,
            vec![MetricRecord::new("a", "A"), MetricRecord::new("b", "B")],
        );

        let info = snapshot.info();
        assert_eq!(info.season, 2024);
        assert_eq!(info.taken_on, date);
        assert_eq!(info.player_count, 2);
    }
}
