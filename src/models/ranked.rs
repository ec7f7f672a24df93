//! Ranked output - per-player ranks and the season leaderboard.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{MetricName, PlayerId, SnapshotId, SnapshotInfo};
use crate::calculate::composite::DEFAULT_SCORE_PRECISION;

/// One player's ranks within one snapshot.
///
/// Produced only by the ranking pipeline; a changed input means a new
/// leaderboard, never an edited record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecord {
    pub player: PlayerId,

    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    pub games_played: Option<u32>,

    pub minutes_played: Option<u32>,

    /// Raw metric values that were present
    pub metrics: BTreeMap<MetricName, f64>,

    /// Dense rank per metric (1 = best)
    pub per_metric_rank: BTreeMap<MetricName, u32>,

    /// Mean of the per-metric ranks, rounded (lower = better)
    pub composite_score: f64,

    /// Dense rank of the composite score (1 = best)
    pub composite_rank: u32,

    /// Met the minutes threshold
    pub qualified: bool,
}

impl RankedRecord {
    pub fn metric(&self, name: &MetricName) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn metric_rank(&self, name: &MetricName) -> Option<u32> {
        self.per_metric_rank.get(name).copied()
    }
}

fn default_score_precision() -> u32 {
    DEFAULT_SCORE_PRECISION
}

/// The complete ranked output for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub snapshot_id: SnapshotId,

    pub season: i32,

    pub taken_on: NaiveDate,

    /// Metrics that fed the composite score, in configured order
    pub metrics: Vec<MetricName>,

    /// Qualification threshold used
    pub min_minutes: u32,

    /// Decimal places the composite score was rounded to
    #[serde(default = "default_score_precision")]
    pub score_precision: u32,

    /// Sorted by (composite_rank, player)
    pub records: Vec<RankedRecord>,
}

impl Leaderboard {
    pub fn get(&self, player: &PlayerId) -> Option<&RankedRecord> {
        self.records.iter().find(|r| &r.player == player)
    }

    /// Records of qualified players, in rank order.
    pub fn qualified(&self) -> impl Iterator<Item = &RankedRecord> {
        self.records.iter().filter(|r| r.qualified)
    }

    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            id: self.snapshot_id.clone(),
            season: self.season,
            taken_on: self.taken_on,
            player_count: self.records.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
