//! Ranking engine.
//!
//! Turns a snapshot's raw metric rows into a leaderboard:
//! - Per-metric dense ranks (absent values rank last)
//! - Playing-time qualification
//! - Composite score (mean rank) and composite rank
//!
//! and compares leaderboards:
//! - Canonical-name identity matching across snapshots
//! - Rank trends, movers, season histories

pub mod composite;
pub mod dense_rank;
pub mod filter;
pub mod history;
pub mod identity;
pub mod metric_rank;
pub mod normalize;
pub mod qualify;
pub mod trend;

use std::collections::BTreeSet;

use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::config::RankingConfig;
use crate::models::{Leaderboard, MetricName, PlayerId, RankedRecord, Snapshot};

pub use composite::{aggregate, CompositeScore};
pub use filter::{LeaderboardPage, LeaderboardQuery};
pub use identity::{IdentityMatcher, MatchOutcome, NameMatcher};
pub use metric_rank::{rank_metrics, MetricRanks};
pub use normalize::{normalize, CanonicalKey};
pub use qualify::qualify;
pub use trend::{compute_trend, top_movers, Movers, TrendSummary, TrendWindow};

/// Reasons a snapshot cannot be ranked. Any of them rejects the whole snapshot.
#[derive(Debug, Error)]
pub enum RankError {
    #[error("Malformed record for player {player}: {reason}")]
    MalformedRecord { player: PlayerId, reason: String },

    #[error("Player {0} appears more than once in the snapshot")]
    DuplicatePlayer(PlayerId),

    #[error("No metrics configured for the composite score")]
    EmptyMetricSet,

    #[error("Player {player} has no rank for metric {metric}")]
    IncompleteRanks { player: PlayerId, metric: MetricName },
}

/// Reject snapshots the engine must not silently coerce.
pub fn validate_snapshot(snapshot: &Snapshot) -> Result<(), RankError> {
    let mut seen = BTreeSet::new();
    for record in &snapshot.records {
        if !seen.insert(&record.player_id) {
            return Err(RankError::DuplicatePlayer(record.player_id.clone()));
        }
        for (metric, value) in &record.metrics {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(RankError::MalformedRecord {
                        player: record.player_id.clone(),
                        reason: format!("metric {} is not a finite number ({})", metric, v),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Rank one snapshot in full.
///
/// Either every player gets a complete, consistent record or the snapshot is
/// rejected. Records are ordered by composite rank, then player id.
pub fn rank_snapshot(snapshot: &Snapshot, config: &RankingConfig) -> Result<Leaderboard, RankError> {
    if config.metrics.is_empty() {
        return Err(RankError::EmptyMetricSet);
    }
    validate_snapshot(snapshot)?;

    let metric_ranks = rank_metrics(&snapshot.records, &config.metrics);
    let composite = aggregate(&metric_ranks, &config.metrics, config.score_precision)?;

    let mut records = Vec::with_capacity(snapshot.records.len());
    for record in &snapshot.records {
        let per_metric_rank = metric_ranks.get(&record.player_id).cloned().unwrap_or_default();
        let score = composite
            .get(&record.player_id)
            .copied()
            .ok_or_else(|| RankError::IncompleteRanks {
                player: record.player_id.clone(),
                metric: config.metrics[0].clone(),
            })?;

        records.push(RankedRecord {
            player: record.player_id.clone(),
            display_name: record.display_name.clone(),
            team: record.team.clone(),
            games_played: record.games_played,
            minutes_played: record.minutes_played,
            metrics: record
                .metrics
                .iter()
                .filter_map(|(name, value)| value.map(|v| (name.clone(), v)))
                .collect(),
            per_metric_rank,
            composite_score: score.score,
            composite_rank: score.rank,
            qualified: qualify(record, config.min_minutes),
        });
    }
    records.sort_by(|a, b| {
        a.composite_rank
            .cmp(&b.composite_rank)
            .then_with(|| a.player.cmp(&b.player))
    });

    debug!(
        "Ranked {} players for season {} ({})",
        records.len(),
        snapshot.season,
        snapshot.taken_on
    );

    Ok(Leaderboard {
        snapshot_id: snapshot.id.clone(),
        season: snapshot.season,
        taken_on: snapshot.taken_on,
        metrics: config.metrics.clone(),
        min_minutes: config.min_minutes,
        score_precision: config.score_precision,
        records,
    })
}

/// Rank several independent snapshots in parallel.
///
/// All or nothing: the first failure rejects the batch.
pub fn rank_snapshots(
    snapshots: &[Snapshot],
    config: &RankingConfig,
) -> Result<Vec<Leaderboard>, RankError> {
    snapshots
        .par_iter()
        .map(|snapshot| rank_snapshot(snapshot, config))
        .collect()
}
