//! Composite score aggregation.
//!
//! A player's composite score is the mean of their per-metric ranks, with
//! every metric weighted equally. Scores are rounded before being ranked
//! ascending with the same dense-rank routine the metrics use.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::dense_rank::{dense_rank, RankOrder};
use super::metric_rank::MetricRanks;
use super::RankError;
use crate::models::{MetricName, PlayerId};

/// Decimal places kept on composite scores unless configured otherwise.
pub const DEFAULT_SCORE_PRECISION: u32 = 1;

/// A player's composite score and its rank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub score: f64,
    pub rank: u32,
}

/// Round `value` to `precision` decimal places.
pub fn round_score(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Combine per-metric ranks into composite scores and composite ranks.
///
/// Every player must carry a rank for every metric in `metrics`.
pub fn aggregate(
    ranks: &MetricRanks,
    metrics: &[MetricName],
    precision: u32,
) -> Result<BTreeMap<PlayerId, CompositeScore>, RankError> {
    if metrics.is_empty() {
        return Err(RankError::EmptyMetricSet);
    }

    // MetricRanks is a BTreeMap, so players arrive sorted by id
    let mut scores = Vec::with_capacity(ranks.len());
    for (player, player_ranks) in ranks {
        let mut total = 0u64;
        for metric in metrics {
            let rank = player_ranks
                .get(metric)
                .ok_or_else(|| RankError::IncompleteRanks {
                    player: player.clone(),
                    metric: metric.clone(),
                })?;
            total += u64::from(*rank);
        }
        let mean = total as f64 / metrics.len() as f64;
        scores.push((player.clone(), round_score(mean, precision)));
    }

    let by_player: BTreeMap<PlayerId, f64> = scores.iter().cloned().collect();
    let entries = scores.into_iter().map(|(p, s)| (p, Some(s))).collect();

    Ok(dense_rank(entries, RankOrder::Ascending)
        .into_iter()
        .map(|(player, rank)| {
            let score = by_player[&player];
            (player, CompositeScore { score, rank })
        })
        .collect())
}
