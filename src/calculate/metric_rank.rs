//! Per-metric dense ranking for one snapshot.

use std::collections::BTreeMap;

use rayon::prelude::*;

use super::dense_rank::{dense_rank, RankOrder};
use crate::models::{MetricName, MetricRecord, PlayerId};

/// Per-player ranks for each metric.
pub type MetricRanks = BTreeMap<PlayerId, BTreeMap<MetricName, u32>>;

/// Rank every record on every metric independently.
///
/// Higher raw values rank better. An absent value ranks below all present
/// values for that metric. Metrics are ranked in parallel; every player in
/// `records` gets an entry for every metric in `metrics`.
pub fn rank_metrics(records: &[MetricRecord], metrics: &[MetricName]) -> MetricRanks {
    let per_metric: Vec<(&MetricName, Vec<(PlayerId, u32)>)> = metrics
        .par_iter()
        .map(|metric| (metric, rank_metric(records, metric)))
        .collect();

    let mut ranks = MetricRanks::new();
    for (metric, ranked) in per_metric {
        for (player, rank) in ranked {
            ranks
                .entry(player)
                .or_default()
                .insert(metric.clone(), rank);
        }
    }
    ranks
}

/// Dense ranks for a single metric.
pub fn rank_metric(records: &[MetricRecord], metric: &MetricName) -> Vec<(PlayerId, u32)> {
    let entries = records
        .iter()
        .map(|r| (r.player_id.clone(), r.metric(metric)))
        .collect();
    dense_rank(entries, RankOrder::Descending)
}
