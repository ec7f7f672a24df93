//! Orchestration over an injected snapshot store.
//!
//! The ranking core is pure; this module wires it to persistence:
//! rank and publish, trends between stored snapshots, season histories and
//! verification re-runs.

use std::path::Path;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calculate::{
    compute_trend, rank_snapshot, IdentityMatcher, TrendSummary, TrendWindow,
};
use crate::config::RankingConfig;
use crate::models::{Leaderboard, MetricRecord, Snapshot, SnapshotInfo, TrendRecord};
use crate::storage::jsonl::JsonlReader;
use crate::storage::SnapshotStore;

/// Read raw metric rows from a JSONL file.
pub fn load_records(path: &Path) -> Result<Vec<MetricRecord>> {
    let records = JsonlReader::<MetricRecord>::new(path.to_path_buf())
        .read_all()
        .with_context(|| format!("Failed to read metric records from {:?}", path))?;
    info!("Loaded {} metric records from {:?}", records.len(), path);
    Ok(records)
}

/// Rank a snapshot and publish it with its leaderboard.
pub fn publish_snapshot(
    store: &dyn SnapshotStore,
    snapshot: &Snapshot,
    config: &RankingConfig,
) -> Result<Leaderboard> {
    let leaderboard = rank_snapshot(snapshot, config)
        .with_context(|| format!("Failed to rank snapshot {}", snapshot.id))?;
    store
        .publish(snapshot, &leaderboard)
        .with_context(|| format!("Failed to publish snapshot {}", snapshot.id))?;

    info!(
        "Season {} snapshot {} ranked: {} players, {} qualified",
        snapshot.season,
        snapshot.taken_on,
        leaderboard.len(),
        leaderboard.qualified().count()
    );
    Ok(leaderboard)
}

/// Trends of one snapshot against an earlier baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub current: SnapshotInfo,
    /// None when no snapshot qualifies as baseline; every player is then NEW
    pub baseline: Option<SnapshotInfo>,
    pub summary: TrendSummary,
    pub trends: Vec<TrendRecord>,
}

fn trend_report(
    store: &dyn SnapshotStore,
    current: SnapshotInfo,
    baseline: Option<SnapshotInfo>,
    matcher: &dyn IdentityMatcher,
) -> Result<TrendReport> {
    let current_board = store.load_leaderboard(current.season, current.taken_on)?;
    let previous_records = match &baseline {
        Some(info) => store.load_leaderboard(info.season, info.taken_on)?.records,
        None => Vec::new(),
    };

    let trends = compute_trend(&current_board.records, &previous_records, matcher);
    let summary = TrendSummary::from_trends(&trends);
    if summary.unresolved > 0 {
        warn!(
            "{} players could not be matched unambiguously against the baseline",
            summary.unresolved
        );
    }

    Ok(TrendReport {
        current,
        baseline,
        summary,
        trends,
    })
}

/// Latest snapshot of `season` against the latest one at least `window` older.
pub fn trend_in_season(
    store: &dyn SnapshotStore,
    season: i32,
    window: TrendWindow,
    matcher: &dyn IdentityMatcher,
) -> Result<TrendReport> {
    let Some(current) = store.latest(season)? else {
        bail!("No snapshots stored for season {}", season);
    };

    let cutoff = window.baseline_date(current.taken_on);
    let baseline = store.latest_on_or_before(season, cutoff)?;
    match &baseline {
        Some(b) => info!("{} trend: {} against {}", window, current.taken_on, b.taken_on),
        None => warn!("No baseline on or before {} for season {}", cutoff, season),
    }

    trend_report(store, current, baseline, matcher)
}

/// Final standings of `season` against those of `previous_season`.
pub fn trend_between_seasons(
    store: &dyn SnapshotStore,
    season: i32,
    previous_season: i32,
    matcher: &dyn IdentityMatcher,
) -> Result<TrendReport> {
    let Some(current) = store.latest(season)? else {
        bail!("No snapshots stored for season {}", season);
    };
    let baseline = store.latest(previous_season)?;
    if baseline.is_none() {
        warn!("No snapshots stored for season {}", previous_season);
    }

    trend_report(store, current, baseline, matcher)
}

/// The latest leaderboard of every stored season, oldest first.
pub fn final_leaderboards(store: &dyn SnapshotStore) -> Result<Vec<Leaderboard>> {
    let mut boards = Vec::new();
    for season in store.seasons()? {
        if let Some(info) = store.latest(season)? {
            boards.push(store.load_leaderboard(info.season, info.taken_on)?);
        }
    }
    Ok(boards)
}

/// A stored leaderboard that re-ranking did not reproduce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyMismatch {
    pub snapshot: SnapshotInfo,
    pub differing_records: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub checked: usize,
    pub mismatches: Vec<VerifyMismatch>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

fn differing_records(stored: &Leaderboard, fresh: &Leaderboard) -> usize {
    let paired = stored
        .records
        .iter()
        .zip(&fresh.records)
        .filter(|(a, b)| a != b)
        .count();
    paired + stored.records.len().abs_diff(fresh.records.len())
}

/// The ranking parameters a stored leaderboard was computed with.
fn stored_parameters(leaderboard: &Leaderboard) -> RankingConfig {
    RankingConfig {
        min_minutes: leaderboard.min_minutes,
        metrics: leaderboard.metrics.clone(),
        score_precision: leaderboard.score_precision,
    }
}

/// Re-rank stored snapshots and compare with their stored leaderboards.
///
/// Each snapshot is re-ranked with the parameters recorded at publish time,
/// so a later config change does not show up as a mismatch.
pub fn verify(store: &dyn SnapshotStore, season: Option<i32>) -> Result<VerifyReport> {
    let infos = store.list(season)?;
    let mut snapshots = Vec::with_capacity(infos.len());
    let mut stored = Vec::with_capacity(infos.len());
    for info in &infos {
        snapshots.push(store.load_snapshot(info.season, info.taken_on)?);
        stored.push(store.load_leaderboard(info.season, info.taken_on)?);
    }

    let fresh = snapshots
        .par_iter()
        .zip(&stored)
        .map(|(snapshot, stored)| rank_snapshot(snapshot, &stored_parameters(stored)))
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to re-rank stored snapshots")?;

    let mut report = VerifyReport {
        checked: infos.len(),
        mismatches: Vec::new(),
    };
    for ((info, stored), fresh) in infos.into_iter().zip(&stored).zip(&fresh) {
        if stored != fresh {
            let differing = differing_records(stored, fresh);
            warn!(
                "Snapshot {} ({} {}) differs from a fresh ranking in {} records",
                info.id, info.season, info.taken_on, differing
            );
            report.mismatches.push(VerifyMismatch {
                snapshot: info,
                differing_records: differing,
            });
        }
    }

    info!(
        "Verified {} snapshots, {} mismatched",
        report.checked,
        report.mismatches.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculate::NameMatcher;
    use crate::models::TrendDirection;
    use crate::storage::jsonl::JsonlWriter;
    use crate::storage::{JsonlSnapshotStore, StorageConfig};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store(temp_dir: &TempDir) -> JsonlSnapshotStore {
        JsonlSnapshotStore::new(StorageConfig::new(temp_dir.path().to_path_buf()))
    }

    fn config() -> RankingConfig {
        RankingConfig {
            metrics: vec!["per".into(), "ws".into()],
            ..RankingConfig::default()
        }
    }

    fn record(id: &str, name: &str, per: f64, ws: f64) -> MetricRecord {
        MetricRecord::new(id, name)
            .with_minutes(2000)
            .with_metric("per", Some(per))
            .with_metric("ws", Some(ws))
    }

    fn publish(store: &JsonlSnapshotStore, season: i32, taken_on: NaiveDate, records: Vec<MetricRecord>) {
        publish_snapshot(store, &Snapshot::new(season, taken_on, records), &config()).unwrap();
    }

    #[test]
    fn test_load_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("records.jsonl");
        std::fs::write(
            &path,
            r#"{"player_id":"a","display_name":"A","minutes_played":1500,"metrics":{"per":20.5}}
{"player_id":"b","display_name":"B","metrics":{"per":null}}
"#,
        )
        .unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].metric(&"per".into()), Some(20.5));
        assert!(load_records(&temp_dir.path().join("missing.jsonl")).is_err());
    }

    #[test]
    fn test_publish_snapshot_rejects_invalid_input() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let snapshot = Snapshot::new(
            2025,
            date(2025, 1, 1),
            vec![record("a", "A", 1.0, 1.0), record("a", "A", 2.0, 2.0)],
        );

        assert!(publish_snapshot(&store, &snapshot, &config()).is_err());
        assert!(store.list(None).unwrap().is_empty());
    }

    #[test]
    fn test_trend_in_season_uses_window_baseline() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        publish(
            &store,
            2025,
            date(2025, 1, 1),
            vec![record("a", "Anthony Edwards", 20.0, 5.0), record("b", "Brandon Miller", 25.0, 8.0)],
        );
        publish(
            &store,
            2025,
            date(2025, 1, 7),
            vec![record("a", "Anthony Edwards", 30.0, 9.0), record("b", "Brandon Miller", 18.0, 4.0)],
        );
        publish(
            &store,
            2025,
            date(2025, 1, 8),
            vec![
                record("a", "Anthony Edwards", 30.0, 9.0),
                record("b", "Brandon Miller", 18.0, 4.0),
                record("c", "Cooper Flagg", 10.0, 1.0),
            ],
        );

        let report = trend_in_season(&store, 2025, TrendWindow::SevenDays, &NameMatcher::new()).unwrap();

        assert_eq!(report.current.taken_on, date(2025, 1, 8));
        assert_eq!(report.baseline.as_ref().map(|b| b.taken_on), Some(date(2025, 1, 1)));

        let a = report.trends.iter().find(|t| t.player.as_str() == "a").unwrap();
        assert_eq!(a.direction, TrendDirection::Up);
        let c = report.trends.iter().find(|t| t.player.as_str() == "c").unwrap();
        assert_eq!(c.direction, TrendDirection::New);
        assert_eq!(report.summary.new, 1);

        let daily = trend_in_season(&store, 2025, TrendWindow::OneDay, &NameMatcher::new()).unwrap();
        assert_eq!(daily.baseline.map(|b| b.taken_on), Some(date(2025, 1, 7)));
    }

    #[test]
    fn test_trend_without_baseline_is_all_new() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        publish(&store, 2025, date(2025, 1, 8), vec![record("a", "A", 1.0, 1.0)]);

        let report = trend_in_season(&store, 2025, TrendWindow::FourteenDays, &NameMatcher::new()).unwrap();

        assert!(report.baseline.is_none());
        assert_eq!(report.summary.new, 1);
        assert!(trend_in_season(&store, 2019, TrendWindow::OneDay, &NameMatcher::new()).is_err());
    }

    #[test]
    fn test_trend_between_seasons() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        publish(
            &store,
            2024,
            date(2024, 4, 14),
            vec![record("x1", "Alperen Şengün", 10.0, 1.0), record("y", "Other", 20.0, 2.0)],
        );
        publish(
            &store,
            2025,
            date(2025, 4, 13),
            vec![record("x2", "Alperen Sengun", 20.0, 2.0), record("y", "Other", 10.0, 1.0)],
        );

        let report = trend_between_seasons(&store, 2025, 2024, &NameMatcher::new()).unwrap();
        let sengun = report.trends.iter().find(|t| t.player.as_str() == "x2").unwrap();

        assert_eq!(sengun.previous_rank, Some(2));
        assert_eq!(sengun.rank_delta, Some(1));
        assert_eq!(report.summary.up, 1);
        assert_eq!(report.summary.down, 1);
    }

    #[test]
    fn test_final_leaderboards_and_verify() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        publish(&store, 2024, date(2024, 4, 14), vec![record("a", "A", 1.0, 2.0)]);
        publish(&store, 2025, date(2025, 1, 1), vec![record("a", "A", 3.0, 4.0)]);
        publish(
            &store,
            2025,
            date(2025, 4, 13),
            vec![record("a", "A", 5.0, 6.0), record("b", "B", 7.0, 8.0)],
        );

        let finals = final_leaderboards(&store).unwrap();
        assert_eq!(finals.len(), 2);
        assert_eq!(finals[1].taken_on, date(2025, 4, 13));

        let report = verify(&store, None).unwrap();
        assert_eq!(report.checked, 3);
        assert!(report.is_clean());

        // an edited leaderboard no longer matches a fresh ranking
        let taken_on = date(2025, 4, 13);
        let mut edited = store.load_leaderboard(2025, taken_on).unwrap();
        edited.records[0].composite_score += 1.0;
        let ranked_path = store.config().snapshot_dir(2025, taken_on).join("ranked.jsonl");
        JsonlWriter::new(ranked_path).write_all(&edited.records).unwrap();

        let report = verify(&store, Some(2025)).unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches[0].snapshot.taken_on, taken_on);
        assert_eq!(report.mismatches[0].differing_records, 1);
    }

    #[test]
    fn test_verify_uses_parameters_stored_at_publish() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let published_with = RankingConfig {
            min_minutes: 500,
            metrics: vec!["per".into(), "ws".into(), "bpm".into()],
            score_precision: 2,
        };
        let records = vec![
            record("a", "A", 20.0, 4.0).with_metric("bpm", Some(1.0)),
            record("b", "B", 25.0, 3.0).with_metric("bpm", Some(2.0)),
            record("c", "C", 15.0, 5.0).with_metric("bpm", Some(3.0)),
        ];
        let snapshot = Snapshot::new(2025, date(2025, 4, 13), records);
        let leaderboard = publish_snapshot(&store, &snapshot, &published_with).unwrap();
        assert_eq!(leaderboard.score_precision, 2);
        assert_eq!(leaderboard.records[0].composite_score, 1.67);

        // today's configuration differs in every parameter
        let report = verify(&store, None).unwrap();
        assert_eq!(report.checked, 1);
        assert!(report.is_clean());
    }
}
