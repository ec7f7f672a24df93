//! Trend calculation between two leaderboards.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::identity::{IdentityMatcher, MatchOutcome};
use crate::models::{PlayerId, RankedRecord, TrendDirection, TrendRecord};

/// Compare every current player's composite rank with the previous snapshot.
///
/// Output follows the order of `current`.
pub fn compute_trend(
    current: &[RankedRecord],
    previous: &[RankedRecord],
    matcher: &dyn IdentityMatcher,
) -> Vec<TrendRecord> {
    let matches = matcher.match_snapshots(current, previous);

    let mut previous_rank: BTreeMap<&PlayerId, u32> = BTreeMap::new();
    for record in previous {
        previous_rank
            .entry(&record.player)
            .and_modify(|r| *r = (*r).min(record.composite_rank))
            .or_insert(record.composite_rank);
    }

    current
        .iter()
        .map(|record| {
            let outcome = matches
                .get(&record.player)
                .cloned()
                .unwrap_or(MatchOutcome::NoMatch);
            trend_record(record, outcome, &previous_rank)
        })
        .collect()
}

fn trend_record(
    record: &RankedRecord,
    outcome: MatchOutcome,
    previous_rank: &BTreeMap<&PlayerId, u32>,
) -> TrendRecord {
    let mut trend = TrendRecord {
        player: record.player.clone(),
        display_name: record.display_name.clone(),
        current_rank: record.composite_rank,
        previous_rank: None,
        rank_delta: None,
        direction: TrendDirection::New,
        candidates: Vec::new(),
    };

    match outcome {
        MatchOutcome::Exact(previous) => {
            if let Some(&rank) = previous_rank.get(&previous) {
                let delta = i64::from(rank) - i64::from(record.composite_rank);
                trend.previous_rank = Some(rank);
                trend.rank_delta = Some(delta);
                trend.direction = TrendDirection::from_delta(delta);
            }
        }
        MatchOutcome::NoMatch => {}
        MatchOutcome::Ambiguous(candidates) => {
            trend.direction = TrendDirection::Unresolved;
            trend.candidates = candidates;
        }
    }

    trend
}

/// Count of trend records per direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub up: usize,
    pub down: usize,
    pub same: usize,
    pub new: usize,
    pub unresolved: usize,
}

impl TrendSummary {
    pub fn from_trends(trends: &[TrendRecord]) -> Self {
        let mut summary = Self::default();
        for trend in trends {
            match trend.direction {
                TrendDirection::Up => summary.up += 1,
                TrendDirection::Down => summary.down += 1,
                TrendDirection::Same => summary.same += 1,
                TrendDirection::New => summary.new += 1,
                TrendDirection::Unresolved => summary.unresolved += 1,
            }
        }
        summary
    }
}

/// Biggest risers and fallers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movers {
    pub trending_up: Vec<TrendRecord>,
    pub trending_down: Vec<TrendRecord>,
}

/// The `limit` largest moves in each direction.
///
/// Ties go to the better current rank, then the player id. NEW and
/// UNRESOLVED records never count as movers.
pub fn top_movers(trends: &[TrendRecord], limit: usize) -> Movers {
    let mut up: Vec<&TrendRecord> = trends
        .iter()
        .filter(|t| t.direction == TrendDirection::Up)
        .collect();
    let mut down: Vec<&TrendRecord> = trends
        .iter()
        .filter(|t| t.direction == TrendDirection::Down)
        .collect();

    let delta = |t: &TrendRecord| t.rank_delta.unwrap_or(0);
    up.sort_by(|a, b| {
        delta(b)
            .cmp(&delta(a))
            .then(a.current_rank.cmp(&b.current_rank))
            .then_with(|| a.player.cmp(&b.player))
    });
    down.sort_by(|a, b| {
        delta(a)
            .cmp(&delta(b))
            .then(a.current_rank.cmp(&b.current_rank))
            .then_with(|| a.player.cmp(&b.player))
    });

    Movers {
        trending_up: up.into_iter().take(limit).cloned().collect(),
        trending_down: down.into_iter().take(limit).cloned().collect(),
    }
}

/// Look-back window for in-season trends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendWindow {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "14d")]
    FourteenDays,
}

impl TrendWindow {
    pub fn days(&self) -> i64 {
        match self {
            TrendWindow::OneDay => 1,
            TrendWindow::SevenDays => 7,
            TrendWindow::FourteenDays => 14,
        }
    }

    /// Latest date a baseline snapshot may have been taken on.
    pub fn baseline_date(&self, current: NaiveDate) -> NaiveDate {
        current - Duration::days(self.days())
    }
}

impl FromStr for TrendWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1d" => Ok(TrendWindow::OneDay),
            "7d" => Ok(TrendWindow::SevenDays),
            "14d" => Ok(TrendWindow::FourteenDays),
            other => Err(format!("unknown trend window '{}' (expected 1d, 7d or 14d)", other)),
        }
    }
}

impl std::fmt::Display for TrendWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}d", self.days())
    }
}
