//! Season finishes and all-time leaderboards.
//!
//! Only the final (latest) leaderboard of each season counts as that
//! season's finish.
//!
//! Seasons are joined on `PlayerId`, not on names: a player whose id changed
//! between seasons shows up as two players here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Leaderboard, PlayerId};
use crate::season_label;

/// A player's finish in one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonFinish {
    pub season: i32,
    pub season_label: String,
    pub player: PlayerId,
    pub display_name: String,
    pub composite_rank: u32,
    pub composite_score: f64,
    pub qualified: bool,
}

/// All season finishes of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerHistory {
    pub player: PlayerId,
    /// Name from the most recent season
    pub display_name: String,
    /// Oldest season first
    pub seasons: Vec<SeasonFinish>,
    pub seasons_qualified: usize,
    /// Best composite rank in a qualified season
    pub best_rank: Option<u32>,
}

/// Count of first-place finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberOnes {
    pub player: PlayerId,
    pub display_name: String,
    pub count: usize,
}

/// The latest leaderboard of each season, oldest season first.
pub fn final_leaderboards(leaderboards: &[Leaderboard]) -> Vec<&Leaderboard> {
    let mut latest: BTreeMap<i32, &Leaderboard> = BTreeMap::new();
    for board in leaderboards {
        latest
            .entry(board.season)
            .and_modify(|current| {
                if board.taken_on > current.taken_on {
                    *current = board;
                }
            })
            .or_insert(board);
    }
    latest.into_values().collect()
}

fn finishes(leaderboards: &[Leaderboard]) -> Vec<SeasonFinish> {
    final_leaderboards(leaderboards)
        .into_iter()
        .flat_map(|board| {
            board.records.iter().map(move |r| SeasonFinish {
                season: board.season,
                season_label: season_label(board.season),
                player: r.player.clone(),
                display_name: r.display_name.clone(),
                composite_rank: r.composite_rank,
                composite_score: r.composite_score,
                qualified: r.qualified,
            })
        })
        .collect()
}

/// Season-by-season finishes of `player`, or `None` if they never appear.
pub fn player_history(leaderboards: &[Leaderboard], player: &PlayerId) -> Option<PlayerHistory> {
    let seasons: Vec<SeasonFinish> = finishes(leaderboards)
        .into_iter()
        .filter(|f| &f.player == player)
        .collect();

    let display_name = seasons.last()?.display_name.clone();
    let qualified: Vec<&SeasonFinish> = seasons.iter().filter(|f| f.qualified).collect();
    let best_rank = qualified.iter().map(|f| f.composite_rank).min();

    Some(PlayerHistory {
        player: player.clone(),
        display_name,
        seasons_qualified: qualified.len(),
        best_rank,
        seasons,
    })
}

/// The `limit` lowest composite scores among qualified season finishes.
pub fn best_single_seasons(leaderboards: &[Leaderboard], limit: usize) -> Vec<SeasonFinish> {
    let mut qualified: Vec<SeasonFinish> = finishes(leaderboards)
        .into_iter()
        .filter(|f| f.qualified)
        .collect();

    qualified.sort_by(|a, b| {
        a.composite_score
            .total_cmp(&b.composite_score)
            .then(a.season.cmp(&b.season))
            .then_with(|| a.player.cmp(&b.player))
    });
    qualified.truncate(limit);
    qualified
}

/// Players ranked by qualified first-place season finishes.
pub fn most_number_ones(leaderboards: &[Leaderboard]) -> Vec<NumberOnes> {
    let mut counts: BTreeMap<PlayerId, NumberOnes> = BTreeMap::new();
    for finish in finishes(leaderboards) {
        if !finish.qualified || finish.composite_rank != 1 {
            continue;
        }
        counts
            .entry(finish.player.clone())
            .and_modify(|n| {
                n.count += 1;
                n.display_name = finish.display_name.clone();
            })
            .or_insert(NumberOnes {
                player: finish.player.clone(),
                display_name: finish.display_name.clone(),
                count: 1,
            });
    }

    let mut ones: Vec<NumberOnes> = counts.into_values().collect();
    ones.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.player.cmp(&b.player)));
    ones
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculate::test_support::{leaderboard_on, ranked};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn boards() -> Vec<Leaderboard> {
        let mut bench = ranked("jokic", "Nikola Jokic", 3);
        bench.qualified = false;

        vec![
            leaderboard_on(
                2024,
                date(2024, 4, 14),
                vec![ranked("jokic", "Nikola Jokic", 1), ranked("sga", "Shai", 2)],
            ),
            // mid-season snapshot of 2025, superseded below
            leaderboard_on(
                2025,
                date(2025, 1, 10),
                vec![ranked("sga", "Shai", 1), ranked("jokic", "Nikola Jokic", 2)],
            ),
            leaderboard_on(
                2025,
                date(2025, 4, 13),
                vec![ranked("jokic", "Nikola Jokić", 1), ranked("sga", "Shai", 2)],
            ),
            leaderboard_on(2023, date(2023, 4, 9), vec![bench, ranked("embiid", "Joel", 1)]),
        ]
    }

    #[test]
    fn test_final_leaderboards_pick_latest_snapshot() {
        let boards = boards();
        let finals = final_leaderboards(&boards);

        let seasons: Vec<i32> = finals.iter().map(|b| b.season).collect();
        assert_eq!(seasons, vec![2023, 2024, 2025]);
        assert_eq!(finals[2].taken_on, date(2025, 4, 13));
    }

    #[test]
    fn test_player_history() {
        let history = player_history(&boards(), &PlayerId::from("jokic")).unwrap();

        assert_eq!(history.seasons.len(), 3);
        assert_eq!(history.seasons[0].season_label, "2022-23");
        assert_eq!(history.seasons_qualified, 2);
        assert_eq!(history.best_rank, Some(1));
        assert_eq!(history.display_name, "Nikola Jokić");
    }

    #[test]
    fn test_unknown_player_history() {
        assert!(player_history(&boards(), &PlayerId::from("nobody")).is_none());
    }

    #[test]
    fn test_best_single_seasons() {
        let best = best_single_seasons(&boards(), 2);
        assert_eq!(best.len(), 2);
        // ranked() scores equal their rank, so the #1 finishes come first, oldest season first
        assert_eq!(best[0].player.as_str(), "embiid");
        assert_eq!(best[1].season, 2024);
    }

    #[test]
    fn test_most_number_ones() {
        let ones = most_number_ones(&boards());

        assert_eq!(ones[0].player.as_str(), "jokic");
        assert_eq!(ones[0].count, 2);
        assert_eq!(ones[1].player.as_str(), "embiid");
        assert_eq!(ones[1].count, 1);
        // sga's first place came from a superseded mid-season snapshot
        assert!(ones.iter().all(|n| n.player.as_str() != "sga"));
    }

    #[test]
    fn test_history_joins_seasons_on_player_id() {
        let boards = vec![
            leaderboard_on(2024, date(2024, 4, 14), vec![ranked("jokicni01", "Nikola Jokic", 1)]),
            leaderboard_on(2025, date(2025, 4, 13), vec![ranked("jokic-n", "Nikola Jokic", 1)]),
        ];

        let old = player_history(&boards, &PlayerId::from("jokicni01")).unwrap();
        let new = player_history(&boards, &PlayerId::from("jokic-n")).unwrap();
        assert_eq!(old.seasons.len(), 1);
        assert_eq!(new.seasons.len(), 1);

        let ones = most_number_ones(&boards);
        assert_eq!(ones.len(), 2);
        assert!(ones.iter().all(|n| n.count == 1));
    }
}
