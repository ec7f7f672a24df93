//! # Hoops Rank
//!
//! Composite player rankings built from advanced basketball metrics.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (metric records, snapshots, leaderboards, trends)
//! - **calculate**: Ranking engine, name normalization, identity matching and trends
//! - **storage**: Filesystem data lake of published snapshots (JSONL)
//! - **pipeline**: Ranking and trend workflows over a snapshot store
//! - **config**: Configuration loading and validation

pub mod calculate;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod storage;

pub use models::*;

/// Display label of a season given its ending year (2025 -> "2024-25").
pub fn season_label(season: i32) -> String {
    format!("{}-{:02}", season - 1, season.rem_euclid(100))
}

/// Parse a season as either its ending year ("2025") or its label ("2024-25").
pub fn parse_season(s: &str) -> Option<i32> {
    let s = s.trim();
    match s.split_once('-') {
        None => s.parse().ok(),
        Some((start, end)) => {
            let start: i32 = start.parse().ok()?;
            let season = start + 1;
            let matches_end = match end.len() {
                2 => end.parse::<i32>().ok()? == season.rem_euclid(100),
                4 => end.parse::<i32>().ok()? == season,
                _ => false,
            };
            matches_end.then_some(season)
        }
    }
}
