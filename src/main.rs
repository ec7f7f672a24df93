use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hoops_rank::calculate::filter::FieldFilter;
use hoops_rank::calculate::history::{best_single_seasons, most_number_ones, player_history};
use hoops_rank::calculate::{rank_snapshot, top_movers, LeaderboardQuery, TrendWindow};
use hoops_rank::config::AppConfig;
use hoops_rank::models::{Leaderboard, PlayerId, RankedRecord, Snapshot};
use hoops_rank::pipeline::{self, TrendReport};
use hoops_rank::storage::{JsonlSnapshotStore, SnapshotStore, StorageConfig};
use hoops_rank::{parse_season, season_label};

#[derive(Parser)]
#[command(name = "hoops-rank")]
#[command(about = "Composite basketball player rankings with trends")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank a snapshot of metric records and publish it
    Rank {
        /// JSONL file with one metric record per line
        #[arg(long)]
        input: PathBuf,

        /// Season (e.g. "2025" or "2024-25")
        #[arg(long)]
        season: String,

        /// Snapshot date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Rank and print but don't store
        #[arg(long)]
        dry_run: bool,

        /// Rows to print
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Show a stored leaderboard
    Leaderboard {
        /// Season (e.g. "2025" or "2024-25")
        #[arg(long)]
        season: String,

        /// Snapshot date (default: latest of the season)
        #[arg(long)]
        date: Option<String>,

        /// Include players below the minutes threshold
        #[arg(long)]
        all: bool,

        #[arg(long, default_value = "25")]
        limit: usize,

        #[arg(long, default_value = "0")]
        offset: usize,

        /// Numeric filter field:op:value[:value2], e.g. "per:gte:20"
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Rank movement between stored snapshots
    Trend {
        /// Season (e.g. "2025" or "2024-25")
        #[arg(long)]
        season: String,

        /// In-season look-back window: 1d, 7d or 14d
        #[arg(long, conflicts_with = "against")]
        window: Option<String>,

        /// Compare final standings with this earlier season
        #[arg(long)]
        against: Option<String>,

        /// Biggest movers to show in each direction
        #[arg(long, default_value = "5")]
        movers: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Season-by-season finishes of a player, or all-time lists without --player
    History {
        /// Player id
        #[arg(long)]
        player: Option<String>,

        /// Entries in the all-time lists
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List stored snapshots
    Snapshots {
        /// Only this season
        #[arg(long)]
        season: Option<String>,
    },

    /// Re-rank stored snapshots and compare with the stored leaderboards
    Verify {
        /// Only this season
        #[arg(long)]
        season: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    let log_level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(cli.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cli.json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("Starting hoops-rank v{}", env!("CARGO_PKG_VERSION"));

    let store = JsonlSnapshotStore::new(StorageConfig::new(config.data_dir.clone()));

    match cli.command {
        Commands::Rank {
            input,
            season,
            date,
            dry_run,
            top,
        } => {
            let season = season_arg(&season)?;
            let taken_on = date_arg(&date)?;
            let records = pipeline::load_records(&input)?;
            let snapshot = Snapshot::new(season, taken_on, records);

            let leaderboard = if dry_run {
                rank_snapshot(&snapshot, &config.ranking)?
            } else {
                pipeline::publish_snapshot(&store, &snapshot, &config.ranking)?
            };

            println!(
                "=== {} snapshot {} ({} players, {} qualified) ===\n",
                season_label(season),
                taken_on,
                leaderboard.len(),
                leaderboard.qualified().count()
            );
            let rows: Vec<&RankedRecord> = leaderboard.qualified().take(top).collect();
            print_leaderboard(&leaderboard, &rows);
            if dry_run {
                println!("\n(dry run - no data written to disk)");
            }
        }

        Commands::Leaderboard {
            season,
            date,
            all,
            limit,
            offset,
            filters,
            json,
        } => {
            let season = season_arg(&season)?;
            let taken_on = match date {
                Some(d) => date_arg(&d)?,
                None => match store.latest(season)? {
                    Some(info) => info.taken_on,
                    None => bail!("No snapshots stored for season {}", season_label(season)),
                },
            };
            let leaderboard = store.load_leaderboard(season, taken_on)?;

            let filters = filters
                .iter()
                .map(|f| f.parse::<FieldFilter>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(anyhow::Error::msg)?;
            let query = LeaderboardQuery {
                qualified_only: !all,
                filters,
                limit: Some(limit),
                offset,
            };
            let page = query.apply(&leaderboard);

            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                println!(
                    "=== {} leaderboard, {} ({} of {} players) ===\n",
                    season_label(season),
                    taken_on,
                    page.records.len(),
                    page.total
                );
                let rows: Vec<&RankedRecord> = page.records.iter().collect();
                print_leaderboard(&leaderboard, &rows);
                if page.has_more {
                    println!("\n(more: --offset {})", page.offset + page.records.len());
                }
            }
        }

        Commands::Trend {
            season,
            window,
            against,
            movers,
            json,
        } => {
            let season = season_arg(&season)?;
            let matcher = config.identity.matcher();
            let report = match against {
                Some(previous) => {
                    let previous = season_arg(&previous)?;
                    pipeline::trend_between_seasons(&store, season, previous, &matcher)?
                }
                None => {
                    let window = match window {
                        Some(w) => w.parse::<TrendWindow>().map_err(anyhow::Error::msg)?,
                        None => TrendWindow::SevenDays,
                    };
                    pipeline::trend_in_season(&store, season, window, &matcher)?
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_trend(&report, movers);
            }
        }

        Commands::History {
            player,
            limit,
            json,
        } => {
            let boards = pipeline::final_leaderboards(&store)?;

            match player {
                Some(id) => {
                    let Some(history) = player_history(&boards, &PlayerId::from(id.as_str())) else {
                        bail!("Player {} not found in any season", id);
                    };
                    if json {
                        println!("{}", serde_json::to_string_pretty(&history)?);
                    } else {
                        println!("=== {} ({}) ===\n", history.display_name, history.player);
                        for finish in &history.seasons {
                            let mark = if finish.qualified { "" } else { " (not qualified)" };
                            println!(
                                "  {}  #{:<4} score {:>5.1}{}",
                                finish.season_label, finish.composite_rank, finish.composite_score, mark
                            );
                        }
                        println!("\nQualified seasons: {}", history.seasons_qualified);
                        if let Some(best) = history.best_rank {
                            println!("Best rank:         #{}", best);
                        }
                    }
                }
                None => {
                    let best = best_single_seasons(&boards, limit);
                    let mut ones = most_number_ones(&boards);
                    ones.truncate(limit);

                    if json {
                        let out = serde_json::json!({
                            "best_single_seasons": best,
                            "most_number_ones": ones,
                        });
                        println!("{}", serde_json::to_string_pretty(&out)?);
                    } else {
                        println!("=== Best single seasons ===\n");
                        for (i, finish) in best.iter().enumerate() {
                            println!(
                                "  {:>2}. {:<28} {}  score {:.1}",
                                i + 1,
                                finish.display_name,
                                finish.season_label,
                                finish.composite_score
                            );
                        }
                        println!("\n=== Most #1 finishes ===\n");
                        for n in &ones {
                            println!("  {:<28} {}", n.display_name, n.count);
                        }
                    }
                }
            }
        }

        Commands::Snapshots { season } => {
            let season = season.as_deref().map(season_arg).transpose()?;
            let infos = store.list(season)?;
            if infos.is_empty() {
                println!("No snapshots stored.");
            } else {
                println!("=== Snapshots ({}) ===\n", infos.len());
                for info in infos {
                    println!(
                        "  {}  {}  {:>4} players  ID: {}",
                        season_label(info.season),
                        info.taken_on,
                        info.player_count,
                        info.id
                    );
                }
            }
        }

        Commands::Verify { season } => {
            let season = season.as_deref().map(season_arg).transpose()?;
            let report = pipeline::verify(&store, season)?;

            println!("Snapshots checked: {}", report.checked);
            println!("Mismatched:        {}", report.mismatches.len());
            for m in &report.mismatches {
                println!(
                    "  - {} {} ({} records differ)",
                    season_label(m.snapshot.season),
                    m.snapshot.taken_on,
                    m.differing_records
                );
            }
            if !report.is_clean() {
                bail!("{} snapshots did not reproduce", report.mismatches.len());
            }
        }
    }

    Ok(())
}

fn season_arg(s: &str) -> Result<i32> {
    parse_season(s).with_context(|| format!("Invalid season '{}' (expected 2025 or 2024-25)", s))
}

fn date_arg(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}' (expected YYYY-MM-DD)", s))
}

fn print_leaderboard(leaderboard: &Leaderboard, rows: &[&RankedRecord]) {
    let mut header = format!("{:>4}  {:>5}  {:<28} {:<4} {:>5}", "#", "score", "player", "team", "min");
    for metric in &leaderboard.metrics {
        header.push_str(&format!(" {:>7}", metric));
    }
    println!("{}", header);

    for r in rows {
        let mut line = format!(
            "{:>4}  {:>5.1}  {:<28} {:<4} {:>5}",
            r.composite_rank,
            r.composite_score,
            r.display_name,
            r.team.as_deref().unwrap_or("-"),
            r.minutes_played.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string())
        );
        for metric in &leaderboard.metrics {
            match r.metric(metric) {
                Some(v) => line.push_str(&format!(" {:>7.3}", v)),
                None => line.push_str(&format!(" {:>7}", "-")),
            }
        }
        println!("{}", line);
    }
}

fn print_trend(report: &TrendReport, movers: usize) {
    let baseline = report
        .baseline
        .as_ref()
        .map(|b| format!("{} {}", season_label(b.season), b.taken_on))
        .unwrap_or_else(|| "none".to_string());
    println!(
        "=== Trend: {} {} against {} ===\n",
        season_label(report.current.season),
        report.current.taken_on,
        baseline
    );

    let s = &report.summary;
    println!(
        "Up: {}  Down: {}  Same: {}  New: {}  Unresolved: {}\n",
        s.up, s.down, s.same, s.new, s.unresolved
    );

    let top = top_movers(&report.trends, movers);
    println!("Trending up:");
    for t in &top.trending_up {
        println!("  +{:<3} {:<28} #{}", t.rank_delta.unwrap_or(0), t.display_name, t.current_rank);
    }
    println!("\nTrending down:");
    for t in &top.trending_down {
        println!("  {:<4} {:<28} #{}", t.rank_delta.unwrap_or(0), t.display_name, t.current_rank);
    }

    let unresolved: Vec<_> = report.trends.iter().filter(|t| !t.is_resolved()).collect();
    if !unresolved.is_empty() {
        println!("\nUnresolved (ambiguous name match):");
        for t in unresolved {
            let candidates: Vec<&str> = t.candidates.iter().map(|c| c.as_str()).collect();
            println!("  {} ({}): {}", t.display_name, t.player, candidates.join(", "));
        }
    }
}
