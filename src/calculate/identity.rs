//! Cross-snapshot identity matching.
//!
//! A current player is linked to the previous snapshot through the canonical
//! key of their display name. When the key points at more than one distinct
//! previous player, the match is reported as ambiguous and left for the
//! caller to resolve; it is never decided by picking one.
//!
//! The same holds in the other direction: a previous player claimed by more
//! than one current player goes to at most one of them (an explicit override,
//! else the claimant carrying the same player id). The other claimants are
//! ambiguous.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::normalize::CanonicalKey;
use crate::models::{PlayerId, RankedRecord};

/// Result of looking up one current player in the previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "players", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Exactly one previous player
    Exact(PlayerId),
    /// Nobody in the previous snapshot
    NoMatch,
    /// Several distinct previous players share the canonical key, or the one
    /// previous player is also claimed by another current player
    Ambiguous(Vec<PlayerId>),
}

impl MatchOutcome {
    /// The matched previous player, only for an exact match.
    pub fn matched(&self) -> Option<&PlayerId> {
        match self {
            MatchOutcome::Exact(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, MatchOutcome::Ambiguous(_))
    }
}

/// Links current-snapshot players to previous-snapshot players.
pub trait IdentityMatcher {
    /// One outcome per current player.
    fn match_snapshots(
        &self,
        current: &[RankedRecord],
        previous: &[RankedRecord],
    ) -> BTreeMap<PlayerId, MatchOutcome>;
}

/// Index from canonical key to the distinct previous players carrying it.
#[derive(Debug, Default)]
pub struct CanonicalIndex {
    by_key: BTreeMap<CanonicalKey, BTreeSet<PlayerId>>,
}

impl CanonicalIndex {
    /// Names that normalize to an empty key are skipped: an all-punctuation or
    /// non-Latin name leaves nothing to compare, and linking every such player
    /// to every other would be evidence-free.
    pub fn build(records: &[RankedRecord]) -> Self {
        let mut by_key: BTreeMap<CanonicalKey, BTreeSet<PlayerId>> = BTreeMap::new();
        for record in records {
            let key = CanonicalKey::from_name(&record.display_name);
            if key.is_empty() {
                continue;
            }
            by_key.entry(key).or_default().insert(record.player.clone());
        }
        Self { by_key }
    }

    pub fn lookup(&self, name: &str) -> MatchOutcome {
        let mut players: Vec<PlayerId> = self
            .by_key
            .get(&CanonicalKey::from_name(name))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();

        match players.len() {
            0 => MatchOutcome::NoMatch,
            1 => MatchOutcome::Exact(players.swap_remove(0)),
            _ => MatchOutcome::Ambiguous(players),
        }
    }

    /// Keys shared by more than one previous player.
    pub fn collisions(&self) -> impl Iterator<Item = (&CanonicalKey, &BTreeSet<PlayerId>)> {
        self.by_key.iter().filter(|(_, players)| players.len() > 1)
    }
}

/// Matches players by canonical display name.
///
/// Rows that repeat the same player id under one key count as one player.
/// Caller-supplied overrides (current id to previous id) take precedence over
/// name matching.
#[derive(Debug, Clone, Default)]
pub struct NameMatcher {
    overrides: BTreeMap<PlayerId, PlayerId>,
}

impl NameMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: BTreeMap<PlayerId, PlayerId>) -> Self {
        Self { overrides }
    }

    /// Resolve `current` to `previous` explicitly.
    pub fn resolve(mut self, current: impl Into<PlayerId>, previous: impl Into<PlayerId>) -> Self {
        self.overrides.insert(current.into(), previous.into());
        self
    }
}

impl IdentityMatcher for NameMatcher {
    fn match_snapshots(
        &self,
        current: &[RankedRecord],
        previous: &[RankedRecord],
    ) -> BTreeMap<PlayerId, MatchOutcome> {
        let index = CanonicalIndex::build(previous);
        for (key, players) in index.collisions() {
            debug!("Canonical key '{}' shared by {} previous players", key, players.len());
        }

        let known: BTreeSet<&PlayerId> = previous.iter().map(|r| &r.player).collect();

        // (outcome, came from an override)
        let mut outcomes: BTreeMap<PlayerId, (MatchOutcome, bool)> = current
            .iter()
            .map(|record| {
                let outcome = match self.overrides.get(&record.player) {
                    Some(target) if known.contains(target) => (MatchOutcome::Exact(target.clone()), true),
                    _ => (index.lookup(&record.display_name), false),
                };
                (record.player.clone(), outcome)
            })
            .collect();

        let mut claimants: BTreeMap<PlayerId, Vec<PlayerId>> = BTreeMap::new();
        for (player, (outcome, _)) in &outcomes {
            if let MatchOutcome::Exact(target) = outcome {
                claimants.entry(target.clone()).or_default().push(player.clone());
            }
        }

        for (target, players) in claimants {
            if players.len() < 2 {
                continue;
            }
            debug!("Previous player {} claimed by {} current players", target, players.len());

            let overridden: Vec<&PlayerId> = players.iter().filter(|p| outcomes[*p].1).collect();
            let winner = match overridden.as_slice() {
                [] => players.iter().find(|p| **p == target).cloned(),
                [only] => Some((*only).clone()),
                // several explicit overrides to one target stand as given
                _ => None,
            };

            for player in &players {
                if Some(player) == winner.as_ref() {
                    continue;
                }
                if let Some(entry) = outcomes.get_mut(player) {
                    if !entry.1 {
                        entry.0 = MatchOutcome::Ambiguous(vec![target.clone()]);
                    }
                }
            }
        }

        outcomes
            .into_iter()
            .map(|(player, (outcome, _))| (player, outcome))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculate::test_support::ranked;

    #[test]
    fn test_exact_match_across_spellings() {
        let previous = vec![ranked("sengual01", "Alperen Şengün", 40)];
        let current = vec![ranked("sengual01-b", "Alperen Sengun", 19)];

        let matches = NameMatcher::new().match_snapshots(&current, &previous);
        assert_eq!(
            matches[&PlayerId::from("sengual01-b")],
            MatchOutcome::Exact("sengual01".into())
        );
    }

    #[test]
    fn test_no_match() {
        let previous = vec![ranked("jokicni01", "Nikola Jokic", 1)];
        let current = vec![ranked("wembavi01", "Victor Wembanyama", 12)];

        let matches = NameMatcher::new().match_snapshots(&current, &previous);
        assert_eq!(matches[&PlayerId::from("wembavi01")], MatchOutcome::NoMatch);
    }

    #[test]
    fn test_ambiguous_match_is_explicit() {
        let previous = vec![
            ranked("willimi01", "Michael Williams", 80),
            ranked("willimi02", "Michael  Williams.", 210),
        ];
        let current = vec![ranked("willimi03", "Michael Williams", 95)];

        let matches = NameMatcher::new().match_snapshots(&current, &previous);
        let outcome = &matches[&PlayerId::from("willimi03")];

        assert!(outcome.is_ambiguous());
        assert!(outcome.matched().is_none());
        assert_eq!(
            outcome,
            &MatchOutcome::Ambiguous(vec!["willimi01".into(), "willimi02".into()])
        );
    }

    #[test]
    fn test_previous_player_claimed_twice_goes_to_same_id() {
        let previous = vec![ranked("willimi01", "Michael Williams", 10)];
        let current = vec![
            ranked("willimi01", "Michael Williams", 12),
            ranked("willimi09", "Michael Williams", 300),
        ];

        let matches = NameMatcher::new().match_snapshots(&current, &previous);

        assert_eq!(
            matches[&PlayerId::from("willimi01")],
            MatchOutcome::Exact("willimi01".into())
        );
        assert_eq!(
            matches[&PlayerId::from("willimi09")],
            MatchOutcome::Ambiguous(vec!["willimi01".into()])
        );
    }

    #[test]
    fn test_previous_player_claimed_twice_without_id_hint() {
        let previous = vec![ranked("willimi01", "Michael Williams", 10)];
        let current = vec![
            ranked("willimi07", "Michael Williams", 12),
            ranked("willimi09", "Michael Williams", 300),
        ];

        let matches = NameMatcher::new().match_snapshots(&current, &previous);

        assert!(matches.values().all(MatchOutcome::is_ambiguous));
    }

    #[test]
    fn test_override_wins_contested_previous_player() {
        let previous = vec![ranked("willimi01", "Michael Williams", 10)];
        let current = vec![
            ranked("willimi01", "Michael Williams", 12),
            ranked("willimi09", "Michael Williams", 300),
        ];

        let matcher = NameMatcher::new().resolve("willimi09", "willimi01");
        let matches = matcher.match_snapshots(&current, &previous);

        assert_eq!(
            matches[&PlayerId::from("willimi09")],
            MatchOutcome::Exact("willimi01".into())
        );
        assert!(matches[&PlayerId::from("willimi01")].is_ambiguous());
    }

    #[test]
    fn test_duplicate_rows_for_one_player_are_not_ambiguous() {
        let previous = vec![
            ranked("doncilu01", "Luka Dončić", 3),
            ranked("doncilu01", "Luka Doncic", 3),
        ];
        let current = vec![ranked("doncilu01", "Luka Doncic", 2)];

        let matches = NameMatcher::new().match_snapshots(&current, &previous);
        assert_eq!(
            matches[&PlayerId::from("doncilu01")],
            MatchOutcome::Exact("doncilu01".into())
        );
    }

    #[test]
    fn test_override_resolves_ambiguity() {
        let previous = vec![
            ranked("willimi01", "Michael Williams", 80),
            ranked("willimi02", "Michael Williams", 210),
        ];
        let current = vec![ranked("willimi03", "Michael Williams", 95)];

        let matcher = NameMatcher::new().resolve("willimi03", "willimi02");
        let matches = matcher.match_snapshots(&current, &previous);

        assert_eq!(
            matches[&PlayerId::from("willimi03")],
            MatchOutcome::Exact("willimi02".into())
        );
    }

    #[test]
    fn test_override_to_unknown_player_falls_back_to_names() {
        let previous = vec![ranked("jokicni01", "Nikola Jokic", 1)];
        let current = vec![ranked("jokicni02", "Nikola Jokić", 1)];

        let matcher = NameMatcher::new().resolve("jokicni02", "nobody");
        let matches = matcher.match_snapshots(&current, &previous);

        assert_eq!(
            matches[&PlayerId::from("jokicni02")],
            MatchOutcome::Exact("jokicni01".into())
        );
    }

    #[test]
    fn test_collisions_listing() {
        let previous = vec![
            ranked("a1", "Same Name", 1),
            ranked("a2", "same name", 2),
            ranked("b", "Other", 3),
        ];
        let index = CanonicalIndex::build(&previous);
        let collisions: Vec<_> = index.collisions().collect();

        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].0.as_str(), "same name");
    }

    #[test]
    fn test_empty_key_never_matches() {
        let previous = vec![ranked("x", "???", 5)];
        let current = vec![ranked("y", "!!", 6)];

        let matches = NameMatcher::new().match_snapshots(&current, &previous);
        assert_eq!(matches[&PlayerId::from("y")], MatchOutcome::NoMatch);
    }

    #[test]
    fn test_empty_previous_snapshot() {
        let current = vec![ranked("a", "A", 1)];
        let matches = NameMatcher::new().match_snapshots(&current, &[]);
        assert_eq!(matches[&PlayerId::from("a")], MatchOutcome::NoMatch);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&MatchOutcome::NoMatch).unwrap();
        assert_eq!(json, r#"{"outcome":"no_match"}"#);

        let json = serde_json::to_string(&MatchOutcome::Exact("x".into())).unwrap();
        assert_eq!(json, r#"{"outcome":"exact","players":"x"}"#);
    }
}
