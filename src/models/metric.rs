//! Raw per-player metric inputs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::PlayerId;

/// Name of one advanced metric (e.g. "per", "ws48").
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricName(String);

impl MetricName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetricName({})", self.0)
    }
}

impl From<&str> for MetricName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for MetricName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Metrics that make up the composite score unless configured otherwise.
pub const DEFAULT_METRICS: [&str; 5] = ["per", "ws", "ws48", "bpm", "vorp"];

/// The default metric set, in display order.
pub fn default_metrics() -> Vec<MetricName> {
    DEFAULT_METRICS.iter().map(|m| MetricName::from(*m)).collect()
}

/// One player's raw inputs for one snapshot.
///
/// Produced by ingestion and never mutated afterwards. A metric that is
/// missing from `metrics`, or present as `null`, is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Provisional identity key
    pub player_id: PlayerId,

    /// Name as shown by the data source
    pub display_name: String,

    /// Team abbreviation, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    /// Games played
    #[serde(default)]
    pub games_played: Option<u32>,

    /// Total minutes played
    #[serde(default)]
    pub minutes_played: Option<u32>,

    /// Raw metric values
    #[serde(default)]
    pub metrics: BTreeMap<MetricName, Option<f64>>,
}

impl MetricRecord {
    /// Create a record with no metrics and no playing time.
    pub fn new(player_id: impl Into<PlayerId>, display_name: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            display_name: display_name.into(),
            team: None,
            games_played: None,
            minutes_played: None,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn with_games(mut self, games: u32) -> Self {
        self.games_played = Some(games);
        self
    }

    pub fn with_minutes(mut self, minutes: u32) -> Self {
        self.minutes_played = Some(minutes);
        self
    }

    /// Set a metric value; `None` records it as explicitly absent.
    pub fn with_metric(mut self, name: impl Into<MetricName>, value: Option<f64>) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Value of a metric, or `None` when absent.
    pub fn metric(&self, name: &MetricName) -> Option<f64> {
        self.metrics.get(name).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_metrics_order() {
        let metrics = default_metrics();
        assert_eq!(metrics.len(), 5);
        assert_eq!(metrics[0].as_str(), "per");
        assert_eq!(metrics[4].as_str(), "vorp");
    }

    #[test]
    fn test_metric_lookup_absent() {
        let record = MetricRecord::new("a", "Player A")
            .with_metric("per", Some(21.5))
            .with_metric("ws", None);

        assert_eq!(record.metric(&"per".into()), Some(21.5));
        assert_eq!(record.metric(&"ws".into()), None);
        assert_eq!(record.metric(&"bpm".into()), None);
    }

    #[test]
    fn test_record_deserialization_defaults() {
        let json = r#"{"player_id": "jokicni01", "display_name": "Nikola Jokić"}"#;
        let record: MetricRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.player_id.as_str(), "jokicni01");
        assert!(record.minutes_played.is_none());
        assert!(record.metrics.is_empty());
    }

    #[test]
    fn test_record_rejects_non_numeric_metric() {
        let json = r#"{"player_id": "a", "display_name": "A", "metrics": {"per": "high"}}"#;
        let parsed: Result<MetricRecord, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_record_null_metric_is_absent() {
        let json = r#"{"player_id": "a", "display_name": "A", "metrics": {"per": null}}"#;
        let record: MetricRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.metric(&"per".into()), None);
        assert!(record.metrics.contains_key(&MetricName::from("per")));
    }
}
