//! Leaderboard queries: qualification, numeric filters and pagination.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Leaderboard, MetricName, RankedRecord};

/// Comparison operator of a numeric condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Gt,
    Gte,
    Eq,
    Lte,
    Lt,
    Between,
}

impl FromStr for Comparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" | ">" => Ok(Comparator::Gt),
            "gte" | ">=" => Ok(Comparator::Gte),
            "eq" | "=" => Ok(Comparator::Eq),
            "lte" | "<=" => Ok(Comparator::Lte),
            "lt" | "<" => Ok(Comparator::Lt),
            "between" => Ok(Comparator::Between),
            other => Err(format!("unknown comparator '{}'", other)),
        }
    }
}

/// A numeric condition such as `>= 20` or `between 1000 and 2000`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericCondition {
    pub op: Comparator,
    pub value: Option<f64>,
    /// Upper bound for `between`; bounds may come in either order
    #[serde(default)]
    pub value2: Option<f64>,
}

impl NumericCondition {
    pub fn new(op: Comparator, value: f64) -> Self {
        Self {
            op,
            value: Some(value),
            value2: None,
        }
    }

    pub fn between(a: f64, b: f64) -> Self {
        Self {
            op: Comparator::Between,
            value: Some(a),
            value2: Some(b),
        }
    }

    /// Whether `value` satisfies the condition. A missing value never does.
    pub fn evaluate(&self, value: Option<f64>) -> bool {
        let value = match value {
            Some(v) if !v.is_nan() => v,
            _ => return false,
        };

        match self.op {
            Comparator::Gt => self.value.is_some_and(|v| value > v),
            Comparator::Gte => self.value.is_some_and(|v| value >= v),
            Comparator::Eq => self.value.is_some_and(|v| value == v),
            Comparator::Lte => self.value.is_some_and(|v| value <= v),
            Comparator::Lt => self.value.is_some_and(|v| value < v),
            Comparator::Between => match (self.value, self.value2) {
                (Some(a), Some(b)) => value >= a.min(b) && value <= a.max(b),
                // an incomplete range filters nothing
                _ => true,
            },
        }
    }
}

/// Leaderboard column a filter applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Games,
    Minutes,
    Score,
    Rank,
    Metric(MetricName),
}

impl FilterField {
    fn value_of(&self, record: &RankedRecord) -> Option<f64> {
        match self {
            FilterField::Games => record.games_played.map(f64::from),
            FilterField::Minutes => record.minutes_played.map(f64::from),
            FilterField::Score => Some(record.composite_score),
            FilterField::Rank => Some(f64::from(record.composite_rank)),
            FilterField::Metric(name) => record.metric(name),
        }
    }
}

impl FromStr for FilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "gp" | "games" => FilterField::Games,
            "min" | "minutes" => FilterField::Minutes,
            "score" => FilterField::Score,
            "rank" => FilterField::Rank,
            "" => return Err("empty filter field".to_string()),
            metric => FilterField::Metric(MetricName::from(metric)),
        })
    }
}

/// A condition bound to a leaderboard column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: FilterField,
    pub condition: NumericCondition,
}

impl FieldFilter {
    pub fn matches(&self, record: &RankedRecord) -> bool {
        self.condition.evaluate(self.field.value_of(record))
    }
}

/// Parses `field:op:value[:value2]`, e.g. `per:gte:20` or `min:between:1000:2000`.
impl FromStr for FieldFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        if parts.len() < 3 || parts.len() > 4 {
            return Err(format!("invalid filter '{}' (expected field:op:value[:value2])", s));
        }

        let field = parts[0].parse::<FilterField>()?;
        let op = parts[1].parse::<Comparator>()?;
        let parse_num = |raw: &str| {
            raw.parse::<f64>()
                .map_err(|_| format!("invalid number '{}' in filter '{}'", raw, s))
        };
        let value = Some(parse_num(parts[2])?);
        let value2 = parts.get(3).map(|raw| parse_num(*raw)).transpose()?;

        if op == Comparator::Between && value2.is_none() {
            return Err(format!("filter '{}' needs two bounds for between", s));
        }

        Ok(Self {
            field,
            condition: NumericCondition { op, value, value2 },
        })
    }
}

/// Which slice of a leaderboard to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_qualified_only")]
    pub qualified_only: bool,

    #[serde(default)]
    pub filters: Vec<FieldFilter>,

    /// None returns every matching record
    #[serde(default)]
    pub limit: Option<usize>,

    #[serde(default)]
    pub offset: usize,
}

fn default_qualified_only() -> bool {
    true
}

impl Default for LeaderboardQuery {
    fn default() -> Self {
        Self {
            qualified_only: default_qualified_only(),
            filters: Vec::new(),
            limit: None,
            offset: 0,
        }
    }
}

/// One page of leaderboard results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardPage {
    pub records: Vec<RankedRecord>,
    /// Matching records before pagination
    pub total: usize,
    pub limit: Option<usize>,
    pub offset: usize,
    pub has_more: bool,
}

impl LeaderboardQuery {
    pub fn matches(&self, record: &RankedRecord) -> bool {
        (!self.qualified_only || record.qualified) && self.filters.iter().all(|f| f.matches(record))
    }

    /// Apply the query to a leaderboard, keeping rank order.
    pub fn apply(&self, leaderboard: &Leaderboard) -> LeaderboardPage {
        let matching: Vec<&RankedRecord> = leaderboard
            .records
            .iter()
            .filter(|r| self.matches(r))
            .collect();
        let total = matching.len();

        let page: Vec<RankedRecord> = matching
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        let has_more = self.offset.saturating_add(page.len()) < total;

        LeaderboardPage {
            records: page,
            total,
            limit: self.limit,
            offset: self.offset,
            has_more,
        }
    }
}
