//! Rank-change records between two snapshots.

use serde::{Deserialize, Serialize};

use super::PlayerId;

/// Direction of a player's composite-rank change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendDirection {
    /// Better rank than before
    Up,
    /// Worse rank than before
    Down,
    /// Unchanged rank
    Same,
    /// No counterpart in the previous snapshot
    New,
    /// Several previous players share the canonical name; left to the caller
    Unresolved,
}

impl TrendDirection {
    /// Classify a signed rank delta (positive = improvement).
    pub fn from_delta(delta: i64) -> Self {
        match delta.signum() {
            1 => TrendDirection::Up,
            -1 => TrendDirection::Down,
            _ => TrendDirection::Same,
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "UP"),
            TrendDirection::Down => write!(f, "DOWN"),
            TrendDirection::Same => write!(f, "SAME"),
            TrendDirection::New => write!(f, "NEW"),
            TrendDirection::Unresolved => write!(f, "UNRESOLVED"),
        }
    }
}

/// A current player's rank compared with the previous snapshot.
///
/// Computed on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub player: PlayerId,

    pub display_name: String,

    pub current_rank: u32,

    /// Set only for an unambiguous match
    pub previous_rank: Option<u32>,

    /// `previous_rank - current_rank`; absent for NEW and UNRESOLVED, never 0 in their place
    pub rank_delta: Option<i64>,

    pub direction: TrendDirection,

    /// Previous players the name collided with (UNRESOLVED only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<PlayerId>,
}

impl TrendRecord {
    pub fn is_resolved(&self) -> bool {
        self.direction != TrendDirection::Unresolved
    }
}
