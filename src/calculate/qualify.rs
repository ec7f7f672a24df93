//! Playing-time qualification.

use crate::models::MetricRecord;

/// Minutes a player needs to be eligible for headline rankings.
pub const DEFAULT_MIN_MINUTES: u32 = 1000;

/// Whether a player has played at least `min_minutes`.
/// Unknown minutes count as zero.
pub fn qualify(record: &MetricRecord, min_minutes: u32) -> bool {
    record.minutes_played.unwrap_or(0) >= min_minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        let exact = MetricRecord::new("a", "A").with_minutes(1000);
        let short = MetricRecord::new("b", "B").with_minutes(999);

        assert!(qualify(&exact, DEFAULT_MIN_MINUTES));
        assert!(!qualify(&short, DEFAULT_MIN_MINUTES));
    }

    #[test]
    fn test_unknown_minutes_never_qualify() {
        let unknown = MetricRecord::new("a", "A");
        assert!(!qualify(&unknown, DEFAULT_MIN_MINUTES));
        assert!(!qualify(&unknown, 1));
    }

    #[test]
    fn test_zero_threshold_admits_everyone() {
        let unknown = MetricRecord::new("a", "A");
        assert!(qualify(&unknown, 0));
    }

    #[test]
    fn test_custom_threshold() {
        let record = MetricRecord::new("a", "A").with_minutes(500);
        assert!(qualify(&record, 500));
        assert!(!qualify(&record, 501));
    }
}
