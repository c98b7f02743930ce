use crate::constants::{POINTS_PER_VIEWER, SECONDS_PER_POINT};

/// Points awarded for a finished stream: one point per full minute on air
/// plus a flat bonus per recorded viewer. Viewer joins are counted, not
/// deduplicated.
pub fn award_points(duration_secs: i64, viewers: i64) -> i64 {
    duration_secs / SECONDS_PER_POINT + viewers * POINTS_PER_VIEWER
}

/// Human-readable reason recorded next to every award in the history table.
pub fn award_reason(duration_secs: i64, viewers: i64) -> String {
    format!("Stream ended: {duration_secs}s, {viewers} viewers")
}

/// What a close operation hands back to the caller once the award has been
/// applied.
#[derive(Debug, Clone, Copy)]
pub struct StreamReceipt {
    pub points_earned: i64,
    pub duration: i64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_minutes_do_not_score() {
        assert_eq!(award_points(59, 0), 0);
        assert_eq!(award_points(60, 0), 1);
        assert_eq!(award_points(119, 0), 1);
    }

    #[test]
    fn test_viewers_score_without_airtime() {
        assert_eq!(award_points(0, 3), 15);
    }

    #[test]
    fn test_two_minutes_two_viewers() {
        // 2 full minutes + 2 viewers * 5
        assert_eq!(award_points(120, 2), 12);
    }

    #[test]
    fn test_longer_session() {
        assert_eq!(award_points(3600, 10), 110);
    }

    #[test]
    fn test_reason_format() {
        assert_eq!(award_reason(120, 2), "Stream ended: 120s, 2 viewers");
    }
}
