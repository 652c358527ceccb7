// --- File: crates/slotwise_common/src/availability.rs ---
//! The single definition of "available" used by the calendar adapter and the
//! chat agent: a requested window is free iff no busy window overlaps it.
//! Windows are half-open, so back-to-back bookings do not collide.

use chrono::{DateTime, Utc};

/// `true` when `[start_a, end_a)` and `[start_b, end_b)` share any instant.
pub fn windows_overlap(
    start_a: DateTime<Utc>,
    end_a: DateTime<Utc>,
    start_b: DateTime<Utc>,
    end_b: DateTime<Utc>,
) -> bool {
    start_a < end_b && end_a > start_b
}

/// `true` when no window in `busy` overlaps `[start, end)`.
pub fn is_window_free<I>(start: DateTime<Utc>, end: DateTime<Utc>, busy: I) -> bool
where
    I: IntoIterator<Item = (DateTime<Utc>, DateTime<Utc>)>,
{
    busy.into_iter()
        .all(|(busy_start, busy_end)| !windows_overlap(start, end, busy_start, busy_end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    #[test]
    fn exact_match_overlaps() {
        assert!(windows_overlap(at(10, 0), at(11, 0), at(10, 0), at(11, 0)));
    }

    #[test]
    fn partial_overlap_is_busy() {
        assert!(!is_window_free(at(10, 30), at(11, 30), [(at(10, 0), at(11, 0))]));
    }

    #[test]
    fn adjacent_windows_are_free() {
        assert!(is_window_free(at(11, 0), at(12, 0), [(at(10, 0), at(11, 0))]));
        assert!(is_window_free(at(9, 0), at(10, 0), [(at(10, 0), at(11, 0))]));
    }

    #[test]
    fn containment_in_either_direction_is_busy() {
        assert!(windows_overlap(at(9, 0), at(12, 0), at(10, 0), at(11, 0)));
        assert!(windows_overlap(at(10, 15), at(10, 45), at(10, 0), at(11, 0)));
    }

    #[test]
    fn empty_busy_list_is_free() {
        let start = at(8, 0);
        assert!(is_window_free(start, start + Duration::minutes(30), Vec::new()));
    }
}
