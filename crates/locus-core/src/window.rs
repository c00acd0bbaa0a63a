//! Forward-looking date windows.
//!
//! Providers that query future availability (e.g. accommodation) derive the
//! window from the current instant with a fixed cutoff, so every call made
//! within the same cutoff interval asks for the same dates.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Default number of nights in a stay.
pub const DEFAULT_NIGHTS: u32 = 5;

/// A check-in / check-out date pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckInWindow {
    /// First night of the stay.
    pub check_in: NaiveDate,
    /// Departure date.
    pub check_out: NaiveDate,
}

/// Rule that maps "now" to a [`CheckInWindow`].
///
/// Before the cutoff (local to `offset`) the stay starts today, otherwise
/// tomorrow. The default is a noon cutoff in UTC and a five night stay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckInPolicy {
    /// Local time of day after which check-in moves to the next day.
    pub cutoff: NaiveTime,
    /// Offset in which the cutoff is evaluated.
    pub offset: FixedOffset,
    /// Length of the stay.
    pub nights: u32,
}

impl Default for CheckInPolicy {
    fn default() -> Self {
        Self {
            cutoff: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default(),
            offset: Utc.fix(),
            nights: DEFAULT_NIGHTS,
        }
    }
}

impl CheckInPolicy {
    /// Sets the stay length.
    #[must_use]
    pub const fn with_nights(mut self, nights: u32) -> Self {
        self.nights = nights;
        self
    }

    /// Sets the offset the cutoff is evaluated in.
    #[must_use]
    pub const fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Computes the window for the given instant.
    #[must_use]
    pub fn window_at(&self, now: DateTime<Utc>) -> CheckInWindow {
        let local = now.with_timezone(&self.offset);
        let today = local.date_naive();
        let check_in = if local.time() < self.cutoff {
            today
        } else {
            today.succ_opt().unwrap_or(today)
        };
        let check_out = check_in
            .checked_add_days(Days::new(u64::from(self.nights)))
            .unwrap_or(check_in);
        CheckInWindow {
            check_in,
            check_out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 28, h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_same_window_before_cutoff() {
        let policy = CheckInPolicy::default();
        let first = policy.window_at(at(0, 5));
        let second = policy.window_at(at(11, 59));
        assert_eq!(first, second);
        assert_eq!(first.check_in, date(2024, 2, 28));
        assert_eq!(first.check_out, date(2024, 3, 4));
    }

    #[test]
    fn test_next_day_from_cutoff() {
        let policy = CheckInPolicy::default();
        let window = policy.window_at(at(12, 0));
        assert_eq!(window.check_in, date(2024, 2, 29));
        assert_eq!(window.check_out, date(2024, 3, 5));
        assert_eq!(policy.window_at(at(23, 59)), window);
    }

    #[test]
    fn test_cutoff_uses_policy_offset() {
        // 11:30 UTC is 13:30 at UTC+2, past the local cutoff.
        let east = FixedOffset::east_opt(2 * 3600).unwrap();
        let policy = CheckInPolicy::default().with_offset(east).with_nights(2);
        let window = policy.window_at(at(11, 30));
        assert_eq!(window.check_in, date(2024, 2, 29));
        assert_eq!(window.check_out, date(2024, 3, 2));
    }
}
