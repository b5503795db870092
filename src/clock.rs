//! Clock & Calendar: wall time and civil-day boundaries for a fixed
//! deployment timezone. All windowing in `admission` and `award` goes
//! through here rather than touching `Utc::now()` or raw epoch math
//! directly — see the day-boundary note in SPEC_FULL.md §B.

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Timelike, Utc};

const SECONDS_PER_DAY: i64 = 86_400;

/// Supplies "now" for the admission/review pipelines. A trait so tests can
/// pin the instant instead of racing the wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock, backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock fixed to a single instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The deployment's civil timezone, e.g. UTC+08:00 in the reference
/// deployment. Day boundaries and daily time windows are computed in this
/// offset, never in UTC directly.
#[derive(Debug, Clone, Copy)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Calendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// The reference deployment's timezone, UTC+08:00.
    pub fn reference_deployment() -> Self {
        Self::new(FixedOffset::east_opt(8 * 3600).expect("valid fixed offset"))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// `dayStart(instant) -> instant at 00:00 local`.
    pub fn day_start(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let local = instant.with_timezone(&self.offset);
        let midnight = local
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid naive time");
        self.offset
            .from_local_datetime(&midnight)
            .single()
            .expect("fixed offsets have no DST ambiguity")
            .with_timezone(&Utc)
    }

    /// `floor(dayStart(instant).epochSeconds / 86400)`. Never compute this
    /// as `instant.epochSeconds / 86400` directly — only from `day_start`,
    /// which has already normalized to the civil timezone.
    pub fn day_index(&self, instant: DateTime<Utc>) -> i64 {
        self.day_start(instant).timestamp().div_euclid(SECONDS_PER_DAY)
    }

    /// The local time-of-day component of `instant`, second resolution.
    pub fn time_of_day(&self, instant: DateTime<Utc>) -> NaiveTime {
        let local = instant.with_timezone(&self.offset);
        NaiveTime::from_hms_opt(local.hour(), local.minute(), local.second())
            .expect("components of a valid local time are always valid")
    }

    /// Whether `time` falls in the daily window `[start, end]`, wrap-aware:
    /// if `start <= end` the window is the ordinary same-day range; if
    /// `start > end` it wraps across midnight and the window is
    /// `[start, 24:00) ∪ [00:00, end]`.
    pub fn in_daily_window(time: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
        if start <= end {
            time >= start && time <= end
        } else {
            time >= start || time <= end
        }
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::reference_deployment()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, mi, s).unwrap()
    }

    #[test]
    fn day_start_floors_to_local_midnight() {
        let cal = Calendar::reference_deployment();
        // 2026-01-02 01:30 local (UTC+8) is 2026-01-01 17:30 UTC.
        let instant = utc(2026, 1, 1, 17, 30, 0);
        let start = cal.day_start(instant);
        assert_eq!(start, utc(2026, 1, 1, 16, 0, 0));
    }

    #[test]
    fn day_index_is_monotone_and_stable_across_the_day() {
        let cal = Calendar::reference_deployment();
        let morning = utc(2026, 1, 1, 17, 30, 0); // 2026-01-02 01:30 local
        let evening = utc(2026, 1, 1, 23, 59, 0); // 2026-01-02 07:59 local
        assert_eq!(cal.day_index(morning), cal.day_index(evening));
        let next_day = utc(2026, 1, 2, 17, 0, 0);
        assert_eq!(cal.day_index(next_day), cal.day_index(morning) + 1);
    }

    #[test]
    fn in_daily_window_same_day() {
        let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        assert!(Calendar::in_daily_window(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            start,
            end
        ));
        assert!(Calendar::in_daily_window(
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            start,
            end
        ));
        assert!(!Calendar::in_daily_window(
            NaiveTime::from_hms_opt(18, 0, 1).unwrap(),
            start,
            end
        ));
        assert!(!Calendar::in_daily_window(
            NaiveTime::from_hms_opt(8, 59, 59).unwrap(),
            start,
            end
        ));
    }

    #[test]
    fn in_daily_window_wraps_across_midnight() {
        let start = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
        assert!(Calendar::in_daily_window(
            NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            start,
            end
        ));
        assert!(Calendar::in_daily_window(
            NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
            start,
            end
        ));
        assert!(!Calendar::in_daily_window(
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            start,
            end
        ));
    }
}
