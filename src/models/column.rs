use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::clock::Calendar;

/// Immutable snapshot of a Column's admission window and point policy.
/// Read-only to the core — CRUD lives in the external configuration
/// surface.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub id: i64,
    pub project_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    /// 0 means unlimited.
    pub daily_punch_limit: i64,
    pub point_earned: i64,
    pub optional: bool,
}

impl Column {
    pub fn has_daily_punch_limit(&self) -> bool {
        self.daily_punch_limit > 0
    }

    /// Whether `instant` falls inside this column's admission window: the
    /// civil date must lie in `[start_date, end_date]`, and if a daily time
    /// window is configured, the local time-of-day must additionally lie in
    /// that window (wrap-aware per `Calendar::in_daily_window`).
    pub fn admits(&self, instant: DateTime<Utc>, calendar: &Calendar) -> bool {
        let local_date = instant.with_timezone(&calendar.offset()).date_naive();
        if local_date < self.start_date || local_date > self.end_date {
            return false;
        }

        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => {
                Calendar::in_daily_window(calendar.time_of_day(instant), start, end)
            }
            _ => true,
        }
    }
}
