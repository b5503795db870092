//! Pure-read entry points for the external collaborators listed in
//! `spec.md` §6: aggregate score, streak, a column's punch queue, and a
//! column's today-so-far punch count. None of these touch score or streak
//! state; they're plain `SELECT`s over the pool, no transaction needed.

use sqlx::{Pool, Sqlite};

use crate::clock::Calendar;
use crate::error::ApiError;
use crate::models::aggregate_score::AggregateScore;
use crate::models::punch::{Punch, PunchStatus};
use crate::models::streak::Streak;
use crate::store::{aggregate, punch as punch_store, streak as streak_store};
use chrono::{DateTime, Utc};

/// The aggregate score for (`user_id`, `activity_id`), or a zeroed row if
/// the pair has never had a ledger entry — callers shouldn't have to
/// special-case "never scored" vs. "scored zero".
pub async fn aggregate_score(
    pool: &Pool<Sqlite>,
    user_id: i64,
    activity_id: i64,
) -> Result<AggregateScore, ApiError> {
    Ok(aggregate::get(pool, user_id, activity_id)
        .await?
        .unwrap_or(AggregateScore { user_id, activity_id, score: 0 }))
}

/// The streak counters for (`user_id`, `activity_id`), or a zeroed row if
/// the pair has never had an approved punch.
pub async fn streak(
    pool: &Pool<Sqlite>,
    user_id: i64,
    activity_id: i64,
) -> Result<Streak, ApiError> {
    Ok(streak_store::get(pool, user_id, activity_id)
        .await?
        .unwrap_or_else(|| Streak::new(user_id, activity_id)))
}

/// Active punches on `column_id` with `status`, newest first.
pub async fn punches_by_column(
    pool: &Pool<Sqlite>,
    column_id: i64,
    status: PunchStatus,
) -> Result<Vec<Punch>, ApiError> {
    punch_store::list_by_column_and_status(pool, column_id, status).await
}

/// How many punches `user_id` has already submitted on `column_id` today,
/// in the deployment's civil timezone — the same count Admission checks
/// against `Column.DailyPunchLimit`, exposed read-only for callers that
/// want to show "N of M left today" without attempting a submission.
pub async fn todays_punch_count(
    pool: &Pool<Sqlite>,
    calendar: &Calendar,
    now: DateTime<Utc>,
    user_id: i64,
    column_id: i64,
) -> Result<i64, ApiError> {
    let day_start = calendar.day_start(now).timestamp();
    let day_end = day_start + 86_400;
    punch_store::count_todays_punches(pool, user_id, column_id, day_start, day_end).await
}
