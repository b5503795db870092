//! Streak Table: per-(user, activity) current/max/total run-length
//! counters maintained by the Award Pipeline.

use sqlx::{Executor, Sqlite, Transaction};

use crate::error::ApiError;
use crate::models::streak::Streak;

/// Reads the current streak row for (`user_id`, `activity_id`), or `None`
/// if the pair has never had an approved punch. Accepts any `Executor` —
/// a bare pool for out-of-transaction reads, or a transaction when called
/// from inside the Award Pipeline.
pub async fn get<'c, E>(
    exec: E,
    user_id: i64,
    activity_id: i64,
) -> Result<Option<Streak>, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, Streak>(
        "SELECT user_id, activity_id, current, max, total, end_at \
         FROM continuity WHERE user_id = ? AND activity_id = ?",
    )
    .bind(user_id)
    .bind(activity_id)
    .fetch_optional(exec)
    .await?;
    Ok(row)
}

/// Loads the existing row for (`user_id`, `activity_id`) or a fresh
/// zeroed one if none exists yet — callers then call `Streak::advance_to`
/// and `save`.
pub async fn get_or_new(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    activity_id: i64,
) -> Result<Streak, ApiError> {
    match get(&mut **tx, user_id, activity_id).await? {
        Some(s) => Ok(s),
        None => Ok(Streak::new(user_id, activity_id)),
    }
}

/// Upserts `streak`. Uses `ON CONFLICT` rather than an insert-then-update
/// branch, so a first-time row created concurrently by another
/// transaction doesn't need special-casing here beyond SQLite's own
/// writer serialization.
pub async fn save(tx: &mut Transaction<'_, Sqlite>, streak: &Streak) -> Result<(), ApiError> {
    sqlx::query(
        "INSERT INTO continuity (user_id, activity_id, current, max, total, end_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT (user_id, activity_id) DO UPDATE SET \
            current = excluded.current, max = excluded.max, \
            total = excluded.total, end_at = excluded.end_at",
    )
    .bind(streak.user_id)
    .bind(streak.activity_id)
    .bind(streak.current)
    .bind(streak.max)
    .bind(streak.total)
    .bind(streak.end_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| ApiError::from_sqlx(e, "Failed to save streak"))?;
    Ok(())
}
