//! Score Ledger: append-only (soft-deletable) record of awarded points.

use sqlx::{Executor, Sqlite, Transaction};

use crate::error::ApiError;
use crate::models::score_entry::ScoreEntry;

pub async fn insert_entry(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    column_id: i64,
    punch_id: i64,
    count: i64,
    cause: &str,
    marked_by: &str,
    punch_date: i64,
    recorded_at: i64,
) -> Result<ScoreEntry, ApiError> {
    sqlx::query_as::<_, ScoreEntry>(
        "INSERT INTO score (user_id, column_id, punch_id, count, cause, marked_by, punch_date, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING id, user_id, column_id, punch_id, count, cause, marked_by, punch_date",
    )
    .bind(user_id)
    .bind(column_id)
    .bind(punch_id)
    .bind(count)
    .bind(cause)
    .bind(marked_by)
    .bind(punch_date)
    .bind(recorded_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| ApiError::from_sqlx(e, "Failed to record score entry"))
}

/// Whether any active ScoreEntry exists for `punch_id`, regardless of
/// cause — the automatic-award idempotency predicate in `spec.md` §4.5
/// Step 1.
pub async fn has_active_for_punch<'c, E>(exec: E, punch_id: i64) -> Result<bool, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM score WHERE punch_id = ? AND deleted_at IS NULL",
    )
    .bind(punch_id)
    .fetch_one(exec)
    .await?;
    Ok(count > 0)
}

/// `spent` in the daily cap clamp (`spec.md` §4.5 Step 1): sum of active
/// ScoreEntry.count over entries whose column belongs to `activity_id`,
/// whose project is not exempt, whose column is not optional, and whose
/// `punch_date = day`.
pub async fn spent_toward_daily_cap<'c, E>(
    exec: E,
    user_id: i64,
    activity_id: i64,
    day: i64,
) -> Result<i64, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let spent: Option<i64> = sqlx::query_scalar(
        "SELECT SUM(s.count) FROM score s \
         JOIN habit_column hc ON hc.id = s.column_id \
         JOIN project p ON p.id = hc.project_id \
         WHERE s.user_id = ? AND p.activity_id = ? AND s.punch_date = ? \
           AND s.deleted_at IS NULL \
           AND p.exempt_from_limit = 0 AND hc.optional = 0",
    )
    .bind(user_id)
    .bind(activity_id)
    .bind(day)
    .fetch_one(exec)
    .await?;
    Ok(spent.unwrap_or(0))
}

/// The active bonus entry for (`user_id`, `cause`, `day`), if any — the
/// bonus idempotency key in `spec.md` §4.5 Steps 2-3 and §5.
pub async fn find_active_bonus<'c, E>(
    exec: E,
    user_id: i64,
    cause: &str,
    day: i64,
) -> Result<Option<ScoreEntry>, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, ScoreEntry>(
        "SELECT id, user_id, column_id, punch_id, count, cause, marked_by, punch_date \
         FROM score WHERE user_id = ? AND cause = ? AND punch_date = ? AND deleted_at IS NULL",
    )
    .bind(user_id)
    .bind(cause)
    .bind(day)
    .fetch_optional(exec)
    .await?;
    Ok(row)
}

/// Soft-deletes every active ScoreEntry for `punch_id` and returns them,
/// so the caller can decrement the matching AggregateScore rows
/// (`spec.md` §4.6).
pub async fn soft_delete_by_punch(
    tx: &mut Transaction<'_, Sqlite>,
    punch_id: i64,
) -> Result<Vec<ScoreEntry>, ApiError> {
    let entries = sqlx::query_as::<_, ScoreEntry>(
        "SELECT id, user_id, column_id, punch_id, count, cause, marked_by, punch_date \
         FROM score WHERE punch_id = ? AND deleted_at IS NULL",
    )
    .bind(punch_id)
    .fetch_all(&mut **tx)
    .await?;

    sqlx::query("UPDATE score SET deleted_at = CURRENT_TIMESTAMP WHERE punch_id = ? AND deleted_at IS NULL")
        .bind(punch_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| ApiError::from_sqlx(e, "Failed to revoke score entries"))?;

    Ok(entries)
}

pub async fn soft_delete_entry(tx: &mut Transaction<'_, Sqlite>, score_id: i64) -> Result<(), ApiError> {
    sqlx::query("UPDATE score SET deleted_at = CURRENT_TIMESTAMP WHERE id = ? AND deleted_at IS NULL")
        .bind(score_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| ApiError::from_sqlx(e, "Failed to revoke score entry"))?;
    Ok(())
}
