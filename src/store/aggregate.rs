//! Aggregate Score Table: the per-(user, activity) running total derived
//! from the Score Ledger.

use sqlx::{Executor, Sqlite, Transaction};

use crate::error::ApiError;
use crate::models::aggregate_score::AggregateScore;

/// Adds `delta` (may be negative, for revocations) to the (`user_id`,
/// `activity_id`) total, creating the row at `delta` if it doesn't exist
/// yet. Relies on SQLite's `ON CONFLICT` upsert rather than a separate
/// select-then-branch, so it's race-free under the `BEGIN IMMEDIATE`
/// transaction the caller holds.
pub async fn adjust(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    activity_id: i64,
    delta: i64,
) -> Result<AggregateScore, ApiError> {
    sqlx::query_as::<_, AggregateScore>(
        "INSERT INTO total_score (user_id, activity_id, score) VALUES (?, ?, ?) \
         ON CONFLICT (user_id, activity_id) DO UPDATE SET score = score + excluded.score \
         RETURNING user_id, activity_id, score",
    )
    .bind(user_id)
    .bind(activity_id)
    .bind(delta)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| ApiError::from_sqlx(e, "Failed to update aggregate score"))
}

/// Reads the current (`user_id`, `activity_id`) total, or `None` if no
/// ledger entry has ever been posted for that pair. Accepts any `Executor`
/// — a bare pool for out-of-transaction reads, or a transaction when
/// called from inside the Award/Revocation pipelines.
pub async fn get<'c, E>(
    exec: E,
    user_id: i64,
    activity_id: i64,
) -> Result<Option<AggregateScore>, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, AggregateScore>(
        "SELECT user_id, activity_id, score FROM total_score WHERE user_id = ? AND activity_id = ?",
    )
    .bind(user_id)
    .bind(activity_id)
    .fetch_optional(exec)
    .await?;
    Ok(row)
}
