//! Punch Store: the persisted log of punches (§3) and their image
//! references, plus the admission-time lookups Admission Service needs.
//!
//! Writes take a `&mut Transaction` explicitly rather than a generic
//! executor: several of them (image replacement, in particular) issue more
//! than one statement that must commit or roll back together, so the
//! transaction boundary is part of the function signature, not an
//! afterthought at the call site.

use sqlx::{Executor, Sqlite, Transaction};

use crate::error::ApiError;
use crate::models::punch::{Punch, PunchStatus};

pub async fn insert_punch(
    tx: &mut Transaction<'_, Sqlite>,
    column_id: i64,
    user_id: i64,
    content: &str,
    created_at: i64,
) -> Result<Punch, ApiError> {
    sqlx::query_as::<_, Punch>(
        "INSERT INTO punch (column_id, user_id, content, status, created_at) \
         VALUES (?, ?, ?, 0, ?) \
         RETURNING id, column_id, user_id, content, status, created_at",
    )
    .bind(column_id)
    .bind(user_id)
    .bind(content)
    .bind(created_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| ApiError::from_sqlx(e, "Failed to create punch"))
}

pub async fn get_active_punch<'c, E>(exec: E, punch_id: i64) -> Result<Punch, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as::<_, Punch>(
        "SELECT id, column_id, user_id, content, status, created_at \
         FROM punch WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(punch_id)
    .fetch_one(exec)
    .await
    .map_err(|e| ApiError::from_sqlx(e, "Punch not found"))
}

/// Updates content and resets `created_at` to `now`. Callers must have
/// already verified the punch is Pending — this issues the write
/// unconditionally, matching the teacher crate's thin-command style.
pub async fn update_punch(
    tx: &mut Transaction<'_, Sqlite>,
    punch_id: i64,
    content: &str,
    now: i64,
) -> Result<Punch, ApiError> {
    sqlx::query_as::<_, Punch>(
        "UPDATE punch SET content = ?, created_at = ? WHERE id = ? \
         RETURNING id, column_id, user_id, content, status, created_at",
    )
    .bind(content)
    .bind(now)
    .bind(punch_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| ApiError::from_sqlx(e, "Failed to update punch"))
}

pub async fn soft_delete_punch(tx: &mut Transaction<'_, Sqlite>, punch_id: i64) -> Result<(), ApiError> {
    sqlx::query("UPDATE punch SET deleted_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(punch_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| ApiError::from_sqlx(e, "Failed to delete punch"))?;
    Ok(())
}

pub async fn set_status(
    tx: &mut Transaction<'_, Sqlite>,
    punch_id: i64,
    status: PunchStatus,
) -> Result<(), ApiError> {
    sqlx::query("UPDATE punch SET status = ? WHERE id = ?")
        .bind(status)
        .bind(punch_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| ApiError::from_sqlx(e, "Failed to update punch status"))?;
    Ok(())
}

/// Count of `user`'s punches on `column_id` whose `created_at` falls in
/// `[day_start, day_end)`, counting active punches plus soft-deleted
/// punches that were Rejected before deletion (`spec.md` §4.2 — this
/// prevents delete-and-retry circumvention of the daily count cap).
pub async fn count_todays_punches<'c, E>(
    exec: E,
    user_id: i64,
    column_id: i64,
    day_start: i64,
    day_end: i64,
) -> Result<i64, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM punch \
         WHERE user_id = ? AND column_id = ? \
           AND created_at >= ? AND created_at < ? \
           AND (deleted_at IS NULL OR status = 2)",
    )
    .bind(user_id)
    .bind(column_id)
    .bind(day_start)
    .bind(day_end)
    .fetch_one(exec)
    .await?;
    Ok(count)
}

/// Same count as `count_todays_punches`, excluding `exclude_punch_id` — the
/// shape `updatePunch` needs to re-run the daily-count predicate against the
/// punch's *new* `created_at` "as if it were a new punch" (`spec.md` §4.3)
/// without the punch counting against its own cap.
pub async fn count_todays_punches_excluding<'c, E>(
    exec: E,
    user_id: i64,
    column_id: i64,
    day_start: i64,
    day_end: i64,
    exclude_punch_id: i64,
) -> Result<i64, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM punch \
         WHERE user_id = ? AND column_id = ? \
           AND created_at >= ? AND created_at < ? \
           AND (deleted_at IS NULL OR status = 2) \
           AND id != ?",
    )
    .bind(user_id)
    .bind(column_id)
    .bind(day_start)
    .bind(day_end)
    .bind(exclude_punch_id)
    .fetch_one(exec)
    .await?;
    Ok(count)
}

/// Active punches on `column_id` with `status`, newest first — the read
/// collaborators use for a column's pending/approved queue (`spec.md`
/// §6's "list of approved/pending punches by column").
pub async fn list_by_column_and_status<'c, E>(
    exec: E,
    column_id: i64,
    status: PunchStatus,
) -> Result<Vec<Punch>, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, Punch>(
        "SELECT id, column_id, user_id, content, status, created_at \
         FROM punch WHERE column_id = ? AND status = ? AND deleted_at IS NULL \
         ORDER BY created_at DESC",
    )
    .bind(column_id)
    .bind(status)
    .fetch_all(exec)
    .await?;
    Ok(rows)
}

/// Whether `user` has an approved, active punch on `column_id` whose
/// `created_at` falls in `[day_start, day_end)` — the per-column leaf of
/// the completion predicate in `spec.md` §4.5 Steps 2-3.
pub async fn has_approved_punch_on_day<'c, E>(
    exec: E,
    user_id: i64,
    column_id: i64,
    day_start: i64,
    day_end: i64,
) -> Result<bool, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM punch \
         WHERE user_id = ? AND column_id = ? AND status = 1 \
           AND created_at >= ? AND created_at < ? AND deleted_at IS NULL",
    )
    .bind(user_id)
    .bind(column_id)
    .bind(day_start)
    .bind(day_end)
    .fetch_one(exec)
    .await?;
    Ok(count > 0)
}

pub async fn insert_images(
    tx: &mut Transaction<'_, Sqlite>,
    punch_id: i64,
    images: &[String],
) -> Result<(), ApiError> {
    for url in images {
        sqlx::query("INSERT INTO punch_img (punch_id, img_url) VALUES (?, ?)")
            .bind(punch_id)
            .bind(url)
            .execute(&mut **tx)
            .await
            .map_err(|e| ApiError::from_sqlx(e, "Failed to attach image"))?;
    }
    Ok(())
}

/// Soft-deletes every active image on `punch_id` and inserts `images` in
/// their place, atomically within `tx` (`spec.md` §4.3).
pub async fn replace_images(
    tx: &mut Transaction<'_, Sqlite>,
    punch_id: i64,
    images: &[String],
) -> Result<(), ApiError> {
    sqlx::query(
        "UPDATE punch_img SET deleted_at = CURRENT_TIMESTAMP \
         WHERE punch_id = ? AND deleted_at IS NULL",
    )
    .bind(punch_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| ApiError::from_sqlx(e, "Failed to clear old images"))?;
    insert_images(tx, punch_id, images).await
}
