//! Configuration Reader: read-only snapshots of Activity/Project/Column
//! policy. CRUD of these entities lives in an external surface — this
//! module only ever issues `SELECT`s.

use sqlx::{Executor, Sqlite};

use crate::error::ApiError;
use crate::models::{activity::Activity, column::Column, project::Project};

pub async fn get_activity<'c, E>(exec: E, activity_id: i64) -> Result<Activity, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as::<_, Activity>(
        "SELECT id, daily_point_limit, completion_bonus FROM activity \
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(activity_id)
    .fetch_one(exec)
    .await
    .map_err(|e| ApiError::from_sqlx(e, "Activity not found"))
}

pub async fn get_project<'c, E>(exec: E, project_id: i64) -> Result<Project, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as::<_, Project>(
        "SELECT id, activity_id, completion_bonus, exempt_from_limit FROM project \
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(project_id)
    .fetch_one(exec)
    .await
    .map_err(|e| ApiError::from_sqlx(e, "Project not found"))
}

pub async fn get_column<'c, E>(exec: E, column_id: i64) -> Result<Column, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as::<_, Column>(
        "SELECT id, project_id, start_date, end_date, start_time, end_time, \
                daily_punch_limit, point_earned, optional \
         FROM habit_column WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(column_id)
    .fetch_one(exec)
    .await
    .map_err(|e| ApiError::from_sqlx(e, "Column not found"))
}

/// Ids of the non-optional, non-deleted columns of `project_id` — the
/// completion predicate's `req` set in `spec.md` §4.5 Step 2.
pub async fn required_columns_for_project<'c, E>(
    exec: E,
    project_id: i64,
) -> Result<Vec<i64>, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM habit_column WHERE project_id = ? AND optional = 0 AND deleted_at IS NULL",
    )
    .bind(project_id)
    .fetch_all(exec)
    .await?;
    Ok(ids)
}

/// Ids of the non-optional, non-deleted columns across every non-deleted
/// project of `activity_id` — the `req` set for the activity-scoped
/// completion predicate in `spec.md` §4.5 Step 3.
pub async fn required_columns_for_activity<'c, E>(
    exec: E,
    activity_id: i64,
) -> Result<Vec<i64>, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT hc.id FROM habit_column hc \
         JOIN project p ON p.id = hc.project_id \
         WHERE p.activity_id = ? AND hc.optional = 0 \
           AND hc.deleted_at IS NULL AND p.deleted_at IS NULL",
    )
    .bind(activity_id)
    .fetch_all(exec)
    .await?;
    Ok(ids)
}
