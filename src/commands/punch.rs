//! Public entry points for the punch lifecycle: submission and the edits a
//! participant may still make while a punch is Pending. Each wraps a
//! single `BEGIN IMMEDIATE` transaction around the Admission Service so a
//! caller never has to manage transaction boundaries itself.

use sqlx::{Pool, Sqlite};

use crate::clock::{Calendar, Clock};
use crate::config::DeploymentConfig;
use crate::error::ApiError;
use crate::models::punch::Punch;
use crate::{admission, db};

pub async fn submit_punch(
    pool: &Pool<Sqlite>,
    config: &DeploymentConfig,
    calendar: &Calendar,
    clock: &dyn Clock,
    user_id: i64,
    column_id: i64,
    content: &str,
    images: &[String],
) -> Result<Punch, ApiError> {
    log::debug!("Submitting punch: user={} column={}", user_id, column_id);
    let mut tx = pool.begin().await.map_err(|e| ApiError::from_sqlx(e, "Failed to start transaction"))?;
    let punch = admission::submit_punch(
        &mut tx,
        config,
        calendar,
        clock.now(),
        user_id,
        column_id,
        content,
        images,
    )
    .await
    .inspect_err(|e| log::warn!("Punch submission refused: user={} column={}: {}", user_id, column_id, e.message))?;
    tx.commit().await.map_err(|e| ApiError::from_sqlx(e, "Failed to commit transaction"))?;
    log::info!("Punch submitted: id={} user={} column={}", punch.id, user_id, column_id);
    Ok(punch)
}

pub async fn update_punch(
    pool: &Pool<Sqlite>,
    config: &DeploymentConfig,
    calendar: &Calendar,
    clock: &dyn Clock,
    punch_id: i64,
    content: &str,
    images: &[String],
) -> Result<Punch, ApiError> {
    let mut tx = pool.begin().await.map_err(|e| ApiError::from_sqlx(e, "Failed to start transaction"))?;
    let punch = admission::update_punch(&mut tx, config, calendar, clock.now(), punch_id, content, images)
        .await
        .inspect_err(|e| log::warn!("Punch update refused: id={}: {}", punch_id, e.message))?;
    tx.commit().await.map_err(|e| ApiError::from_sqlx(e, "Failed to commit transaction"))?;
    log::info!("Punch updated: id={}", punch_id);
    Ok(punch)
}

pub async fn delete_punch(pool: &Pool<Sqlite>, punch_id: i64) -> Result<(), ApiError> {
    let mut tx = pool.begin().await.map_err(|e| ApiError::from_sqlx(e, "Failed to start transaction"))?;
    admission::delete_punch(&mut tx, punch_id)
        .await
        .inspect_err(|e| log::warn!("Punch deletion refused: id={}: {}", punch_id, e.message))?;
    tx.commit().await.map_err(|e| ApiError::from_sqlx(e, "Failed to commit transaction"))?;
    log::info!("Punch deleted: id={}", punch_id);
    Ok(())
}

/// Re-establishes the schema on `pool`, for host processes that haven't
/// already run migrations at startup.
pub async fn ensure_schema(pool: &Pool<Sqlite>) -> Result<(), ApiError> {
    db::migrations::run_migrations(pool).await?;
    Ok(())
}
