//! Admission Service: validates and records punch submissions. Everything
//! here runs inside the caller's transaction — admission makes no award or
//! streak decisions, it only decides whether a punch is allowed to exist.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};

use crate::clock::Calendar;
use crate::config::DeploymentConfig;
use crate::error::ApiError;
use crate::models::punch::Punch;
use crate::store::{config_reader, punch as punch_store};

fn day_bounds(calendar: &Calendar, instant: DateTime<Utc>) -> (i64, i64) {
    let start = calendar.day_start(instant).timestamp();
    (start, start + 86_400)
}

fn validate_content(config: &DeploymentConfig, content: &str) -> Result<(), ApiError> {
    if content.trim().is_empty() {
        return Err(ApiError::validation("Punch content must not be empty"));
    }
    if content.chars().count() > config.max_content_length {
        return Err(ApiError::validation(format!(
            "Punch content exceeds the {}-character limit",
            config.max_content_length
        )));
    }
    Ok(())
}

fn validate_images(config: &DeploymentConfig, images: &[String]) -> Result<(), ApiError> {
    if images.len() > config.max_images {
        return Err(ApiError::validation(format!(
            "A punch may carry at most {} images",
            config.max_images
        )));
    }
    Ok(())
}

/// Admits a new punch on `column_id`, or rejects it with `WindowViolation`
/// (outside the column's date/time window, or the column's daily punch
/// count cap is already reached — `spec.md` §7 folds both under the same
/// error kind).
pub async fn submit_punch(
    tx: &mut Transaction<'_, Sqlite>,
    config: &DeploymentConfig,
    calendar: &Calendar,
    now: DateTime<Utc>,
    user_id: i64,
    column_id: i64,
    content: &str,
    images: &[String],
) -> Result<Punch, ApiError> {
    validate_content(config, content)?;
    validate_images(config, images)?;

    let column = config_reader::get_column(&mut **tx, column_id).await?;
    // Existence of the parent project and activity is part of admission: a
    // column whose project or activity has been removed out from under it
    // should not admit punches (spec.md §4.2).
    let project = config_reader::get_project(&mut **tx, column.project_id).await?;
    config_reader::get_activity(&mut **tx, project.activity_id).await?;

    if !column.admits(now, calendar) {
        return Err(ApiError::window_violation(
            "Punch falls outside this column's admission window",
        ));
    }

    if column.has_daily_punch_limit() {
        let (day_start, day_end) = day_bounds(calendar, now);
        let count =
            punch_store::count_todays_punches(&mut **tx, user_id, column_id, day_start, day_end)
                .await?;
        if count >= column.daily_punch_limit {
            // spec.md §7 folds "per-day count exceeded" into the
            // WindowViolation kind alongside date/time window failures.
            return Err(ApiError::window_violation(
                "Daily punch count limit reached for this column",
            ));
        }
    }

    let punch = punch_store::insert_punch(tx, column_id, user_id, content, now.timestamp()).await?;
    if !images.is_empty() {
        punch_store::insert_images(tx, punch.id, images).await?;
    }
    Ok(punch)
}

/// Edits a still-Pending punch's content and images, resetting `created_at`
/// to `now`. Re-runs the window and daily-count admission predicates as if
/// this were a brand new punch (`spec.md` §4.3): an edit that pushes a punch
/// outside its column's window, or into a day that's already at its daily
/// cap, is refused exactly like a fresh `submitPunch` would be.
pub async fn update_punch(
    tx: &mut Transaction<'_, Sqlite>,
    config: &DeploymentConfig,
    calendar: &Calendar,
    now: DateTime<Utc>,
    punch_id: i64,
    content: &str,
    images: &[String],
) -> Result<Punch, ApiError> {
    validate_content(config, content)?;
    validate_images(config, images)?;

    let existing = punch_store::get_active_punch(&mut **tx, punch_id).await?;
    if existing.status != crate::models::punch::PunchStatus::Pending {
        return Err(ApiError::conflict_state(
            "Only a Pending punch can be edited",
        ));
    }

    let column = config_reader::get_column(&mut **tx, existing.column_id).await?;
    let project = config_reader::get_project(&mut **tx, column.project_id).await?;
    config_reader::get_activity(&mut **tx, project.activity_id).await?;

    if !column.admits(now, calendar) {
        return Err(ApiError::window_violation(
            "Punch falls outside this column's admission window",
        ));
    }

    if column.has_daily_punch_limit() {
        let (day_start, day_end) = day_bounds(calendar, now);
        let count = punch_store::count_todays_punches_excluding(
            &mut **tx,
            existing.user_id,
            existing.column_id,
            day_start,
            day_end,
            punch_id,
        )
        .await?;
        if count >= column.daily_punch_limit {
            return Err(ApiError::window_violation(
                "Daily punch count limit reached for this column",
            ));
        }
    }

    let updated = punch_store::update_punch(tx, punch_id, content, now.timestamp()).await?;
    punch_store::replace_images(tx, punch_id, images).await?;
    Ok(updated)
}

/// Withdraws a Pending or Rejected punch (`spec.md` §4.3). Approved punches
/// must go through review instead, so their score side effects are always
/// unwound through the Revocation Pipeline, never silently dropped by a
/// delete.
pub async fn delete_punch(tx: &mut Transaction<'_, Sqlite>, punch_id: i64) -> Result<(), ApiError> {
    let existing = punch_store::get_active_punch(&mut **tx, punch_id).await?;
    if existing.status == crate::models::punch::PunchStatus::Approved {
        return Err(ApiError::conflict_state(
            "An Approved punch must be reviewed, not deleted",
        ));
    }
    punch_store::soft_delete_punch(tx, punch_id).await
}
