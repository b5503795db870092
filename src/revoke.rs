//! Revocation Pipeline: unwinds a punch's score side effects when it moves
//! out of Approved. Streaks are deliberately left untouched — see
//! DESIGN.md's Open Question notes.

use sqlx::{Sqlite, Transaction};

use crate::clock::Calendar;
use crate::error::ApiError;
use crate::models::activity::Activity;
use crate::models::project::Project;
use crate::models::punch::Punch;
use crate::models::score_entry::{activity_bonus_cause, project_bonus_cause};
use crate::store::{config_reader, punch as punch_store, score};

#[derive(Debug, Clone, Default)]
pub struct RevokeOutcome {
    pub reverted_total: i64,
    pub project_bonus_reverted: bool,
    pub activity_bonus_reverted: bool,
}

async fn project_complete_on_day(
    tx: &mut Transaction<'_, Sqlite>,
    project_id: i64,
    user_id: i64,
    day_start: i64,
    day_end: i64,
) -> Result<bool, ApiError> {
    let required = config_reader::required_columns_for_project(&mut **tx, project_id).await?;
    if required.is_empty() {
        return Ok(false);
    }
    for column_id in required {
        if !punch_store::has_approved_punch_on_day(&mut **tx, user_id, column_id, day_start, day_end)
            .await?
        {
            return Ok(false);
        }
    }
    Ok(true)
}

async fn activity_complete_on_day(
    tx: &mut Transaction<'_, Sqlite>,
    activity_id: i64,
    user_id: i64,
    day_start: i64,
    day_end: i64,
) -> Result<bool, ApiError> {
    let required = config_reader::required_columns_for_activity(&mut **tx, activity_id).await?;
    if required.is_empty() {
        return Ok(false);
    }
    for column_id in required {
        if !punch_store::has_approved_punch_on_day(&mut **tx, user_id, column_id, day_start, day_end)
            .await?
        {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Reverses every active score entry attributed to `punch`, then checks
/// whether this punch's un-approval broke a completion bonus it was not
/// itself tied to (the bonus was recorded against whichever punch happened
/// to complete the set) — if so, revokes that bonus too.
///
/// `soft_delete_by_punch` already removes every entry keyed on this punch's
/// id, which includes a project/activity completion bonus when *this*
/// punch was the one that completed the scope (the common case: the bonus
/// is recorded with `punch_id` set to whichever punch triggered it). A
/// subsequent `find_active_bonus` query would not see that row anymore —
/// it is already soft-deleted — so the bonus-revoked flags are read off of
/// `entries` first; only a bonus recorded under a *different* punch id
/// falls through to the conditional re-check below.
pub async fn revoke_for_punch(
    tx: &mut Transaction<'_, Sqlite>,
    calendar: &Calendar,
    punch: &Punch,
    project: &Project,
    activity: &Activity,
) -> Result<RevokeOutcome, ApiError> {
    let mut outcome = RevokeOutcome::default();

    let entries = score::soft_delete_by_punch(tx, punch.id).await?;
    let direct_total: i64 = entries.iter().map(|e| e.count).sum();
    if direct_total != 0 {
        crate::store::aggregate::adjust(tx, punch.user_id, activity.id, -direct_total).await?;
        outcome.reverted_total += direct_total;
    }

    let instant = punch.created_at_instant();
    let day = calendar.day_index(instant);
    let day_start = calendar.day_start(instant).timestamp();
    let day_end = day_start + 86_400;

    let project_cause = project_bonus_cause(project.id);
    let project_bonus_already_removed = entries.iter().any(|e| e.cause == project_cause);
    if project_bonus_already_removed {
        outcome.project_bonus_reverted = true;
    } else if project.has_completion_bonus() {
        if let Some(bonus) =
            score::find_active_bonus(&mut **tx, punch.user_id, &project_cause, day).await?
        {
            if !project_complete_on_day(tx, project.id, punch.user_id, day_start, day_end).await? {
                score::soft_delete_entry(tx, bonus.id).await?;
                crate::store::aggregate::adjust(tx, punch.user_id, activity.id, -bonus.count).await?;
                outcome.reverted_total += bonus.count;
                outcome.project_bonus_reverted = true;
            }
        }
    }

    let activity_cause = activity_bonus_cause(activity.id);
    let activity_bonus_already_removed = entries.iter().any(|e| e.cause == activity_cause);
    if activity_bonus_already_removed {
        outcome.activity_bonus_reverted = true;
    } else if activity.has_completion_bonus() {
        if let Some(bonus) =
            score::find_active_bonus(&mut **tx, punch.user_id, &activity_cause, day).await?
        {
            if !activity_complete_on_day(tx, activity.id, punch.user_id, day_start, day_end).await? {
                score::soft_delete_entry(tx, bonus.id).await?;
                crate::store::aggregate::adjust(tx, punch.user_id, activity.id, -bonus.count).await?;
                outcome.reverted_total += bonus.count;
                outcome.activity_bonus_reverted = true;
            }
        }
    }

    Ok(outcome)
}
