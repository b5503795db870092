//! Award Pipeline: the score side effects of approving a punch — base
//! points under the activity's daily cap, project/activity completion
//! bonuses, and the streak advance. Runs entirely inside the caller's
//! transaction; nothing here commits on its own.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};

use crate::clock::Calendar;
use crate::error::ApiError;
use crate::models::activity::Activity;
use crate::models::column::Column;
use crate::models::project::Project;
use crate::models::punch::Punch;
use crate::models::score_entry::{
    activity_bonus_cause, compose_marked_by, disambiguate_special_cause, project_bonus_cause,
    ScoreEntry, CAUSE_AUTO,
};
use crate::models::streak::Streak;
use crate::review::ReviewOptions;
use crate::store::{aggregate, config_reader, punch as punch_store, score, streak as streak_store};

#[derive(Debug, Clone)]
pub struct AwardOutcome {
    pub base_awarded: i64,
    pub daily_limit_hit: bool,
    /// Whether the project/activity completion predicate holds for this
    /// punch's day, independent of whether a bonus was *newly* issued this
    /// round — `spec.md` §6's `project_complete`/`activity_complete` wire
    /// fields are a completion status, not "did this call insert a bonus".
    pub project_complete: bool,
    pub activity_complete: bool,
    /// Set only when this call newly inserted the bonus entry; `None` both
    /// when the scope isn't complete and when it was already credited on
    /// an earlier approval this day (§4.5 Steps 2-3's idempotency check).
    pub project_bonus: Option<ScoreEntry>,
    pub activity_bonus: Option<ScoreEntry>,
    pub streak: Streak,
}

fn day_bounds(calendar: &Calendar, instant: DateTime<Utc>) -> (i64, i64) {
    let start = calendar.day_start(instant).timestamp();
    (start, start + 86_400)
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

/// Runs the full award sequence for a punch transitioning into Approved.
///
/// Step 1's base-award mode follows `options.special` (`spec.md` §4.5):
/// in automatic mode (`!options.special`), any active ledger entry already
/// on this punch refuses the award with `AlreadyScored`, and the amount is
/// the column's `PointEarned` under cause `"Auto"`; in special mode the
/// reviewer's `score`/`cause` are used verbatim (disambiguated if they
/// collide with `"Auto"`) and no idempotency check runs — a reviewer may
/// stack more than one special award on the same punch by choice.
pub async fn award_for_approval(
    tx: &mut Transaction<'_, Sqlite>,
    calendar: &Calendar,
    now: DateTime<Utc>,
    reviewer_id: i64,
    punch: &Punch,
    column: &Column,
    project: &Project,
    activity: &Activity,
    options: &ReviewOptions,
) -> Result<AwardOutcome, ApiError> {
    let instant = punch.created_at_instant();
    let day = calendar.day_index(instant);
    let (day_start, day_end) = day_bounds(calendar, instant);
    let marked_by = compose_marked_by(&options.marked_by, reviewer_id);

    let (requested, cause) = if !options.special {
        if score::has_active_for_punch(&mut **tx, punch.id).await? {
            return Err(ApiError::already_scored(
                "This punch already carries an active score entry",
            ));
        }
        (column.point_earned, CAUSE_AUTO.to_string())
    } else {
        if options.score < 1 {
            return Err(ApiError::validation(
                "A special award must carry a score of at least 1",
            ));
        }
        (options.score, disambiguate_special_cause(&options.cause))
    };

    // Step 1: base award, clamped by the activity's daily point cap unless
    // its project is exempt from the cap. A column's own `optional` flag
    // only excludes its awards from the cap's `spent` sum (the clamp below
    // goes through `spent_toward_daily_cap`, which already filters
    // `optional = 0`); it does not exempt the column's own award from being
    // clamped. The clamp applies to special awards too — only completion
    // bonuses bypass it (see §9's open question on whether bonuses should
    // be capped).
    let capped = !project.exempt_from_limit && activity.has_daily_limit();
    let (base_awarded, daily_limit_hit) = if capped {
        let spent = score::spent_toward_daily_cap(&mut **tx, punch.user_id, activity.id, day).await?;
        let remaining = (activity.daily_point_limit - spent).max(0);
        let awarded = requested.min(remaining);
        (awarded, awarded < requested)
    } else {
        (requested, false)
    };

    if base_awarded > 0 {
        score::insert_entry(
            tx,
            punch.user_id,
            punch.column_id,
            punch.id,
            base_awarded,
            &cause,
            &marked_by,
            day,
            now.timestamp(),
        )
        .await?;
        aggregate::adjust(tx, punch.user_id, activity.id, base_awarded).await?;
    }

    // Step 2: project completion bonus, at most once per (user, project, day).
    let project_complete =
        project_complete_on_day(tx, project.id, punch.user_id, day_start, day_end).await?;
    let mut project_bonus = None;
    if project.has_completion_bonus() && project_complete {
        let cause = project_bonus_cause(project.id);
        if score::find_active_bonus(&mut **tx, punch.user_id, &cause, day)
            .await?
            .is_none()
        {
            let entry = score::insert_entry(
                tx,
                punch.user_id,
                punch.column_id,
                punch.id,
                project.completion_bonus,
                &cause,
                &marked_by,
                day,
                now.timestamp(),
            )
            .await?;
            aggregate::adjust(tx, punch.user_id, activity.id, project.completion_bonus).await?;
            project_bonus = Some(entry);
        }
    }

    // Step 3: activity completion bonus, same idempotency shape as Step 2.
    let activity_complete =
        activity_complete_on_day(tx, activity.id, punch.user_id, day_start, day_end).await?;
    let mut activity_bonus = None;
    if activity.has_completion_bonus() && activity_complete {
        let cause = activity_bonus_cause(activity.id);
        if score::find_active_bonus(&mut **tx, punch.user_id, &cause, day)
            .await?
            .is_none()
        {
            let entry = score::insert_entry(
                tx,
                punch.user_id,
                punch.column_id,
                punch.id,
                activity.completion_bonus,
                &cause,
                &marked_by,
                day,
                now.timestamp(),
            )
            .await?;
            aggregate::adjust(tx, punch.user_id, activity.id, activity.completion_bonus).await?;
            activity_bonus = Some(entry);
        }
    }

    // Step 4: streak advance. Runs even when base_awarded is 0 (the punch
    // was still approved for a day this activity had not yet credited).
    let mut streak = streak_store::get_or_new(tx, punch.user_id, activity.id).await?;
    streak.advance_to(day);
    streak_store::save(tx, &streak).await?;

    Ok(AwardOutcome {
        base_awarded,
        daily_limit_hit,
        project_complete,
        activity_complete,
        project_bonus,
        activity_bonus,
        streak,
    })
}
