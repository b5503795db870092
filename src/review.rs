//! Review & Scoring Engine: the Pending/Approved/Rejected state machine.
//! This is the only place a punch's status changes after submission, and
//! the only place Award/Revocation run.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};

use crate::award::{self, AwardOutcome};
use crate::clock::Calendar;
use crate::error::ApiError;
use crate::models::punch::{Punch, PunchStatus};
use crate::models::user::Caller;
use crate::revoke::{self, RevokeOutcome};
use crate::store::{config_reader, punch as punch_store};

/// The reviewer-supplied options accompanying a review decision
/// (`spec.md` §4.4/§6's `{special, score, cause, marked_by, clear_score}`).
#[derive(Debug, Clone)]
pub struct ReviewOptions {
    /// When `true`, the base award uses `score`/`cause` verbatim instead
    /// of the column's automatic `PointEarned`, and skips the
    /// already-scored idempotency check — a reviewer may grant more than
    /// one special award to the same punch by deliberate choice.
    pub special: bool,
    pub score: i64,
    pub cause: String,
    /// The human-readable label stored in `ScoreEntry.marked_by` ahead of
    /// `#<reviewerId>` (e.g. a reviewer's display name).
    pub marked_by: String,
    /// Per `spec.md` §4.4, any transition *out of* Approved forces this to
    /// `true` regardless of what the caller passed — the field exists on
    /// the wire contract but the engine never trusts a caller-supplied
    /// `false` to suppress revocation.
    pub clear_score: bool,
}

impl Default for ReviewOptions {
    fn default() -> Self {
        Self {
            special: false,
            score: 0,
            cause: String::new(),
            marked_by: String::from("reviewer"),
            clear_score: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReviewOutcome {
    pub punch: Option<Punch>,
    pub award: Option<AwardOutcome>,
    pub revoke: Option<RevokeOutcome>,
    /// Set when the status transition itself committed but a downstream
    /// scoring side effect errored (`spec.md` §4.4/§7's 206 PartialSuccess
    /// path). The caller's HTTP layer should map `Some(_)` to a 206
    /// response carrying this message rather than treat it as a failure.
    pub partial_failure: Option<String>,
}

/// Applies a reviewer's decision to a punch, per `spec.md` §4.4's
/// transition table:
///
/// - `Pending -> Approved` / `Rejected -> Approved`: runs the Award
///   Pipeline.
/// - `Pending -> Rejected`: status change only, no score side effects.
/// - `Approved -> Rejected` / `Approved -> Pending`: forces the
///   Revocation Pipeline.
/// - `Approved -> Approved` (re-review): forbidden unless `options.special`
///   — without `special` this falls through into the Award Pipeline's
///   ordinary automatic-award idempotency check, which refuses with
///   `AlreadyScored`; with `special`, a fresh special-award entry is
///   appended on top of whatever is already on the ledger.
/// - any other transition to the punch's current status: a no-op.
///
/// Per `spec.md` §5's ordering guarantee, the status update commits
/// *before* the award/revocation pipelines run. Any error those pipelines
/// raise is caught here rather than propagated: the status transition is
/// allowed to stand, and the caller gets back a `partial_failure` message
/// instead of an `Err`. Only errors raised *before* the status update
/// (authorization, missing column/project/activity) abort the whole
/// transaction.
pub async fn review(
    tx: &mut Transaction<'_, Sqlite>,
    calendar: &Calendar,
    now: DateTime<Utc>,
    caller: &Caller,
    reviewer_id: i64,
    punch_id: i64,
    decision: PunchStatus,
    options: &ReviewOptions,
) -> Result<ReviewOutcome, ApiError> {
    if !caller.can_review() {
        return Err(ApiError::authorization(
            "Caller's role does not permit reviewing punches",
        ));
    }

    let punch = punch_store::get_active_punch(&mut **tx, punch_id).await?;
    let previous_status = punch.status;
    let same_status = previous_status == decision;

    // A same-status transition is a no-op *unless* it's Approved -> Approved:
    // per spec.md §4.4 that re-review is "forbidden unless special", which
    // means it must still fall through into the Award Pipeline so Step 1's
    // idempotency check can refuse it with AlreadyScored (or, with
    // `options.special`, stack a fresh special award).
    if same_status && decision != PunchStatus::Approved {
        return Ok(ReviewOutcome {
            punch: Some(punch),
            ..Default::default()
        });
    }

    let column = config_reader::get_column(&mut **tx, punch.column_id).await?;
    let project = config_reader::get_project(&mut **tx, column.project_id).await?;
    let activity = config_reader::get_activity(&mut **tx, project.activity_id).await?;

    if !same_status {
        punch_store::set_status(tx, punch_id, decision).await?;
    }

    let mut outcome = ReviewOutcome::default();

    // Any transition away from Approved forces the Revocation Pipeline,
    // per the "clearScore := true regardless of caller flag" rule.
    if !same_status && previous_status == PunchStatus::Approved {
        match revoke::revoke_for_punch(tx, calendar, &punch, &project, &activity).await {
            Ok(revoked) => outcome.revoke = Some(revoked),
            Err(e) => {
                log::error!(
                    "Revocation pipeline failed for punch {} after status committed: {}",
                    punch_id, e.message
                );
                outcome.partial_failure = Some(e.message);
            }
        }
    }

    if decision == PunchStatus::Approved && outcome.partial_failure.is_none() {
        match award::award_for_approval(
            tx, calendar, now, reviewer_id, &punch, &column, &project, &activity, options,
        )
        .await
        {
            Ok(awarded) => outcome.award = Some(awarded),
            Err(e) => {
                log::error!(
                    "Award pipeline failed for punch {} after status committed: {}",
                    punch_id, e.message
                );
                outcome.partial_failure = Some(e.message);
            }
        }
    }

    let updated = punch_store::get_active_punch(&mut **tx, punch_id).await?;
    outcome.punch = Some(updated);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission;
    use crate::config::DeploymentConfig;
    use crate::db::{connection::establish_memory_pool, migrations::run_migrations};
    use crate::error::ErrorCode;
    use chrono::{DateTime, TimeZone, Utc};
    use sqlx::{Pool, Sqlite};

    async fn setup() -> Pool<Sqlite> {
        let pool = establish_memory_pool().await.expect("open in-memory pool");
        run_migrations(&pool).await.expect("run migrations");
        pool
    }

    struct Seed {
        activity_id: i64,
        column_id: i64,
    }

    /// One activity with a daily point cap of 8, one project worth a
    /// completion bonus of 20 with a single required (non-optional)
    /// column earning 5 points per punch.
    async fn seed(pool: &Pool<Sqlite>, daily_point_limit: i64, project_bonus: i64) -> Seed {
        let activity_id: i64 = sqlx::query_scalar(
            "INSERT INTO activity (name, daily_point_limit, completion_bonus) \
             VALUES ('Reading', ?, 0) RETURNING id",
        )
        .bind(daily_point_limit)
        .fetch_one(pool)
        .await
        .unwrap();

        let project_id: i64 = sqlx::query_scalar(
            "INSERT INTO project (activity_id, completion_bonus, exempt_from_limit) \
             VALUES (?, ?, 0) RETURNING id",
        )
        .bind(activity_id)
        .bind(project_bonus)
        .fetch_one(pool)
        .await
        .unwrap();

        let column_id: i64 = sqlx::query_scalar(
            "INSERT INTO habit_column \
                (project_id, start_date, end_date, daily_punch_limit, point_earned, optional) \
             VALUES (?, '2026-01-01', '2026-12-31', 0, 5, 0) RETURNING id",
        )
        .bind(project_id)
        .fetch_one(pool)
        .await
        .unwrap();

        Seed { activity_id, column_id }
    }

    fn noon(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, day, 12, 0, 0).unwrap()
    }

    fn reviewer() -> Caller {
        Caller { user_id: 99, role: 1 }
    }

    fn auto() -> ReviewOptions {
        ReviewOptions::default()
    }

    #[tokio::test]
    async fn non_reviewer_is_rejected() {
        let pool = setup().await;
        let seeded = seed(&pool, 0, 0).await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let mut tx = pool.begin().await.unwrap();
        let punch = admission::submit_punch(
            &mut tx, &config, &calendar, noon(1), 1, seeded.column_id, "did it", &[],
        )
        .await
        .unwrap();

        let participant = Caller { user_id: 1, role: 0 };
        let err = review(
            &mut tx, &calendar, noon(1), &participant, 1, punch.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Authorization);
    }

    #[tokio::test]
    async fn approving_awards_base_points_and_starts_streak() {
        let pool = setup().await;
        let seeded = seed(&pool, 0, 0).await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let mut tx = pool.begin().await.unwrap();
        let punch = admission::submit_punch(
            &mut tx, &config, &calendar, noon(1), 1, seeded.column_id, "did it", &[],
        )
        .await
        .unwrap();

        let outcome = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let award = outcome.award.expect("award ran");
        assert_eq!(award.base_awarded, 5);
        assert!(!award.daily_limit_hit);
        assert_eq!(award.streak.current, 1);
        assert_eq!(award.streak.total, 1);
        assert!(outcome.partial_failure.is_none());

        let total: i64 = sqlx::query_scalar(
            "SELECT score FROM total_score WHERE user_id = 1 AND activity_id = ?",
        )
        .bind(seeded.activity_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn daily_cap_clamps_base_award_across_two_punches() {
        let pool = setup().await;
        let seeded = seed(&pool, 8, 0).await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let mut tx = pool.begin().await.unwrap();
        let first = admission::submit_punch(
            &mut tx, &config, &calendar, noon(1), 1, seeded.column_id, "one", &[],
        )
        .await
        .unwrap();
        let second = admission::submit_punch(
            &mut tx, &config, &calendar, noon(1), 1, seeded.column_id, "two", &[],
        )
        .await
        .unwrap();

        let first_outcome = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, first.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();
        assert_eq!(first_outcome.award.unwrap().base_awarded, 5);

        let second_outcome = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, second.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();
        let second_award = second_outcome.award.unwrap();
        assert_eq!(second_award.base_awarded, 3);
        assert!(second_award.daily_limit_hit);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn rejecting_an_approved_punch_revokes_its_score() {
        let pool = setup().await;
        let seeded = seed(&pool, 0, 0).await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let mut tx = pool.begin().await.unwrap();
        let punch = admission::submit_punch(
            &mut tx, &config, &calendar, noon(1), 1, seeded.column_id, "did it", &[],
        )
        .await
        .unwrap();
        review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();

        let revoked = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Rejected, &auto(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(revoked.revoke.unwrap().reverted_total, 5);
        let total: i64 = sqlx::query_scalar(
            "SELECT score FROM total_score WHERE user_id = 1 AND activity_id = ?",
        )
        .bind(seeded.activity_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn unreviewing_an_approved_punch_back_to_pending_revokes_its_score() {
        let pool = setup().await;
        let seeded = seed(&pool, 0, 0).await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let mut tx = pool.begin().await.unwrap();
        let punch = admission::submit_punch(
            &mut tx, &config, &calendar, noon(1), 1, seeded.column_id, "did it", &[],
        )
        .await
        .unwrap();
        review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();

        let reverted = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Pending, &auto(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(reverted.punch.unwrap().status, PunchStatus::Pending);
        assert_eq!(reverted.revoke.unwrap().reverted_total, 5);
        assert!(reverted.award.is_none());
    }

    #[tokio::test]
    async fn project_completion_bonus_awarded_once() {
        let pool = setup().await;
        let seeded = seed(&pool, 0, 20).await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let mut tx = pool.begin().await.unwrap();
        let punch = admission::submit_punch(
            &mut tx, &config, &calendar, noon(1), 1, seeded.column_id, "did it", &[],
        )
        .await
        .unwrap();

        let outcome = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let award = outcome.award.unwrap();
        let bonus = award.project_bonus.expect("sole required column completed");
        assert_eq!(bonus.count, 20);

        let total: i64 = sqlx::query_scalar(
            "SELECT score FROM total_score WHERE user_id = 1 AND activity_id = ?",
        )
        .bind(seeded.activity_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(total, 25);
    }

    #[tokio::test]
    async fn project_complete_flag_stays_true_after_the_bonus_day_is_already_credited() {
        // Two required columns under one project with a completion bonus
        // (spec.md §8 scenario 2): completing the second column awards the
        // bonus once; a further approved punch on either column that same
        // day still reports `project_complete = true` even though
        // `project_bonus` is `None` the second time around.
        let pool = setup().await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let activity_id: i64 = sqlx::query_scalar(
            "INSERT INTO activity (name, daily_point_limit, completion_bonus) \
             VALUES ('Reading', 0, 0) RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let project_id: i64 = sqlx::query_scalar(
            "INSERT INTO project (activity_id, completion_bonus, exempt_from_limit) \
             VALUES (?, 20, 0) RETURNING id",
        )
        .bind(activity_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        let col1: i64 = sqlx::query_scalar(
            "INSERT INTO habit_column \
                (project_id, start_date, end_date, daily_punch_limit, point_earned, optional) \
             VALUES (?, '2026-01-01', '2026-12-31', 0, 5, 0) RETURNING id",
        )
        .bind(project_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        let col2: i64 = sqlx::query_scalar(
            "INSERT INTO habit_column \
                (project_id, start_date, end_date, daily_punch_limit, point_earned, optional) \
             VALUES (?, '2026-01-01', '2026-12-31', 0, 5, 0) RETURNING id",
        )
        .bind(project_id)
        .fetch_one(&pool)
        .await
        .unwrap();

        let mut tx = pool.begin().await.unwrap();
        let first = admission::submit_punch(&mut tx, &config, &calendar, noon(1), 1, col1, "c1", &[])
            .await
            .unwrap();
        let first_outcome = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, first.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();
        let first_award = first_outcome.award.unwrap();
        assert!(!first_award.project_complete);
        assert!(first_award.project_bonus.is_none());

        let second = admission::submit_punch(&mut tx, &config, &calendar, noon(1), 1, col2, "c2", &[])
            .await
            .unwrap();
        let second_outcome = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, second.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();
        let second_award = second_outcome.award.unwrap();
        assert!(second_award.project_complete);
        assert_eq!(second_award.project_bonus.as_ref().unwrap().count, 20);

        // A third, special-awarded punch on col2 the same day still sees
        // the project as complete, but does not re-issue the bonus.
        let third = admission::submit_punch(&mut tx, &config, &calendar, noon(1), 1, col2, "c2 again", &[])
            .await
            .unwrap();
        let special = ReviewOptions {
            special: true,
            score: 1,
            cause: "bonus-round".to_string(),
            marked_by: "jane".to_string(),
            clear_score: false,
        };
        let third_outcome = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, third.id, PunchStatus::Approved, &special,
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        let third_award = third_outcome.award.unwrap();
        assert!(third_award.project_complete);
        assert!(third_award.project_bonus.is_none());
    }

    #[tokio::test]
    async fn re_reviewing_with_the_same_decision_is_a_no_op() {
        let pool = setup().await;
        let seeded = seed(&pool, 0, 0).await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let mut tx = pool.begin().await.unwrap();
        let punch = admission::submit_punch(
            &mut tx, &config, &calendar, noon(1), 1, seeded.column_id, "did it", &[],
        )
        .await
        .unwrap();
        review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Rejected, &auto(),
        )
        .await
        .unwrap();

        // Rejected -> Rejected is a true no-op (distinct from the
        // Approved -> Approved "forbidden unless special" case, covered
        // separately below).
        let rejected_again = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Rejected, &auto(),
        )
        .await
        .unwrap();
        assert!(rejected_again.award.is_none());
        assert!(rejected_again.revoke.is_none());
        assert!(rejected_again.partial_failure.is_none());
    }

    #[tokio::test]
    async fn re_approving_without_special_fails_already_scored_p6() {
        let pool = setup().await;
        let seeded = seed(&pool, 0, 0).await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let mut tx = pool.begin().await.unwrap();
        let punch = admission::submit_punch(
            &mut tx, &config, &calendar, noon(1), 1, seeded.column_id, "did it", &[],
        )
        .await
        .unwrap();
        review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();

        // Approving an already-approved punch via the automatic path must
        // fail with AlreadyScored and not alter the ledger (P6). The status
        // update itself still commits (it's already Approved, a no-op
        // write), but the score side effect is the thing under test.
        let retry = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();
        assert_eq!(retry.partial_failure.as_deref(), Some("This punch already carries an active score entry"));
        assert!(retry.award.is_none());

        let total: i64 = sqlx::query_scalar(
            "SELECT score FROM total_score WHERE user_id = 1 AND activity_id = ?",
        )
        .bind(seeded.activity_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn special_re_approval_stacks_an_additional_award() {
        let pool = setup().await;
        let seeded = seed(&pool, 0, 0).await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let mut tx = pool.begin().await.unwrap();
        let punch = admission::submit_punch(
            &mut tx, &config, &calendar, noon(1), 1, seeded.column_id, "did it", &[],
        )
        .await
        .unwrap();
        review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();

        let special = ReviewOptions {
            special: true,
            score: 10,
            cause: "extra-effort".to_string(),
            marked_by: "jane".to_string(),
            clear_score: false,
        };
        let outcome = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Approved, &special,
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(outcome.partial_failure.is_none());
        let award = outcome.award.expect("special award ran");
        assert_eq!(award.base_awarded, 10);

        let total: i64 = sqlx::query_scalar(
            "SELECT score FROM total_score WHERE user_id = 1 AND activity_id = ?",
        )
        .bind(seeded.activity_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(total, 15);
    }

    #[tokio::test]
    async fn optional_column_is_excluded_from_the_daily_cap_spent_computation() {
        // spec.md §8 scenario 4: a cap-bound activity with one required
        // column and one optional column. The optional column's own award is
        // still clamped by the cap like any other non-exempt column's (the
        // `optional` flag only excludes it from the cap's `spent` SUM, per
        // the GLOSSARY's "Optional column" entry) — but because its points
        // never count toward `spent`, a later required-column punch on the
        // same day still sees the cap as untouched.
        let pool = setup().await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let activity_id: i64 = sqlx::query_scalar(
            "INSERT INTO activity (name, daily_point_limit, completion_bonus) \
             VALUES ('Reading', 5, 0) RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let project_id: i64 = sqlx::query_scalar(
            "INSERT INTO project (activity_id, completion_bonus, exempt_from_limit) \
             VALUES (?, 0, 0) RETURNING id",
        )
        .bind(activity_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        let required_col: i64 = sqlx::query_scalar(
            "INSERT INTO habit_column \
                (project_id, start_date, end_date, daily_punch_limit, point_earned, optional) \
             VALUES (?, '2026-01-01', '2026-12-31', 0, 5, 0) RETURNING id",
        )
        .bind(project_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        let optional_col: i64 = sqlx::query_scalar(
            "INSERT INTO habit_column \
                (project_id, start_date, end_date, daily_punch_limit, point_earned, optional) \
             VALUES (?, '2026-01-01', '2026-12-31', 0, 10, 1) RETURNING id",
        )
        .bind(project_id)
        .fetch_one(&pool)
        .await
        .unwrap();

        let mut tx = pool.begin().await.unwrap();
        let opt_punch =
            admission::submit_punch(&mut tx, &config, &calendar, noon(1), 1, optional_col, "opt", &[])
                .await
                .unwrap();
        let opt_outcome = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, opt_punch.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();
        let opt_award = opt_outcome.award.unwrap();
        // Requested 10, but the activity's cap is 5 and nothing has been
        // spent yet: the optional column's own award is clamped down to 5,
        // same as a required column's would be.
        assert_eq!(opt_award.base_awarded, 5);
        assert!(opt_award.daily_limit_hit);

        let req_punch =
            admission::submit_punch(&mut tx, &config, &calendar, noon(1), 1, required_col, "req", &[])
                .await
                .unwrap();
        let req_outcome = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, req_punch.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        let req_award = req_outcome.award.unwrap();
        // The optional column's 5 awarded points are excluded from `spent`
        // (spent_toward_daily_cap filters `optional = 0`), so the required
        // column's full 5 points still fit under the cap untouched.
        assert_eq!(req_award.base_awarded, 5);
        assert!(!req_award.daily_limit_hit);

        let total: i64 = sqlx::query_scalar(
            "SELECT score FROM total_score WHERE user_id = 1 AND activity_id = ?",
        )
        .bind(activity_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(total, 10);
    }

    #[tokio::test]
    async fn exempt_project_bypasses_the_daily_cap_entirely() {
        let pool = setup().await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let activity_id: i64 = sqlx::query_scalar(
            "INSERT INTO activity (name, daily_point_limit, completion_bonus) \
             VALUES ('Reading', 3, 0) RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let project_id: i64 = sqlx::query_scalar(
            "INSERT INTO project (activity_id, completion_bonus, exempt_from_limit) \
             VALUES (?, 0, 1) RETURNING id",
        )
        .bind(activity_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        let column_id: i64 = sqlx::query_scalar(
            "INSERT INTO habit_column \
                (project_id, start_date, end_date, daily_punch_limit, point_earned, optional) \
             VALUES (?, '2026-01-01', '2026-12-31', 0, 20, 0) RETURNING id",
        )
        .bind(project_id)
        .fetch_one(&pool)
        .await
        .unwrap();

        let mut tx = pool.begin().await.unwrap();
        let punch =
            admission::submit_punch(&mut tx, &config, &calendar, noon(1), 1, column_id, "x", &[])
                .await
                .unwrap();
        let outcome = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        let award = outcome.award.unwrap();
        assert_eq!(award.base_awarded, 20);
        assert!(!award.daily_limit_hit);
    }

    #[tokio::test]
    async fn streak_accumulates_across_a_gap_scenario_6() {
        // spec.md §8 scenario 6: approved punches on days D, D+1, D+3.
        let pool = setup().await;
        let seeded = seed(&pool, 0, 0).await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let mut tx = pool.begin().await.unwrap();
        for day in [1u32, 2, 4] {
            let punch = admission::submit_punch(
                &mut tx, &config, &calendar, noon(day), 1, seeded.column_id, "x", &[],
            )
            .await
            .unwrap();
            review(
                &mut tx, &calendar, noon(day), &reviewer(), 99, punch.id, PunchStatus::Approved, &auto(),
            )
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();

        let streak: (i64, i64, i64) = sqlx::query_as(
            "SELECT current, max, total FROM continuity WHERE user_id = 1 AND activity_id = ?",
        )
        .bind(seeded.activity_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(streak, (1, 2, 3));
    }

    #[tokio::test]
    async fn approve_reject_approve_round_trip_matches_approve_once_b1() {
        // spec.md §8 B1: Approve -> Reject -> Approve on the same punch
        // leaves AggregateScore equal to "approve once" — no leakage, no
        // duplication.
        let pool = setup().await;
        let seeded = seed(&pool, 0, 0).await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let mut tx = pool.begin().await.unwrap();
        let punch = admission::submit_punch(
            &mut tx, &config, &calendar, noon(1), 1, seeded.column_id, "x", &[],
        )
        .await
        .unwrap();
        review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();
        review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Rejected, &auto(),
        )
        .await
        .unwrap();
        let final_outcome = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, punch.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(final_outcome.partial_failure.is_none());
        assert_eq!(final_outcome.award.unwrap().base_awarded, 5);
        let total: i64 = sqlx::query_scalar(
            "SELECT score FROM total_score WHERE user_id = 1 AND activity_id = ?",
        )
        .bind(seeded.activity_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn revoking_one_of_two_required_columns_breaks_the_project_bonus_scenario_3() {
        // spec.md §8 scenario 3: two required columns both approved on the
        // same day earns base points on both plus the project bonus once.
        // Flipping one column's approval back to Rejected soft-deletes that
        // column's base entry and, because the completion predicate no
        // longer holds, the project bonus too — while the other column's
        // base entry is untouched.
        let pool = setup().await;
        let config = DeploymentConfig::reference_deployment();
        let calendar = Calendar::reference_deployment();

        let activity_id: i64 = sqlx::query_scalar(
            "INSERT INTO activity (name, daily_point_limit, completion_bonus) \
             VALUES ('Reading', 0, 0) RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let project_id: i64 = sqlx::query_scalar(
            "INSERT INTO project (activity_id, completion_bonus, exempt_from_limit) \
             VALUES (?, 20, 0) RETURNING id",
        )
        .bind(activity_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        let col1: i64 = sqlx::query_scalar(
            "INSERT INTO habit_column \
                (project_id, start_date, end_date, daily_punch_limit, point_earned, optional) \
             VALUES (?, '2026-01-01', '2026-12-31', 0, 5, 0) RETURNING id",
        )
        .bind(project_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        let col2: i64 = sqlx::query_scalar(
            "INSERT INTO habit_column \
                (project_id, start_date, end_date, daily_punch_limit, point_earned, optional) \
             VALUES (?, '2026-01-01', '2026-12-31', 0, 5, 0) RETURNING id",
        )
        .bind(project_id)
        .fetch_one(&pool)
        .await
        .unwrap();

        let mut tx = pool.begin().await.unwrap();
        let first = admission::submit_punch(&mut tx, &config, &calendar, noon(1), 1, col1, "c1", &[])
            .await
            .unwrap();
        review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, first.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();
        let second = admission::submit_punch(&mut tx, &config, &calendar, noon(1), 1, col2, "c2", &[])
            .await
            .unwrap();
        review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, second.id, PunchStatus::Approved, &auto(),
        )
        .await
        .unwrap();

        let total_before: i64 = sqlx::query_scalar(
            "SELECT score FROM total_score WHERE user_id = 1 AND activity_id = ?",
        )
        .bind(activity_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(total_before, 30); // 5 + 5 + 20 bonus

        let revoked = review(
            &mut tx, &calendar, noon(1), &reviewer(), 99, second.id, PunchStatus::Rejected, &auto(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let revoke_outcome = revoked.revoke.unwrap();
        assert!(revoke_outcome.project_bonus_reverted);
        assert_eq!(revoke_outcome.reverted_total, 25); // col2's 5 + the 20 bonus

        let total_after: i64 = sqlx::query_scalar(
            "SELECT score FROM total_score WHERE user_id = 1 AND activity_id = ?",
        )
        .bind(activity_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(total_after, 5); // col1's base entry remains
    }
}
