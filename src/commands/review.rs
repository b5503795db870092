//! Public entry point for reviewing a punch. Wraps the Review & Scoring
//! Engine in a single `BEGIN IMMEDIATE` transaction: the status change and
//! every score/streak side effect it triggers commit or roll back
//! together.

use sqlx::{Pool, Sqlite};

use crate::clock::{Calendar, Clock};
use crate::error::ApiError;
use crate::models::punch::PunchStatus;
use crate::models::user::Caller;
use crate::review::{self, ReviewOptions, ReviewOutcome};

pub async fn review_punch(
    pool: &Pool<Sqlite>,
    calendar: &Calendar,
    clock: &dyn Clock,
    caller: &Caller,
    punch_id: i64,
    decision: PunchStatus,
    options: &ReviewOptions,
) -> Result<ReviewOutcome, ApiError> {
    log::debug!("Reviewing punch: id={} reviewer={} decision={:?}", punch_id, caller.user_id, decision);
    let mut tx = pool.begin().await.map_err(|e| ApiError::from_sqlx(e, "Failed to start transaction"))?;
    let outcome = review::review(&mut tx, calendar, clock.now(), caller, caller.user_id, punch_id, decision, options)
        .await
        .inspect_err(|e| log::warn!("Review refused: punch={} reviewer={}: {}", punch_id, caller.user_id, e.message))?;
    tx.commit().await.map_err(|e| ApiError::from_sqlx(e, "Failed to commit transaction"))?;

    if let Some(award) = &outcome.award {
        if award.daily_limit_hit {
            log::info!("Punch {} approved with daily cap reached (awarded {})", punch_id, award.base_awarded);
        } else {
            log::info!("Punch {} approved, awarded {}", punch_id, award.base_awarded);
        }
    }
    if let Some(revoke) = &outcome.revoke {
        if revoke.reverted_total > 0 {
            log::info!("Punch {} revoked {} points", punch_id, revoke.reverted_total);
        }
    }
    if let Some(message) = &outcome.partial_failure {
        log::warn!(
            "Punch {} status committed but scoring failed; caller should surface HTTP 206: {}",
            punch_id, message
        );
    }
    Ok(outcome)
}
