use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Denormalized per-(user, activity) sum of active ledger entries. Derived
/// state — always recomputable from the Score Ledger — maintained
/// incrementally by the Award/Revocation pipelines for read performance.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, Copy, PartialEq, Eq)]
pub struct AggregateScore {
    pub user_id: i64,
    pub activity_id: i64,
    pub score: i64,
}
