use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Immutable snapshot of an Activity's scoring policy, as exposed by the
/// Configuration Reader. CRUD of activities lives outside this crate; rows
/// are only ever read here.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, Copy, PartialEq, Eq)]
pub struct Activity {
    pub id: i64,
    /// 0 means unlimited.
    pub daily_point_limit: i64,
    pub completion_bonus: i64,
}

impl Activity {
    pub fn has_daily_limit(&self) -> bool {
        self.daily_point_limit > 0
    }

    pub fn has_completion_bonus(&self) -> bool {
        self.completion_bonus > 0
    }
}
