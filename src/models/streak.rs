use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-(user, activity) streak counters. `last_day` is a civil day index
/// (`Calendar::day_index`), not a punch date directly.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, Copy, PartialEq, Eq)]
pub struct Streak {
    pub user_id: i64,
    pub activity_id: i64,
    pub current: i64,
    pub max: i64,
    pub total: i64,
    pub end_at: i64,
}

impl Streak {
    pub fn new(user_id: i64, activity_id: i64) -> Self {
        Self {
            user_id,
            activity_id,
            current: 0,
            max: 0,
            total: 0,
            end_at: 0,
        }
    }

    /// Applies an approved punch on civil day `day` to this streak, per
    /// `spec.md` §4.5 Step 4. No-op if `day` does not advance past
    /// `end_at` (re-approvals on an already-credited day don't move the
    /// streak).
    pub fn advance_to(&mut self, day: i64) {
        if self.total == 0 {
            // First credited day ever for this (user, activity).
            self.total = 1;
            self.current = 1;
            self.max = self.max.max(1);
            self.end_at = day;
            return;
        }

        if day - self.end_at < 1 {
            return;
        }

        self.total += 1;
        if day - self.end_at == 1 {
            self.current += 1;
        } else {
            self.current = 1;
        }
        self.max = self.max.max(self.current);
        self.end_at = day;
    }
}
