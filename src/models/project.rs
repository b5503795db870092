use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Immutable snapshot of a Project's scoring policy. Read-only to the core.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, Copy, PartialEq, Eq)]
pub struct Project {
    pub id: i64,
    pub activity_id: i64,
    pub completion_bonus: i64,
    pub exempt_from_limit: bool,
}

impl Project {
    pub fn has_completion_bonus(&self) -> bool {
        self.completion_bonus > 0
    }
}
