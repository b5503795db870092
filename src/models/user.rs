use serde::{Deserialize, Serialize};

/// The authenticated caller's identity and role level, as handed to the
/// core by the (out-of-scope) authentication layer. Role management and
/// user CRUD live outside this crate — `Caller` is just the shape the core
/// needs to enforce the review operation's minimum role.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    /// 0 = participant, >=1 = reviewer/admin, per the reference
    /// deployment's `RoleID` convention.
    pub role: i32,
}

impl Caller {
    pub fn can_review(&self) -> bool {
        self.role >= 1
    }
}
