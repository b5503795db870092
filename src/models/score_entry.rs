use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One append-only (soft-deletable) credit on the ledger. `punch_date` is
/// the civil day index (`Calendar::day_index`) the originating punch
/// occurred on, never the award instant.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ScoreEntry {
    pub id: i64,
    pub user_id: i64,
    pub column_id: i64,
    pub punch_id: i64,
    pub count: i64,
    pub cause: String,
    pub marked_by: String,
    pub punch_date: i64,
}

pub const CAUSE_AUTO: &str = "Auto";

pub fn project_bonus_cause(project_id: i64) -> String {
    format!("ProjectCompletionBonus#{}", project_id)
}

pub fn activity_bonus_cause(activity_id: i64) -> String {
    format!("ActivityCompletionBonus#{}", activity_id)
}

/// Builds the `marked_by` audit string: `"<label>#<reviewer id>"`. If the
/// caller-supplied cause is literally `"Auto"`, the caller must suffix it
/// before storing so automatic and special-but-named-"Auto" awards never
/// collide in the ledger (see SPEC_FULL.md §B).
pub fn compose_marked_by(label: &str, reviewer_id: i64) -> String {
    format!("{}#{}", label, reviewer_id)
}

/// Disambiguates a caller-supplied cause from the automatic-award cause
/// when they collide verbatim.
pub fn disambiguate_special_cause(cause: &str) -> String {
    if cause == CAUSE_AUTO {
        format!("{}#special", CAUSE_AUTO)
    } else {
        cause.to_string()
    }
}
