use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[repr(i64)]
pub enum PunchStatus {
    Pending = 0,
    Approved = 1,
    Rejected = 2,
}

impl PunchStatus {
    pub fn from_i64(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(PunchStatus::Pending),
            1 => Some(PunchStatus::Approved),
            2 => Some(PunchStatus::Rejected),
            _ => None,
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for PunchStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for PunchStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<sqlx::Sqlite>>::encode_by_ref(&(*self as i64), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for PunchStatus {
    fn decode(
        value: sqlx::sqlite::SqliteValueRef<'r>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let raw = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        PunchStatus::from_i64(raw).ok_or_else(|| format!("invalid punch status: {}", raw).into())
    }
}

/// A single punch submission: short text plus optional image references,
/// timestamped to the wall instant it was created (or last updated, while
/// still Pending). `created_at` is stored as epoch seconds; civil-day
/// computations always go through `Calendar`, never through this field
/// directly.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Punch {
    pub id: i64,
    pub column_id: i64,
    pub user_id: i64,
    pub content: String,
    pub status: PunchStatus,
    pub created_at: i64,
}

impl Punch {
    pub fn created_at_instant(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.created_at, 0).expect("stored punch timestamps are valid")
    }
}
