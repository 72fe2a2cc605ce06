use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use sqlx::FromRow;
use uuid::Uuid;

/// A resume owned by exactly one user. `user_id` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Resume {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub user_id: Uuid,
}

/// Immutable snapshot written by each improvement. `version` starts at 1 per resume.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub version: i32,
    pub content: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn serialize_timestamp<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
}
