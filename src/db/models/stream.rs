use core::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::models::streamer::StreamerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct StreamId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct ViewerId(pub i64);

/// Lifecycle of a broadcast session. `Ended` is terminal; the only legal
/// transition is `Active -> Ended`, enforced by conditional updates on the
/// `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Active,
    Ended,
}

impl StreamStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            StreamStatus::Active => "active",
            StreamStatus::Ended => "ended",
        }
    }
}

/// One active stream joined with its streamer's identity, as exposed by the
/// listing endpoint.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActiveStreamRow {
    pub id: StreamId,
    pub title: String,
    pub streamer: String,
    pub points: i64,
    pub viewers: i64,
    pub started_at: NaiveDateTime,
    pub phone_id: String,
}

/// Projection returned by the conditional close update: everything the
/// points award needs, read in the same statement that flips the status.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClosedStream {
    pub streamer_id: StreamerId,
    pub duration: i64,
    pub viewers_count: i64,
}

/// Outcome of a successful viewer join.
#[derive(Debug, Clone, Copy)]
pub struct JoinedStream {
    pub viewer_id: ViewerId,
    pub viewers_count: i64,
}

impl From<i64> for StreamId {
    fn from(value: i64) -> Self {
        StreamId(value)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
