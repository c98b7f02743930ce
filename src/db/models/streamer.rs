use core::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct StreamerId(pub i64);

/// Base streamer table model
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Streamer {
    pub id: StreamerId,
    pub username: String,
    pub phone_id: String,
    pub points: i64,
    pub total_stream_time: i64,
    pub is_streaming: bool,
    pub last_stream_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// One row of the points leaderboard as exposed over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub points: i64,
    pub total_stream_time: i64,
    pub is_streaming: bool,
}

impl From<Streamer> for LeaderboardEntry {
    fn from(value: Streamer) -> Self {
        Self {
            username: value.username,
            points: value.points,
            total_stream_time: value.total_stream_time,
            is_streaming: value.is_streaming,
        }
    }
}

impl From<i64> for StreamerId {
    fn from(value: i64) -> Self {
        StreamerId(value)
    }
}

impl fmt::Display for StreamerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
