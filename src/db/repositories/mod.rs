#![allow(dead_code)]

use core::fmt;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Result as SqlxResult, Transaction};
use tracing::instrument;

use crate::db::models::stream::{ClosedStream, StreamId, StreamStatus, ViewerId};
use crate::db::models::streamer::StreamerId;

pub mod stream;
pub mod streamer;

pub struct Tx<'a> {
    inner: Option<Transaction<'a, Postgres>>,
}

impl<'a> Tx<'a> {
    /// Runs `f` inside a transaction: commit on `Ok`, drop-rollback on `Err`.
    ///
    /// Every multi-row write in this service goes through here; a failure
    /// partway through a session start, close or join leaves no partial
    /// state behind.
    #[instrument(skip(pool, f))]
    pub async fn with_tx<F, Fut, T>(pool: &'static Pool<Postgres>, f: F) -> SqlxResult<T>
    where
        F: FnOnce(Tx<'a>) -> Fut,
        Fut: Future<Output = (Tx<'a>, SqlxResult<T>)>,
    {
        let tx = Self::begin(pool).await?;
        let (mut tx, result) = f(tx).await;

        match result {
            Ok(val) => {
                tx.commit().await?;
                Ok(val)
            }
            Err(e) => {
                tracing::trace!(error = ?e, "transacted query failure");
                Err(e)
            }
        }
    }

    #[instrument(skip(pool))]
    pub async fn begin(pool: &'static Pool<Postgres>) -> SqlxResult<Self> {
        let inner = pool.begin().await?;
        Ok(Self { inner: Some(inner) })
    }

    #[instrument(skip(self))]
    pub async fn commit(&mut self) -> SqlxResult<()> {
        if let Some(tx) = self.inner.take() {
            tx.commit().await
        } else {
            Err(sqlx::Error::Protocol(
                "Transaction already completed".into(),
            ))
        }
    }

    #[instrument(skip(self))]
    pub async fn rollback(&mut self) -> SqlxResult<()> {
        if let Some(tx) = self.inner.take() {
            tx.rollback().await
        } else {
            Err(sqlx::Error::Protocol(
                "Transaction already completed".into(),
            ))
        }
    }

    fn inner_mut(&mut self) -> SqlxResult<&mut Transaction<'a, Postgres>> {
        self.inner
            .as_mut()
            .ok_or_else(|| sqlx::Error::Protocol("Transaction already completed".into()))
    }

    /// Create-or-refresh a streamer keyed by their device id. The conflict
    /// arm keeps the row unique under concurrent starts while picking up
    /// username changes.
    #[instrument(skip(self, username))]
    pub async fn upsert_streamer(
        &mut self,
        username: &str,
        phone_id: &str,
    ) -> SqlxResult<StreamerId> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO streamer (username, phone_id)
            VALUES ($1, $2)
            ON CONFLICT (phone_id)
            DO UPDATE SET username = EXCLUDED.username
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(phone_id)
        .fetch_one(&mut **self.inner_mut()?)
        .await?;

        Ok(id.into())
    }

    #[instrument(skip(self))]
    pub async fn mark_streaming(&mut self, streamer_id: StreamerId) -> SqlxResult<()> {
        sqlx::query(
            r#"
            UPDATE streamer
            SET is_streaming = TRUE,
                last_stream_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(streamer_id)
        .execute(&mut **self.inner_mut()?)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, title))]
    pub async fn open_stream(
        &mut self,
        streamer_id: StreamerId,
        title: &str,
    ) -> SqlxResult<StreamId> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO stream (streamer_id, title, status)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(streamer_id)
        .bind(title)
        .bind(StreamStatus::Active.as_str())
        .fetch_one(&mut **self.inner_mut()?)
        .await?;

        Ok(id.into())
    }

    /// Flip an active stream to its terminal state, computing the elapsed
    /// duration in the same statement. `None` means the row was missing or
    /// already ended; closing twice never double-credits.
    #[instrument(skip(self))]
    pub async fn close_stream(&mut self, stream_id: StreamId) -> SqlxResult<Option<ClosedStream>> {
        sqlx::query_as::<_, ClosedStream>(
            r#"
            UPDATE stream
            SET status = $2,
                ended_at = NOW(),
                duration = EXTRACT(EPOCH FROM (NOW() - started_at))::BIGINT
            WHERE id = $1 AND status = $3
            RETURNING streamer_id, duration, viewers_count
            "#,
        )
        .bind(stream_id)
        .bind(StreamStatus::Ended.as_str())
        .bind(StreamStatus::Active.as_str())
        .fetch_optional(&mut **self.inner_mut()?)
        .await
    }

    #[instrument(skip(self))]
    pub async fn credit_streamer(
        &mut self,
        streamer_id: StreamerId,
        points: i64,
        duration: i64,
    ) -> SqlxResult<()> {
        sqlx::query(
            r#"
            UPDATE streamer
            SET points = points + $2,
                total_stream_time = total_stream_time + $3,
                is_streaming = FALSE
            WHERE id = $1
            "#,
        )
        .bind(streamer_id)
        .bind(points)
        .bind(duration)
        .execute(&mut **self.inner_mut()?)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, reason))]
    pub async fn record_award(
        &mut self,
        streamer_id: StreamerId,
        points: i64,
        reason: &str,
    ) -> SqlxResult<()> {
        sqlx::query(
            r#"
            INSERT INTO points_history (streamer_id, points, reason)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(streamer_id)
        .bind(points)
        .bind(reason)
        .execute(&mut **self.inner_mut()?)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_points_earned(&mut self, stream_id: StreamId, points: i64) -> SqlxResult<()> {
        sqlx::query(
            r#"
            UPDATE stream
            SET points_earned = $2
            WHERE id = $1
            "#,
        )
        .bind(stream_id)
        .bind(points)
        .execute(&mut **self.inner_mut()?)
        .await?;

        Ok(())
    }

    /// Increment-and-check in one statement; returns the new count, or
    /// `None` when the stream is missing or no longer active. Read-then-
    /// write here would lose updates under concurrent joins.
    #[instrument(skip(self))]
    pub async fn count_join(&mut self, stream_id: StreamId) -> SqlxResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE stream
            SET viewers_count = viewers_count + 1
            WHERE id = $1 AND status = $2
            RETURNING viewers_count
            "#,
        )
        .bind(stream_id)
        .bind(StreamStatus::Active.as_str())
        .fetch_optional(&mut **self.inner_mut()?)
        .await
    }

    #[instrument(skip(self))]
    pub async fn add_viewer(&mut self, stream_id: StreamId) -> SqlxResult<ViewerId> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO viewer (stream_id)
            VALUES ($1)
            RETURNING id
            "#,
        )
        .bind(stream_id)
        .fetch_one(&mut **self.inner_mut()?)
        .await?;

        Ok(ViewerId(id))
    }
}

pub mod sql_fragment {
    pub const STREAMER_FIELDS: &str = r#"
        id,
        username,
        phone_id,
        points,
        total_stream_time,
        is_streaming,
        last_stream_at,
        created_at
    "#;
}

#[async_trait]
pub trait Repository {
    type Output: for<'r> sqlx::FromRow<'r, <Postgres as sqlx::Database>::Row>
        + Sized
        + Unpin
        + Send
        + fmt::Debug;

    const BASE_FIELDS: &'static str;
    const TABLE_NAME: &'static str;

    /// Column the ranked range query orders by, descending. Ties land in
    /// storage order; no secondary key is promised.
    const RANK_FIELD: &'static str;

    fn new(pool: &'static Pool<Postgres>) -> Self
    where
        Self: Sized;

    fn pool(&self) -> &'static Pool<Postgres>;

    #[instrument(skip(self, limit, offset))]
    async fn get_by_range(&self, limit: i64, offset: i64) -> SqlxResult<Vec<Self::Output>> {
        sqlx::query_as::<_, Self::Output>(&format!(
            "SELECT {} FROM {} ORDER BY {} DESC LIMIT $1 OFFSET $2",
            Self::BASE_FIELDS,
            Self::TABLE_NAME,
            Self::RANK_FIELD,
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await
    }
}
