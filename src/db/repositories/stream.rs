use sqlx::{Pool, Postgres, Result as SqlxResult};
use tracing::instrument;

use crate::db::models::ledger::{StreamReceipt, award_points, award_reason};
use crate::db::models::stream::{ActiveStreamRow, JoinedStream, StreamId, StreamStatus};
use crate::db::models::streamer::StreamerId;
use crate::db::repositories::Tx;

#[derive(Debug)]
pub struct StreamRepository {
    pool: &'static Pool<Postgres>,
}

impl StreamRepository {
    #[instrument(skip(pool))]
    pub fn new(pool: &'static Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Plain id lookup, used to tell "never existed" from "already ended"
    /// in diagnostics. Lookup failures degrade to `false` rather than
    /// masking the caller's original outcome.
    pub async fn exists(&self, stream_id: StreamId) -> bool {
        match sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM stream WHERE id = $1)")
            .bind(stream_id)
            .fetch_one(self.pool)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = ?e, "failed stream existence check");
                false
            }
        }
    }

    /// All currently-active streams joined with streamer identity, busiest
    /// first.
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> SqlxResult<Vec<ActiveStreamRow>> {
        sqlx::query_as::<_, ActiveStreamRow>(
            r#"
            SELECT s.id, s.title, st.username AS streamer, st.points,
                   s.viewers_count AS viewers, s.started_at, st.phone_id
            FROM stream s
            JOIN streamer st ON s.streamer_id = st.id
            WHERE s.status = $1
            ORDER BY s.viewers_count DESC
            "#,
        )
        .bind(StreamStatus::Active.as_str())
        .fetch_all(self.pool)
        .await
    }

    /// Open a broadcast session: upsert the streamer, flag them live and
    /// insert the active stream row, all in one transaction.
    #[instrument(skip(self, username, title))]
    pub async fn open(
        &self,
        username: &str,
        phone_id: &str,
        title: &str,
    ) -> SqlxResult<(StreamerId, StreamId)> {
        Tx::with_tx(self.pool, |mut tx| async move {
            let result = async {
                let streamer_id = tx.upsert_streamer(username, phone_id).await?;
                tx.mark_streaming(streamer_id).await?;
                let stream_id = tx.open_stream(streamer_id, title).await?;

                Ok((streamer_id, stream_id))
            }
            .await;

            (tx, result)
        })
        .await
    }

    /// Close a broadcast session and settle the award: conditional status
    /// flip, streamer credit, history entry and the stream's own
    /// `points_earned`, committed as one unit. `Ok(None)` means no active
    /// stream matched the id.
    #[instrument(skip(self))]
    pub async fn close(&self, stream_id: StreamId) -> SqlxResult<Option<StreamReceipt>> {
        Tx::with_tx(self.pool, |mut tx| async move {
            let result = async {
                let Some(closed) = tx.close_stream(stream_id).await? else {
                    return Ok(None);
                };

                let points = award_points(closed.duration, closed.viewers_count);
                let reason = award_reason(closed.duration, closed.viewers_count);

                tx.credit_streamer(closed.streamer_id, points, closed.duration)
                    .await?;
                tx.record_award(closed.streamer_id, points, &reason).await?;
                tx.set_points_earned(stream_id, points).await?;

                Ok(Some(StreamReceipt {
                    points_earned: points,
                    duration: closed.duration,
                }))
            }
            .await;

            if let Err(ref e) = result {
                tracing::error!(error = ?e, "failure while settling stream close");
            }

            (tx, result)
        })
        .await
    }

    /// Record a viewer join: atomic conditional increment plus the
    /// append-only viewer row. `Ok(None)` means no active stream matched.
    #[instrument(skip(self))]
    pub async fn join(&self, stream_id: StreamId) -> SqlxResult<Option<JoinedStream>> {
        Tx::with_tx(self.pool, |mut tx| async move {
            let result = async {
                let Some(viewers_count) = tx.count_join(stream_id).await? else {
                    return Ok(None);
                };

                let viewer_id = tx.add_viewer(stream_id).await?;

                Ok(Some(JoinedStream {
                    viewer_id,
                    viewers_count,
                }))
            }
            .await;

            (tx, result)
        })
        .await
    }
}
