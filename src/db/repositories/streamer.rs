use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::instrument;

use super::sql_fragment;
use crate::db::models::streamer::Streamer;
use crate::db::repositories::Repository;

#[derive(Debug)]
pub struct StreamerRepository {
    pool: &'static Pool<Postgres>,
}

#[async_trait]
impl Repository for StreamerRepository {
    type Output = Streamer;

    const BASE_FIELDS: &'static str = sql_fragment::STREAMER_FIELDS;
    const TABLE_NAME: &'static str = "streamer";
    const RANK_FIELD: &'static str = "points";

    #[instrument(skip(pool))]
    fn new(pool: &'static Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &'static Pool<Postgres> {
        self.pool
    }
}
