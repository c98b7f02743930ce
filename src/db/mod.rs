use std::sync::LazyLock;

use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::util::env::{self, Var};
use crate::var;

pub mod models;
pub mod repositories;

pub mod prelude {
    pub use crate::db::PgError;
    pub use crate::db::db_pool;

    pub use crate::db::models::ledger::{StreamReceipt, award_points, award_reason};
    pub use crate::db::models::stream::{
        ActiveStreamRow, JoinedStream, StreamId, StreamStatus, ViewerId,
    };
    pub use crate::db::models::streamer::{LeaderboardEntry, Streamer, StreamerId};

    pub use crate::db::repositories::Repository; // + trait to provide base methods
    pub use crate::db::repositories::Tx;
    pub use crate::db::repositories::stream::StreamRepository;
    pub use crate::db::repositories::streamer::StreamerRepository;
}

static DB_POOL: LazyLock<OnceCell<Db>> = LazyLock::new(OnceCell::new);
pub async fn db_pool() -> PgResult<&'static PgPool> {
    Ok(&DB_POOL
        .get_or_try_init(|| async { Db::new_pool().await })
        .await?
        .pool)
}

struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn new_pool() -> PgResult<Self> {
        let db_url = var!(Var::DatabaseUrl).await?;
        let pool = sqlx::PgPool::connect(db_url).await?;

        Ok(Self { pool })
    }
}

pub type PgResult<T> = core::result::Result<T, PgError>;

#[derive(Debug, Error)]
pub enum PgError {
    #[error(transparent)]
    SqlxError(#[from] sqlx::Error),

    #[error("{0}")]
    EnvError(#[from] env::EnvErr),
}
