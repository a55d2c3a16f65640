use crate::{
    config::RuntimeConfiguration,
    error::{GetDatabaseConnectionSnafu, MigrateSnafu, OpenDatabaseSnafu, RosterResult},
};
use snafu::ResultExt;
use sqlx::{Pool, Postgres, Transaction, pool::PoolConnection, postgres::PgPoolOptions};

#[derive(Clone, Debug)]
pub struct RosterState {
    pool: Pool<Postgres>,
}

impl RosterState {
    pub async fn new(config: &RuntimeConfiguration) -> RosterResult<Self> {
        let db_config = config.db_config();
        let pool = PgPoolOptions::new()
            .max_connections(db_config.max_connections())
            .connect(&db_config.get_db_path())
            .await
            .context(OpenDatabaseSnafu)?;

        sqlx::migrate!().run(&pool).await.context(MigrateSnafu)?;
        debug!("Schema up to date");

        Ok(Self { pool })
    }

    pub const fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    pub async fn get_connection(&self) -> RosterResult<PoolConnection<Postgres>> {
        self.pool
            .acquire()
            .await
            .context(GetDatabaseConnectionSnafu)
    }

    pub async fn get_transaction(&self) -> RosterResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.context(GetDatabaseConnectionSnafu)
    }

    pub async fn sensible_shutdown(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}
