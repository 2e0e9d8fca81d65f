use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, SqlitePool};
use std::str::FromStr;

use super::{StoreError, SubscriberStore, INSERT_SUBSCRIBER_SQL};
use crate::domain::new_subscriber::NewSubscriber;

pub struct SqliteSubscriberStore {
    db_pool: SqlitePool,
}

impl SqliteSubscriberStore {
    pub fn new(db_pool: SqlitePool) -> SqliteSubscriberStore {
        SqliteSubscriberStore { db_pool }
    }

    /// Builds the pool without opening a connection; the first insert does.
    pub fn connect_lazy(url: &str, create_if_missing: bool) -> Result<Self, StoreError> {
        let mut db_options =
            SqliteConnectOptions::from_str(url)?.create_if_missing(create_if_missing);

        db_options.log_statements(tracing::log::LevelFilter::Trace);

        let db_pool = SqlitePoolOptions::new()
            .acquire_timeout(std::time::Duration::from_secs(2))
            .connect_lazy_with(db_options);

        Ok(Self::new(db_pool))
    }
}

#[async_trait]
impl SubscriberStore for SqliteSubscriberStore {
    #[tracing::instrument(
        name = "Insert a new subscriber into the database",
        skip(self, new_subscriber)
    )]
    async fn insert_subscriber(&self, new_subscriber: &NewSubscriber) -> Result<(), StoreError> {
        sqlx::query(INSERT_SUBSCRIBER_SQL)
            .bind(new_subscriber.email.as_ref())
            .bind(&new_subscriber.date)
            .execute(&self.db_pool)
            .await
            .map_err(|err| {
                tracing::error!("Failed to execute query: {:?}", err);
                err
            })?;

        Ok(())
    }

    #[tracing::instrument(name = "Apply the database migrations", skip(self))]
    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.db_pool).await?;

        Ok(())
    }
}
