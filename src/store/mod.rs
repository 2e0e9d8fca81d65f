use async_trait::async_trait;
use std::sync::Arc;

use crate::config::DatabaseBinding;
use crate::domain::new_subscriber::NewSubscriber;

pub mod fetcher;
pub mod sqlite;

pub use fetcher::FetcherSubscriberStore;
pub use sqlite::SqliteSubscriberStore;

pub const INSERT_SUBSCRIBER_SQL: &str = "INSERT INTO EMAILS (email, date) VALUES (?, ?)";

/// Where subscribers are recorded. The store enforces one row per email: inserting an address
/// twice is an error.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn insert_subscriber(&self, new_subscriber: &NewSubscriber) -> Result<(), StoreError>;

    /// Brings the schema up to date. Remote databases manage their own schema.
    async fn migrate(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("Failed to execute the insert statement.")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Failed to apply the database migrations.")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Failed to reach the database endpoint.")]
    RequestError(#[from] reqwest::Error),
    #[error("The database rejected the statement: {0}")]
    Rejected(String),
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::DatabaseError(err) => write!(f, "{}\nCaused by:\n\t{}", self, err),
            StoreError::MigrationError(err) => write!(f, "{}\nCaused by:\n\t{}", self, err),
            StoreError::RequestError(err) => write!(f, "{}\nCaused by:\n\t{}", self, err),
            StoreError::Rejected(_) => write!(f, "{}", self),
        }
    }
}

/// Opens the store described by `binding`, whichever shape it has. `None` means no store is
/// available to record subscribers.
pub fn connect_store(binding: Option<&DatabaseBinding>) -> Option<Arc<dyn SubscriberStore>> {
    let binding = match binding {
        Some(binding) => binding,
        None => {
            tracing::warn!("No database binding configured");
            return None;
        }
    };

    let store: Result<Arc<dyn SubscriberStore>, StoreError> = match binding {
        DatabaseBinding::Sqlite {
            url,
            create_if_missing,
        } => SqliteSubscriberStore::connect_lazy(url, *create_if_missing)
            .map(|store| Arc::new(store) as Arc<dyn SubscriberStore>),
        DatabaseBinding::Fetcher { url, api_token } => {
            FetcherSubscriberStore::new(url.clone(), api_token.clone(), None)
                .map(|store| Arc::new(store) as Arc<dyn SubscriberStore>)
        }
    };

    match store {
        Ok(store) => Some(store),
        Err(err) => {
            tracing::error!("Failed to open the subscriber store: {:?}", err);
            None
        }
    }
}
