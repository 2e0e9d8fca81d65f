use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use super::{StoreError, SubscriberStore, INSERT_SUBSCRIBER_SQL};
use crate::domain::new_subscriber::NewSubscriber;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

/// A database reached over HTTP: statements are POSTed to `url` and executed remotely.
pub struct FetcherSubscriberStore {
    http_client: Client,
    url: String,
    api_token: Secret<String>,
}

#[derive(serde::Serialize)]
struct QueryBody<'a> {
    sql: &'a str,
    params: [&'a str; 2],
}

#[derive(serde::Deserialize)]
struct QueryResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<QueryMessage>,
}

#[derive(serde::Deserialize)]
struct QueryMessage {
    message: String,
}

impl FetcherSubscriberStore {
    pub fn new(
        url: String,
        api_token: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> Result<FetcherSubscriberStore, StoreError> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(FetcherSubscriberStore {
            http_client,
            url,
            api_token,
        })
    }
}

#[async_trait]
impl SubscriberStore for FetcherSubscriberStore {
    #[tracing::instrument(
        name = "Insert a new subscriber through the database endpoint",
        skip(self, new_subscriber)
    )]
    async fn insert_subscriber(&self, new_subscriber: &NewSubscriber) -> Result<(), StoreError> {
        let body = QueryBody {
            sql: INSERT_SUBSCRIBER_SQL,
            params: [new_subscriber.email.as_ref(), new_subscriber.date.as_str()],
        };

        let response = self
            .http_client
            .post(&self.url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_token.expose_secret()),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Rejected(format!("{} {}", status, text)));
        }

        let result: QueryResponse = serde_json::from_str(&text)
            .map_err(|err| StoreError::Rejected(format!("unexpected response {}: {}", text, err)))?;

        if !result.success {
            let messages: Vec<String> = result.errors.into_iter().map(|e| e.message).collect();

            return Err(StoreError::Rejected(messages.join("; ")));
        }

        Ok(())
    }
}
