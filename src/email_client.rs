use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::mail::{MailContent, Mailbox};

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

/// Client of the Hermes mail API, shared by the signup handler and the `send` command.
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: Mailbox,
    api_key: Secret<String>,
}

#[derive(serde::Serialize)]
struct SendEmailBody<'a> {
    from: &'a Mailbox,
    to: &'a [String],
    subject: &'a str,
    content: &'a MailContent,
}

#[derive(thiserror::Error)]
pub enum SendMailError {
    #[error("Failed to reach the mail API.")]
    RequestError(#[from] reqwest::Error),
    #[error("Failed to send email: {status} {body}")]
    Rejected { status: StatusCode, body: String },
}

impl std::fmt::Debug for SendMailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendMailError::RequestError(err) => write!(f, "{}\nCaused by:\n\t{}", self, err),
            SendMailError::Rejected { .. } => write!(f, "{}", self),
        }
    }
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: Mailbox,
        api_key: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> Result<EmailClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(EmailClient {
            http_client,
            base_url,
            sender,
            api_key,
        })
    }

    #[tracing::instrument(
        name = "Sending an email through the mail API",
        skip(self, to, content),
        fields(recipients = to.len())
    )]
    pub async fn send_email(
        &self,
        to: &[String],
        subject: &str,
        content: &MailContent,
    ) -> Result<(), SendMailError> {
        let url = format!("{}/api/send", self.base_url);
        let body = SendEmailBody {
            from: &self.sender,
            to,
            subject,
            content,
        };

        let response = self
            .http_client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            // The API explains rejections in the body, keep it for the logs
            let body = response.text().await.unwrap_or_default();

            return Err(SendMailError::Rejected { status, body });
        }

        Ok(())
    }
}
