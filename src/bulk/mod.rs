//! The `send` command: one HTML mail delivered to a batch of recipients.
//!
//! Recipients come from `--to` and from a CSV list. After the operator confirms, they are
//! sent to in chunks of [`CHUNK_SIZE`], one chunk at a time. The first failing chunk stops the
//! run; chunks already sent stay sent.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::mail::MailContent;
use crate::email_client::{EmailClient, SendMailError};

pub mod recipients;

pub use recipients::{collect_recipients, read_recipient_list};

/// Most recipients the mail API accepts in one call.
pub const CHUNK_SIZE: usize = 100;
pub const DEV_SUBJECT_TAG: &str = "[測試] ";

#[derive(clap::Parser, Debug, Clone)]
#[command(name = "send", about = "Send an HTML mail to a list of recipients")]
pub struct SendCommand {
    /// HTML mail file to use
    #[arg(value_name = "mail")]
    pub mail: PathBuf,

    /// Emails to send to
    #[arg(short = 't', long = "to", value_name = "emails", num_args = 1..)]
    pub to: Vec<String>,

    /// Emails list to send to, a CSV file with an `email` column
    #[arg(short = 'l', long = "list", value_name = "file")]
    pub list: Option<PathBuf>,

    /// Subject of the email
    #[arg(short = 's', long = "subject")]
    pub subject: Option<String>,
}

/// Asks the operator whether to go ahead.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool, BulkSendError>;
}

/// Interactive yes/no prompt on the terminal.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool, BulkSendError> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .interact()
            .map_err(BulkSendError::PromptError)
    }
}

/// A mail ready to be sent: body loaded, recipients merged, subject final.
#[derive(Debug)]
pub struct Mailing {
    pub html: String,
    pub recipients: Vec<String>,
    pub subject: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Sent(usize),
    Canceled,
}

#[derive(thiserror::Error)]
pub enum BulkSendError {
    #[error("Missing arguments")]
    MissingArguments,
    #[error("Failed to read {path}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read the recipient list {path}")]
    ListError {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to ask for confirmation.")]
    PromptError(#[source] dialoguer::Error),
    #[error("Failed to send emails to recipients {first} to {last}: {source}")]
    SendError {
        first: usize,
        last: usize,
        #[source]
        source: SendMailError,
    },
    #[error("Failed to write to the terminal.")]
    OutputError(#[from] std::io::Error),
}

impl std::fmt::Debug for BulkSendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self)?;

        let mut current = std::error::Error::source(self);

        while let Some(cause) = current {
            writeln!(f, "Caused by:\n\t{}", cause)?;
            current = std::error::Error::source(cause);
        }

        Ok(())
    }
}

/// Lists whose path mentions "dev" are test audiences: their subject gets [`DEV_SUBJECT_TAG`].
pub fn effective_subject(subject: &str, list: Option<&Path>) -> String {
    let is_dev_list = list
        .map(|list| list.to_string_lossy().to_lowercase().contains("dev"))
        .unwrap_or(false);

    if is_dev_list {
        format!("{}{}", DEV_SUBJECT_TAG, subject)
    } else {
        subject.to_string()
    }
}

impl Mailing {
    pub fn prepare(command: &SendCommand) -> Result<Mailing, BulkSendError> {
        let html = std::fs::read_to_string(&command.mail).map_err(|source| {
            BulkSendError::ReadError {
                path: command.mail.clone(),
                source,
            }
        })?;
        let recipients = collect_recipients(&command.to, command.list.as_deref())?;

        let subject = match command.subject.as_deref() {
            Some(subject) if !subject.is_empty() => subject,
            _ => return Err(BulkSendError::MissingArguments),
        };

        if recipients.is_empty() {
            return Err(BulkSendError::MissingArguments);
        }

        Ok(Mailing {
            html,
            recipients,
            subject: effective_subject(subject, command.list.as_deref()),
        })
    }

    pub fn confirmation_prompt(&self) -> String {
        format!(
            "Send mail \"{}\" to {} emails?",
            self.subject,
            self.recipients.len()
        )
    }
}

/// Sends `mailing` chunk by chunk, reporting progress to `out` after each one.
#[tracing::instrument(
    name = "Sending a mailing in chunks",
    skip(email_client, mailing, out),
    fields(
        subject = %mailing.subject,
        recipients = mailing.recipients.len()
    )
)]
pub async fn send_in_chunks<W: Write>(
    email_client: &EmailClient,
    mailing: &Mailing,
    out: &mut W,
) -> Result<(), BulkSendError> {
    let total = mailing.recipients.len();
    let content = MailContent::Html(mailing.html.clone());

    for (index, chunk) in mailing.recipients.chunks(CHUNK_SIZE).enumerate() {
        let first = index * CHUNK_SIZE;
        let sent = first + chunk.len();

        email_client
            .send_email(chunk, &mailing.subject, &content)
            .await
            .map_err(|source| BulkSendError::SendError {
                first: first + 1,
                last: sent,
                source,
            })?;

        writeln!(
            out,
            "Sent emails to {} ({} / {})",
            chunk.join(", "),
            sent,
            total
        )?;
    }

    Ok(())
}

/// The whole `send` command after configuration: prepare, confirm, deliver.
pub async fn run<C: Confirm, W: Write>(
    command: &SendCommand,
    email_client: &EmailClient,
    confirm: &mut C,
    out: &mut W,
) -> Result<Outcome, BulkSendError> {
    let mailing = Mailing::prepare(command)?;

    writeln!(out, "Emails: {}", mailing.recipients.join(", "))?;

    if !confirm.confirm(&mailing.confirmation_prompt())? {
        writeln!(out, "Canceled")?;
        return Ok(Outcome::Canceled);
    }

    send_in_chunks(email_client, &mailing, out).await?;

    writeln!(out, "Done")?;

    Ok(Outcome::Sent(mailing.recipients.len()))
}
