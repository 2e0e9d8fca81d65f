use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use crate::domain::subscriber_email::SubscriberEmail;

#[derive(Debug)]
pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub date: String,
}

#[derive(Deserialize, Debug)]
pub struct SubmitParameters {
    pub email: Option<String>,
}

/// Why a submitted address was turned away before reaching the store.
#[derive(Debug, PartialEq, Eq)]
pub enum RejectedEmail {
    Missing,
    Invalid(String),
}

impl NewSubscriber {
    pub fn new(email: SubscriberEmail, registered_at: DateTime<Utc>) -> NewSubscriber {
        NewSubscriber {
            email,
            date: format_registration_date(registered_at),
        }
    }
}

impl TryFrom<SubmitParameters> for NewSubscriber {
    type Error = RejectedEmail;

    fn try_from(parameters: SubmitParameters) -> Result<Self, Self::Error> {
        let email = match parameters.email {
            Some(email) if !email.is_empty() => email,
            _ => return Err(RejectedEmail::Missing),
        };
        let email = SubscriberEmail::parse(email).map_err(RejectedEmail::Invalid)?;

        Ok(NewSubscriber::new(email, Utc::now()))
    }
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2023-03-01T10:00:00.000Z`.
pub fn format_registration_date(registered_at: DateTime<Utc>) -> String {
    registered_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
