use std::collections::BTreeMap;

use crate::domain::subscriber_email::SubscriberEmail;

/// Sender identity of an outgoing mail.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Mailbox {
    pub email: SubscriberEmail,
    pub name: String,
}

/// Body of an outgoing mail: raw HTML, or a template rendered by the mail API.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum MailContent {
    Html(String),
    Template {
        template: String,
        params: BTreeMap<String, String>,
    },
}

impl Mailbox {
    pub fn new(email: SubscriberEmail, name: String) -> Mailbox {
        Mailbox { email, name }
    }
}

impl MailContent {
    pub fn template<K, V>(template: &str, params: impl IntoIterator<Item = (K, V)>) -> MailContent
    where
        K: Into<String>,
        V: Into<String>,
    {
        MailContent::Template {
            template: template.to_string(),
            params: params
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}
