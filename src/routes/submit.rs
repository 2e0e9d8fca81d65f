use actix_web::http::header::ACCEPT_LANGUAGE;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    background::BackgroundTasks,
    domain::{
        mail::MailContent,
        new_subscriber::{NewSubscriber, RejectedEmail, SubmitParameters},
        subscriber_email::SubscriberEmail,
    },
    email_client::EmailClient,
    startup::SubscriberStoreHandle,
};

const CONFIRMATION_SUBJECT: &str = "師大資工營事前登錄成功！";
const CONFIRMATION_TEMPLATE: &str = "simple";
const CONFIRMATION_PARAMS: [(&str, &str); 6] = [
    ("icon", "https://camp-storage.csie.cool/camp-icon.jpg"),
    ("greeting", "恭喜"),
    ("main", "師大資工營事前登錄成功！"),
    (
        "body",
        "我們會在報名開始時通知你，請保持關注！偶爾也可以到我們的粉專看看喔！",
    ),
    ("link", ""),
    (
        "footer",
        "官方網站,https://camp.csie.cool/;粉絲專頁,https://www.facebook.com/ntnucsiecamp",
    ),
];

/// Body of every `/submit` response. Failures are reported here, never through the status code.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SubmitResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    ZhTw,
    En,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMessage {
    EmptyEmail,
    InvalidEmail,
    StoreUnavailable,
    AlreadySubscribed,
}

impl Locale {
    /// Picks the locale from the first `Accept-Language` tag, falling back to zh-TW.
    pub fn from_request(request: &HttpRequest) -> Locale {
        let first_tag = request
            .headers()
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|tag| tag.trim().to_lowercase());

        match first_tag {
            Some(tag) if tag.starts_with("en") => Locale::En,
            _ => Locale::ZhTw,
        }
    }
}

impl SubmitMessage {
    pub fn text(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (SubmitMessage::EmptyEmail, Locale::ZhTw) => "請輸入電子郵件",
            (SubmitMessage::EmptyEmail, Locale::En) => "Please enter an email",
            (SubmitMessage::InvalidEmail, Locale::ZhTw) => "電子郵件格式錯誤",
            (SubmitMessage::InvalidEmail, Locale::En) => "Invalid email format",
            (SubmitMessage::StoreUnavailable, Locale::ZhTw) => "資料庫在鬧脾氣",
            (SubmitMessage::StoreUnavailable, Locale::En) => "The database is unavailable",
            (SubmitMessage::AlreadySubscribed, Locale::ZhTw) => "已經訂閱了",
            (SubmitMessage::AlreadySubscribed, Locale::En) => "Already subscribed",
        }
    }
}

impl SubmitResponse {
    fn success() -> SubmitResponse {
        SubmitResponse {
            success: true,
            error: String::new(),
        }
    }

    fn failure(message: SubmitMessage, locale: Locale) -> SubmitResponse {
        SubmitResponse {
            success: false,
            error: message.text(locale).to_string(),
        }
    }
}

#[tracing::instrument(
    name = "Registering a new email",
    skip(request, parameters, store, email_client, background_tasks),
    fields(
        subscriber_email = ?parameters.email
    )
)]
pub async fn handle_submit(
    request: HttpRequest,
    parameters: web::Query<SubmitParameters>,
    store: web::Data<SubscriberStoreHandle>,
    email_client: web::Data<EmailClient>,
    background_tasks: web::Data<BackgroundTasks>,
) -> HttpResponse {
    let locale = Locale::from_request(&request);
    let reply = |message: SubmitMessage| {
        HttpResponse::Ok().json(SubmitResponse::failure(message, locale))
    };

    let new_subscriber: NewSubscriber = match parameters.into_inner().try_into() {
        Ok(subscriber) => subscriber,
        Err(RejectedEmail::Missing) => return reply(SubmitMessage::EmptyEmail),
        Err(RejectedEmail::Invalid(err)) => {
            tracing::info!("Validation error: {}", err);
            return reply(SubmitMessage::InvalidEmail);
        }
    };

    let store = match store.get() {
        Some(store) => store,
        None => {
            tracing::error!("No subscriber store is bound");
            return reply(SubmitMessage::StoreUnavailable);
        }
    };

    // Unique violations and every other store failure look the same to the caller
    if let Err(err) = store.insert_subscriber(&new_subscriber).await {
        tracing::error!("Failed to insert new subscriber: {:?}", err);
        return reply(SubmitMessage::AlreadySubscribed);
    }

    background_tasks.wait_until(send_confirmation_email(
        email_client.into_inner(),
        new_subscriber.email,
    ));

    HttpResponse::Ok().json(SubmitResponse::success())
}

#[tracing::instrument(
    name = "Send a confirmation email to a new subscriber",
    skip(email_client),
    fields(subscriber_email = %email)
)]
async fn send_confirmation_email(email_client: Arc<EmailClient>, email: SubscriberEmail) {
    let content = MailContent::template(CONFIRMATION_TEMPLATE, CONFIRMATION_PARAMS);
    let recipients = [email.as_ref().to_string()];

    tracing::info!("Sending email ...");

    match email_client
        .send_email(&recipients, CONFIRMATION_SUBJECT, &content)
        .await
    {
        Ok(()) => tracing::info!("Email sent successfully!"),
        Err(err) => tracing::error!("Failed to send an email to {}: {:?}", email, err),
    }
}
