use config::{Config, ConfigError, File};
use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;
use std::time;

use crate::domain::mail::Mailbox;
use crate::domain::subscriber_email::SubscriberEmail;

pub const DEFAULT_MAIL_API_URL: &str = "https://hermes.csie.cool";
pub const DEFAULT_SENDER_EMAIL: &str = "camp@csie.cool";
pub const DEFAULT_SENDER_NAME: &str = "師大資工營";

#[derive(Debug)]
pub enum Environment {
    Development,
    Production,
}

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    // A missing binding is not a configuration error: the signup handler reports the store as
    // unavailable instead.
    #[serde(default)]
    pub database: Option<DatabaseBinding>,
    pub email_client: EmailClientSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

/// The two shapes a subscriber store can be bound with.
#[derive(serde::Deserialize, Clone, Debug)]
#[serde(tag = "binding", rename_all = "snake_case")]
pub enum DatabaseBinding {
    /// A local SQLite database opened through a connection pool.
    Sqlite {
        url: String,
        #[serde(default)]
        create_if_missing: bool,
    },
    /// A remote database that executes statements POSTed to `url`.
    Fetcher {
        url: String,
        // secrecy protects secret information and prevents them to be exposed (eg: via logs)
        api_token: Secret<String>,
    },
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: String,
    pub sender_name: String,
    pub api_key: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

/// Settings of the `send` command, read from the process environment only.
#[derive(serde::Deserialize, Debug)]
pub struct MailerSettings {
    pub hermes_mail_token: Secret<String>,
    #[serde(default = "default_mail_api_url")]
    pub hermes_base_url: String,
    #[serde(default = "default_sender_email")]
    pub hermes_sender_email: String,
    #[serde(default = "default_sender_name")]
    pub hermes_sender_name: String,
}

impl Settings {
    pub fn get_address(&self) -> String {
        format!(
            "{}:{}",
            self.application.get_host(),
            self.application.get_port()
        )
    }

    pub fn get_email_client_sender(&self) -> Result<Mailbox, String> {
        self.email_client.get_sender()
    }

    pub fn set_email_client_base_url(&mut self, new_base_url: String) {
        self.email_client.base_url = new_base_url
    }

    pub fn set_database(&mut self, binding: Option<DatabaseBinding>) {
        self.database = binding
    }

    pub fn set_app_port(&mut self, port: u16) {
        self.application.port = port;
    }
}

impl ApplicationSettings {
    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_host(&self) -> String {
        self.host.clone()
    }
}

impl EmailClientSettings {
    pub fn get_sender(&self) -> Result<Mailbox, String> {
        let email = SubscriberEmail::parse(self.sender_email.clone())?;

        Ok(Mailbox::new(email, self.sender_name.clone()))
    }

    pub fn get_timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_milliseconds)
    }
}

impl MailerSettings {
    pub fn get_sender(&self) -> Result<Mailbox, String> {
        let email = SubscriberEmail::parse(self.hermes_sender_email.clone())?;

        Ok(Mailbox::new(email, self.hermes_sender_name.clone()))
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            unknown_env => Err(format!(
                "{} is not supported environment. Use either 'development' or 'production'.",
                unknown_env
            )),
        }
    }
}

fn default_mail_api_url() -> String {
    DEFAULT_MAIL_API_URL.to_string()
}

fn default_sender_email() -> String {
    DEFAULT_SENDER_EMAIL.to_string()
}

fn default_sender_name() -> String {
    DEFAULT_SENDER_NAME.to_string()
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let root_path = std::env::current_dir()
        .map_err(|err| ConfigError::Message(format!("Failed to determine the current directory: {}", err)))?;
    let config_directory = root_path.join("config");
    // Uses development environment by default
    let enviroment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let config_base_filepath = config_directory.join("base");
    let config_env_filepath = config_directory.join(enviroment.as_str());

    // It merges the base configuration file with the one from the specific environment (development or production)
    let settings = Config::builder()
        .add_source(File::from(config_base_filepath).required(true))
        .add_source(File::from(config_env_filepath).required(true))
        // Merge settings from environment variables with a prefix of APP and "__" separator
        // E.g APP_APPLICATION__PORT would set Settings.application.port
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .build()?;

    tracing::info!("Application environment = {:?}", enviroment);

    // Try to convert the value from the configuration file into a Settings type
    settings.try_deserialize()
}

/// Reads the `send` command settings. `HERMES_MAIL_TOKEN` is required, so this fails when the
/// token is neither exported nor present in a `.env` file, or when it is empty.
pub fn get_mailer_configuration() -> Result<MailerSettings, ConfigError> {
    dotenvy::dotenv().ok();

    mailer_settings_from(config::Environment::with_prefix("hermes"))
}

fn mailer_settings_from(environment: config::Environment) -> Result<MailerSettings, ConfigError> {
    Config::builder()
        // An empty variable counts as unset, so `HERMES_MAIL_TOKEN=` is a missing token
        .add_source(environment.keep_prefix(true).ignore_empty(true))
        .build()?
        .try_deserialize()
}
