use reqwest::Response;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{migrate, Row, SqlitePool};
use std::str::FromStr;
use tempfile::TempDir;
use wiremock::MockServer;

use camp_mailer::{
    background::BackgroundTasks,
    config::{get_configuration, DatabaseBinding},
    routes::SubmitResponse,
    startup::Application,
};

pub struct TestApp {
    pub address: String,
    pub db_pool: SqlitePool,
    pub email_server: MockServer,
    pub background_tasks: BackgroundTasks,
    // Dropping the directory deletes the database file
    _db_directory: TempDir,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        Self::spawn(StoreSetup::Migrated).await
    }

    /// An application started without any database binding.
    pub async fn spawn_app_without_store() -> TestApp {
        Self::spawn(StoreSetup::None).await
    }

    /// An application whose database file does not exist yet.
    pub async fn spawn_app_with_fresh_database() -> TestApp {
        Self::spawn(StoreSetup::Fresh).await
    }

    async fn spawn(store_setup: StoreSetup) -> TestApp {
        let mut config = get_configuration().expect("Missing configuration file.");
        let email_server = MockServer::start().await;
        let db_directory = tempfile::tempdir().expect("Failed to create a temporary directory.");
        let db_url = format!(
            "sqlite://{}",
            db_directory.path().join("emails.db").display()
        );

        // We are using port 0 as way to define a different port per each test. Port 0 is a special case that operating systems
        // take into account: when port is 0, the OS will search for the first available port
        config.set_app_port(0);
        config.set_email_client_base_url(email_server.uri());

        match store_setup {
            StoreSetup::Migrated => {
                configure_db(&db_url).await;
                config.set_database(Some(DatabaseBinding::Sqlite {
                    url: db_url.clone(),
                    create_if_missing: false,
                }));
            }
            StoreSetup::Fresh => config.set_database(Some(DatabaseBinding::Sqlite {
                url: db_url.clone(),
                create_if_missing: true,
            })),
            StoreSetup::None => {
                configure_db(&db_url).await;
                config.set_database(None);
            }
        }

        let application = Application::build(config)
            .await
            .expect("Failed to build application.");

        // Opened after the application so a fresh database already exists
        let db_pool = SqlitePool::connect(&db_url)
            .await
            .expect("Failed to connect to the database.");

        let address = format!("http://127.0.0.1:{}", application.get_port());
        let background_tasks = application.background_tasks.clone();

        tokio::spawn(application.run_until_stop());

        TestApp {
            address,
            db_pool,
            email_server,
            background_tasks,
            _db_directory: db_directory,
        }
    }

    pub async fn get_submit(&self, email: Option<&str>) -> Response {
        self.get_submit_with_language(email, None).await
    }

    pub async fn get_submit_with_language(
        &self,
        email: Option<&str>,
        accept_language: Option<&str>,
    ) -> Response {
        let client = reqwest::Client::new();
        let mut request = client.get(format!("{}/submit", self.address));

        if let Some(email) = email {
            request = request.query(&[("email", email)]);
        }

        if let Some(accept_language) = accept_language {
            request = request.header("Accept-Language", accept_language);
        }

        request.send().await.expect("Failed to execute request.")
    }

    pub async fn submit(&self, email: Option<&str>) -> SubmitResponse {
        self.get_submit(email)
            .await
            .json()
            .await
            .expect("Failed to parse the submit response.")
    }

    /// Bodies of the requests the mail API received once detached sends have finished.
    pub async fn sent_emails(&self) -> Vec<serde_json::Value> {
        self.background_tasks.wait_idle().await;

        self.email_server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|request| serde_json::from_slice(&request.body).unwrap())
            .collect()
    }

    pub async fn stored_emails(&self) -> Vec<String> {
        sqlx::query("SELECT email FROM EMAILS ORDER BY date")
            .map(|row: sqlx::sqlite::SqliteRow| row.get("email"))
            .fetch_all(&self.db_pool)
            .await
            .expect("Failed to fetch saved subscribers.")
    }
}

enum StoreSetup {
    Migrated,
    Fresh,
    None,
}

async fn configure_db(db_url: &str) {
    let db_options = SqliteConnectOptions::from_str(db_url)
        .expect("Invalid database url.")
        .create_if_missing(true);

    let db_pool = SqlitePoolOptions::new()
        .connect_with(db_options)
        .await
        .expect("Failed to create database.");

    migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run migrations.");
}
