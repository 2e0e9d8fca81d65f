use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::background::BackgroundTasks;
use crate::config::Settings;
use crate::email_client::EmailClient;
use crate::routes::{handle_submit, health_check};
use crate::store::{connect_store, SubscriberStore};

pub struct Application {
    pub port: u16,
    pub server: Server,
    pub background_tasks: BackgroundTasks,
}

/// The subscriber store bound to this application, if any.
pub struct SubscriberStoreHandle(Option<Arc<dyn SubscriberStore>>);

impl SubscriberStoreHandle {
    pub fn new(store: Option<Arc<dyn SubscriberStore>>) -> SubscriberStoreHandle {
        SubscriberStoreHandle(store)
    }

    pub fn get(&self) -> Option<&dyn SubscriberStore> {
        self.0.as_deref()
    }
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let store = match connect_store(config.database.as_ref()) {
            Some(store) => match store.migrate().await {
                Ok(()) => Some(store),
                Err(err) => {
                    tracing::error!("Failed to prepare the subscriber store: {:?}", err);
                    None
                }
            },
            None => None,
        };
        let sender = config
            .get_email_client_sender()
            .map_err(|err| anyhow::anyhow!("Sender email is not valid: {}", err))?;
        let email_client = EmailClient::new(
            config.email_client.base_url.clone(),
            sender,
            config.email_client.api_key.clone(),
            Some(config.email_client.get_timeout()),
        )?;
        let background_tasks = BackgroundTasks::current();

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            SubscriberStoreHandle::new(store),
            email_client,
            background_tasks.clone(),
        )?;

        tracing::info!("Server listening on {}", config.get_address());

        Ok(Self {
            port,
            server,
            background_tasks,
        })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// Serves until the server stops, then lets pending confirmation emails finish.
    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await?;
        self.background_tasks.wait_idle().await;

        Ok(())
    }
}

pub fn run(
    listener: TcpListener,
    store: SubscriberStoreHandle,
    email_client: EmailClient,
    background_tasks: BackgroundTasks,
) -> Result<Server, std::io::Error> {
    let store = web::Data::new(store);
    let email_client = web::Data::new(email_client);
    let background_tasks = web::Data::new(background_tasks);

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/submit", web::get().to(handle_submit))
            .app_data(store.clone())
            .app_data(email_client.clone())
            .app_data(background_tasks.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
