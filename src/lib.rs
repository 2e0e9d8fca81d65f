pub mod background;
pub mod bulk;
pub mod config;
pub mod domain;
pub mod email_client;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
