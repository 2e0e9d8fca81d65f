use anyhow::Context;

use camp_mailer::config::get_configuration;
use camp_mailer::startup::Application;
use camp_mailer::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber(
        String::from("camp_mailer"),
        String::from("info"),
        std::io::stdout,
    );

    init_subscriber(subscriber)?;

    let config = get_configuration().context("Missing configuration file.")?;
    let application = Application::build(config)
        .await
        .context("Failed to build application.")?;

    application.run_until_stop().await?;

    Ok(())
}
