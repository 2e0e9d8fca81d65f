use anyhow::Context;
use clap::Parser;

use camp_mailer::bulk::{run, BulkSendError, SendCommand, TerminalConfirm};
use camp_mailer::config::get_mailer_configuration;
use camp_mailer::email_client::EmailClient;
use camp_mailer::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr, stdout belongs to the operator
    let subscriber = get_subscriber(String::from("send"), String::from("warn"), std::io::stderr);

    init_subscriber(subscriber)?;

    let settings = get_mailer_configuration().context("HERMES_MAIL_TOKEN is not set")?;
    let command = SendCommand::parse();

    let sender = settings.get_sender().map_err(anyhow::Error::msg)?;
    let email_client = EmailClient::new(
        settings.hermes_base_url,
        sender,
        settings.hermes_mail_token,
        None,
    )?;

    let mut stdout = std::io::stdout();

    match run(&command, &email_client, &mut TerminalConfirm, &mut stdout).await {
        Ok(_) => Ok(()),
        Err(BulkSendError::MissingArguments) => {
            eprintln!("Missing arguments");
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}
