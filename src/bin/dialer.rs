use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::error;

use crm_dialer::{
    DialOutcome, DialRequest, Dialer, HttpTransport, MessageOptions, SendOutcome, TerminalBrowser,
};

#[derive(Parser)]
#[command(name = "dialer", about = "Place calls and send texts through the CRM")]
struct Cli {
    /// Base URL of the CRM server.
    #[arg(long, env = "DIALER_SERVER", default_value = "http://127.0.0.1:8787")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ring the given number from your desk phone.
    Dial { to_number: String },
    /// Text the given number.
    Send { to_number: String, message: String },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let dialer = Dialer::new(HttpTransport::new(&cli.server)?, TerminalBrowser);

    match cli.command {
        Command::Dial { to_number } => {
            match dialer.dial(DialRequest::new(to_number)).await? {
                DialOutcome::Connected => println!("Call in progress"),
                DialOutcome::Failed(_) => anyhow::bail!("call not placed"),
                DialOutcome::Redirected(_) => anyhow::bail!("call not placed; log in first"),
            }
        }
        Command::Send { to_number, message } => {
            let options = MessageOptions::new(
                to_number,
                message,
                || eprintln!("Sending..."),
                |reply| println!("{}", reply.unwrap_or_default()),
            );
            if let SendOutcome::Redirected(_) = dialer.send_message(options).await? {
                anyhow::bail!("message not sent; log in first");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::init_timed();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
