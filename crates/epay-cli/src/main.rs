//! # khalti
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export KHALTI_SECRET_KEY=...
//! export KHALTI_ENVIRONMENT=sandbox
//!
//! khalti initiate --amount 1000 --order-name "Order" \
//!     --return-url https://shop.example/return --website-url https://shop.example
//! khalti lookup bZQLD9wRVWo4CdESSfuSsB
//! ```
//!
//! Results are printed as JSON on stdout; logs go to stderr.

use anyhow::Context;
use clap::Parser;
use epay_cli::{commands, Cli, Command};
use epay_core::EpayError;
use epay_khalti::{KhaltiClient, KhaltiConfig};
use serde::Serialize;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit code when the gateway rejected the request with field messages
const EXIT_VALIDATION: u8 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    let mut config = KhaltiConfig::from_env().context("Failed to load Khalti configuration")?;
    if let Some(secs) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    debug!("Environment: {}", config.environment);

    let client = KhaltiClient::new(config)?;

    match run(&client, cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => match err.downcast_ref::<EpayError>() {
            Some(EpayError::Validation(validation)) => {
                eprintln!("{}", serde_json::to_string_pretty(validation)?);
                Ok(ExitCode::from(EXIT_VALIDATION))
            }
            _ => Err(err),
        },
    }
}

async fn run(client: &KhaltiClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Initiate(args) => print_json(&commands::initiate(client, args).await?),
        Command::Lookup { pidx } => print_json(&commands::lookup(client, &pidx).await?),
        Command::Callback { redirect_url } => {
            print_json(&commands::callback(client, &redirect_url).await?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
