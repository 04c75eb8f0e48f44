//! # Command Line
//!
//! Argument definitions for the `khalti` binary.

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(author, version, about = "Khalti ePayment client", long_about = None)]
pub struct Cli {
    /// Transport timeout in seconds (overrides KHALTI_TIMEOUT_SECS)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a payment and print the hosted payment URL
    Initiate(InitiateArgs),

    /// Look up the authoritative status of a payment
    Lookup {
        /// Payment identifier returned by `initiate`
        pidx: String,
    },

    /// Parse a redirect URL and confirm it against a lookup
    Callback {
        /// Full URL the gateway redirected the user to
        redirect_url: String,
    },
}

#[derive(Debug, Args)]
pub struct InitiateArgs {
    /// Amount in paisa
    #[arg(long)]
    pub amount: i64,

    /// Merchant order id (a fresh UUID when omitted)
    #[arg(long)]
    pub order_id: Option<String>,

    #[arg(long)]
    pub order_name: String,

    #[arg(long)]
    pub return_url: String,

    #[arg(long)]
    pub website_url: String,

    #[arg(long, requires_all = ["customer_email", "customer_phone"])]
    pub customer_name: Option<String>,

    #[arg(long)]
    pub customer_email: Option<String>,

    #[arg(long)]
    pub customer_phone: Option<String>,

    /// Extra `merchant_*` field as KEY=VALUE (VALUE parsed as JSON when possible)
    #[arg(long = "merchant", value_parser = parse_merchant_field)]
    pub merchant: Vec<(String, Value)>,
}

/// Parse `KEY=VALUE`; a VALUE that is valid JSON keeps its type
pub fn parse_merchant_field(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", raw))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{}`", raw));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
