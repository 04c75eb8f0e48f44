//! # epay-cli
//!
//! Command-line front end for khalti-epay-rs.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `khalti initiate --amount <paisa> ...` | Start a payment, print `pidx` and `payment_url` |
//! | `khalti lookup <pidx>` | Print the payment's status and what to do with the order |
//! | `khalti callback <redirect-url>` | Parse a redirect and confirm it with a lookup |
//!
//! Credentials come from `KHALTI_SECRET_KEY` and `KHALTI_ENVIRONMENT`
//! (a `.env` file is honoured).

pub mod cli;
pub mod commands;

pub use cli::{Cli, Command};
