//! # epay-khalti
//!
//! Khalti ePayment v2 gateway client for khalti-epay-rs.
//!
//! `KhaltiClient` implements [`epay_core::PaymentGateway`]:
//!
//! 1. **initiate_payment** - `POST /epayment/initiate/`
//!    - returns `pidx` and the hosted `payment_url`
//!    - rejected input comes back as `EpayError::Validation`
//!
//! 2. **lookup_payment** - `GET /epayment/lookup?pidx=`
//!    - returns a `PaymentLookup`; only `Completed` means "deliver"
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use epay_core::{InitiatePaymentRequest, PaymentGateway};
//! use epay_khalti::{Environment, KhaltiClient, KhaltiConfig};
//!
//! let client = KhaltiClient::new(KhaltiConfig::new(Environment::Sandbox, secret))?;
//!
//! let started = client
//!     .initiate_payment(&InitiatePaymentRequest::new(
//!         "https://shop.example/return",
//!         "https://shop.example",
//!         1000,
//!         "PO1",
//!         "Order",
//!     ))
//!     .await?;
//!
//! // Redirect user to started.payment_url
//! ```
//!
//! ## Handling the redirect
//!
//! ```rust,ignore
//! use epay_core::CallbackRedirect;
//!
//! let callback = CallbackRedirect::from_url(&redirect_url)?;
//! let reconciliation = client.reconcile_callback(&callback).await?;
//!
//! if reconciliation.is_fulfillable() {
//!     // Deliver the order
//! }
//! ```

pub mod client;
pub mod config;

// Re-exports
pub use client::KhaltiClient;
pub use config::{Environment, KhaltiConfig, SecretKey, PRODUCTION_BASE_URL, SANDBOX_BASE_URL};
