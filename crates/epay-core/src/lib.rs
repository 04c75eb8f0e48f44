//! # epay-core
//!
//! Core types and traits for the khalti-epay payment client.
//!
//! This crate provides:
//! - `PaymentGateway` trait for gateway clients and test doubles
//! - `InitiatePaymentRequest` / `InitiatePaymentResponse` for starting a payment
//! - `PaymentLookup` and `PaymentStatus` for the status state machine
//! - `CallbackRedirect` for the data the hosted page sends back
//! - `attempt` for the log-once call wrapper
//! - `EpayError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use epay_core::{InitiatePaymentRequest, PaymentGateway, PaymentLookup};
//!
//! let request = InitiatePaymentRequest::new(
//!     "https://shop.example/return",
//!     "https://shop.example",
//!     1000,
//!     "PO1",
//!     "Order",
//! )
//! .with_merchant_field("merchant_ref", "X123")?;
//!
//! let started = gateway.initiate_payment(&request).await?;
//! // Redirect user to started.payment_url
//!
//! match gateway.lookup_payment(&started.pidx).await? {
//!     PaymentLookup::Completed { transaction_id, .. } => fulfill(transaction_id),
//!     other => hold(other.disposition()),
//! }
//! ```

pub mod attempt;
pub mod callback;
pub mod error;
pub mod gateway;
pub mod initiate;
pub mod lookup;
pub mod merchant;

// Re-exports for convenience
pub use attempt::attempt;
pub use callback::{CallbackRedirect, CallbackStatus};
pub use error::{EpayError, EpayResult, ValidationError, VALIDATION_ERROR_KEY};
pub use gateway::{BoxedPaymentGateway, PaymentGateway, Reconciliation};
pub use initiate::{
    AmountBreakdownItem, CustomerInfo, InitiatePaymentRequest, InitiatePaymentResponse,
    ProductDetail,
};
pub use lookup::{Disposition, LookupDetails, LookupResponse, PaymentLookup, PaymentStatus};
pub use merchant::{MerchantFields, MERCHANT_PREFIX};
