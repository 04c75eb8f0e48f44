//! # Payment Gateway Trait
//!
//! The seam between merchant code and a concrete gateway client.
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │          PaymentGateway (trait)            │
//! │  ├── initiate_payment()                    │
//! │  ├── lookup_payment()                      │
//! │  └── reconcile_callback()  (provided)      │
//! └────────────────────────────────────────────┘
//!                      ▲
//!          ┌───────────┴───────────┐
//!  ┌───────┴───────┐       ┌───────┴───────┐
//!  │ KhaltiClient  │       │  test doubles │
//!  └───────────────┘       └───────────────┘
//! ```

use crate::callback::CallbackRedirect;
use crate::error::EpayResult;
use crate::initiate::{InitiatePaymentRequest, InitiatePaymentResponse};
use crate::lookup::PaymentLookup;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Operations offered by a payment gateway client.
///
/// Implementations hold only immutable configuration, so a single value can
/// be shared across tasks and called concurrently.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Submit a new payment and get the hosted-page URL back.
    ///
    /// A rejected request comes back as `EpayError::Validation` carrying the
    /// gateway's field messages.
    async fn initiate_payment(
        &self,
        request: &InitiatePaymentRequest,
    ) -> EpayResult<InitiatePaymentResponse>;

    /// Fetch the authoritative status of a payment. Read-only and idempotent.
    async fn lookup_payment(&self, pidx: &str) -> EpayResult<PaymentLookup>;

    /// Gateway name (for logging)
    fn provider_name(&self) -> &'static str;

    /// Confirm a redirect callback against a fresh lookup.
    async fn reconcile_callback(&self, callback: &CallbackRedirect) -> EpayResult<Reconciliation> {
        let lookup = self.lookup_payment(&callback.pidx).await?;
        let reconciliation = Reconciliation::new(callback.clone(), lookup);

        if reconciliation.agrees() {
            info!(
                "Callback for {} confirmed: status={}",
                callback.pidx,
                reconciliation.lookup.status()
            );
        } else {
            warn!(
                "Callback for {} disagrees with lookup: callback status={} amount={}, lookup status={} amount={}",
                callback.pidx,
                callback.status,
                callback.total_amount,
                reconciliation.lookup.status(),
                reconciliation.lookup.details().total_amount
            );
        }

        Ok(reconciliation)
    }
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;

/// A redirect callback checked against the gateway's own record
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    /// What the redirect claimed
    pub callback: CallbackRedirect,
    /// What the gateway says (authoritative)
    pub lookup: PaymentLookup,
    pub status_agrees: bool,
    pub amount_agrees: bool,
}

impl Reconciliation {
    pub fn new(callback: CallbackRedirect, lookup: PaymentLookup) -> Self {
        let status_agrees = callback.status.as_payment_status() == lookup.status();
        let amount_agrees = callback.total_amount == lookup.details().total_amount;

        Self {
            callback,
            lookup,
            status_agrees,
            amount_agrees,
        }
    }

    /// Callback and lookup tell the same story
    pub fn agrees(&self) -> bool {
        self.status_agrees && self.amount_agrees
    }

    /// Decided by the lookup alone; the callback never authorizes delivery
    pub fn is_fulfillable(&self) -> bool {
        self.lookup.is_fulfillable()
    }
}
