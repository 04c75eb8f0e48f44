//! # Commands
//!
//! Subcommand implementations. Each works against any `PaymentGateway`, so the
//! binary uses `KhaltiClient` and the tests use an in-process stub.

use crate::cli::InitiateArgs;
use epay_core::{
    CallbackRedirect, CustomerInfo, Disposition, EpayResult, InitiatePaymentRequest,
    InitiatePaymentResponse, PaymentGateway, PaymentLookup, Reconciliation,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Output of `khalti lookup`
#[derive(Debug, Serialize)]
pub struct LookupReport {
    pub lookup: PaymentLookup,
    pub disposition: Disposition,
    pub should_poll: bool,
}

/// Output of `khalti callback`
#[derive(Debug, Serialize)]
pub struct CallbackReport {
    #[serde(flatten)]
    pub reconciliation: Reconciliation,
    pub disposition: Disposition,
}

/// Turn CLI arguments into a request
pub fn build_request(args: InitiateArgs) -> EpayResult<InitiatePaymentRequest> {
    let order_id = args.order_id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut request = InitiatePaymentRequest::new(
        args.return_url,
        args.website_url,
        args.amount,
        order_id,
        args.order_name,
    );

    if let (Some(name), Some(email), Some(phone)) =
        (args.customer_name, args.customer_email, args.customer_phone)
    {
        request = request.with_customer(CustomerInfo::new(name, email, phone));
    }

    for (key, value) in args.merchant {
        request = request.with_merchant_field(key, value)?;
    }

    Ok(request)
}

pub async fn initiate(
    gateway: &dyn PaymentGateway,
    args: InitiateArgs,
) -> EpayResult<InitiatePaymentResponse> {
    let request = build_request(args)?;

    info!(
        "Starting payment via {}: order={}, amount={}",
        gateway.provider_name(),
        request.purchase_order_id,
        request.amount
    );

    gateway.initiate_payment(&request).await
}

pub async fn lookup(gateway: &dyn PaymentGateway, pidx: &str) -> EpayResult<LookupReport> {
    let lookup = gateway.lookup_payment(pidx).await?;
    let status = lookup.status();

    Ok(LookupReport {
        disposition: status.disposition(),
        should_poll: status.should_poll(),
        lookup,
    })
}

pub async fn callback(
    gateway: &dyn PaymentGateway,
    redirect_url: &str,
) -> EpayResult<CallbackReport> {
    let callback = CallbackRedirect::from_url(redirect_url)?;
    let reconciliation = gateway.reconcile_callback(&callback).await?;

    Ok(CallbackReport {
        disposition: reconciliation.lookup.disposition(),
        reconciliation,
    })
}
