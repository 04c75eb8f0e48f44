//! # Redirect Callback Data
//!
//! Query parameters the hosted payment page appends to `return_url` once the
//! user completes or abandons the payment:
//!
//! ```text
//! http://example.com/?pidx=bZQLD9wRVWo4CdESSfuSsB
//!   &transaction_id=4H7AhoXDJWg5WjrcPT9ixW&tidx=4H7AhoXDJWg5WjrcPT9ixW
//!   &amount=1000&total_amount=1000&mobile=98XXXXX904&status=Completed
//!   &purchase_order_id=test12&purchase_order_name=test
//! ```
//!
//! This data is advisory. Always confirm through a lookup before fulfilling.

use crate::error::{EpayError, EpayResult};
use crate::lookup::PaymentStatus;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// Status reported by the hosted page (a subset of [`PaymentStatus`])
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum CallbackStatus {
    Completed,
    Pending,
    UserCanceled,
    /// Anything else the page may send in the future
    Unrecognized(String),
}

impl CallbackStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "Completed" => CallbackStatus::Completed,
            "Pending" => CallbackStatus::Pending,
            "UserCanceled" | "User canceled" | "User Canceled" => CallbackStatus::UserCanceled,
            other => CallbackStatus::Unrecognized(other.to_string()),
        }
    }

    /// The lookup status this callback claims
    pub fn as_payment_status(&self) -> PaymentStatus {
        match self {
            CallbackStatus::Completed => PaymentStatus::Completed,
            CallbackStatus::Pending => PaymentStatus::Pending,
            CallbackStatus::UserCanceled => PaymentStatus::UserCanceled,
            CallbackStatus::Unrecognized(s) => PaymentStatus::parse(s),
        }
    }
}

impl From<CallbackStatus> for String {
    fn from(status: CallbackStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for CallbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackStatus::Completed => f.write_str("Completed"),
            CallbackStatus::Pending => f.write_str("Pending"),
            CallbackStatus::UserCanceled => f.write_str("UserCanceled"),
            CallbackStatus::Unrecognized(s) => f.write_str(s),
        }
    }
}

/// Data delivered on the redirect back to the merchant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackRedirect {
    pub pidx: String,
    pub status: CallbackStatus,
    /// Blank on cancellation
    pub transaction_id: Option<String>,
    /// Duplicate of `transaction_id`
    pub tidx: Option<String>,
    /// Paisa
    pub amount: i64,
    /// Duplicate of `amount`
    pub total_amount: i64,
    /// Payer's wallet id; blank on cancellation
    pub mobile: Option<String>,
    pub purchase_order_id: String,
    pub purchase_order_name: String,
}

impl CallbackRedirect {
    /// Parse from the full redirect URL
    pub fn from_url(redirect: &str) -> EpayResult<Self> {
        let url = Url::parse(redirect)
            .map_err(|e| EpayError::Callback(format!("invalid redirect url: {}", e)))?;
        Self::from_query(url.query().unwrap_or(""))
    }

    /// Parse from a raw query string (with or without the leading `?`)
    pub fn from_query(query: &str) -> EpayResult<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut params: HashMap<String, String> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
        }

        let pidx = required(&params, "pidx")?;
        let status = CallbackStatus::parse(&required(&params, "status")?);

        let transaction_id = optional(&params, "transaction_id").or_else(|| optional(&params, "txnId"));
        let tidx = optional(&params, "tidx").or_else(|| transaction_id.clone());

        let amount = parse_amount(&params, "amount")?;
        let total_amount = parse_amount(&params, "total_amount")?;
        let (amount, total_amount) = match (amount, total_amount) {
            (Some(a), Some(t)) => (a, t),
            (Some(a), None) => (a, a),
            (None, Some(t)) => (t, t),
            (None, None) => {
                return Err(EpayError::Callback(
                    "missing `amount` and `total_amount`".to_string(),
                ))
            }
        };

        Ok(Self {
            pidx,
            status,
            transaction_id,
            tidx,
            amount,
            total_amount,
            mobile: optional(&params, "mobile"),
            purchase_order_id: required(&params, "purchase_order_id")?,
            purchase_order_name: required(&params, "purchase_order_name")?,
        })
    }
}

fn optional(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn required(params: &HashMap<String, String>, key: &str) -> EpayResult<String> {
    optional(params, key).ok_or_else(|| EpayError::Callback(format!("missing `{}`", key)))
}

fn parse_amount(params: &HashMap<String, String>, key: &str) -> EpayResult<Option<i64>> {
    optional(params, key)
        .map(|v| {
            v.parse::<i64>()
                .map_err(|_| EpayError::Callback(format!("`{}` is not an integer: {}", key, v)))
        })
        .transpose()
}
