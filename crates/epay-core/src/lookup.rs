//! # Payment Lookup Types
//!
//! Status state machine for `GET /epayment/lookup`.
//!
//! Only [`PaymentStatus::Completed`] authorizes delivering the service.
//! `Pending` and any status this crate does not recognize mean "hold and
//! reconcile manually"; they are neither success nor failure.
//!
//! ```text
//!             ┌──────────┐
//!             │Initiated │
//!             └────┬─────┘
//!        ┌─────────┼───────────┬─────────────┐
//!        ▼         ▼           ▼             ▼
//!   ┌────────┐ ┌─────────┐ ┌───────┐ ┌──────────────┐
//!   │Pending │ │Completed│ │Expired│ │ UserCanceled │
//!   └────────┘ └────┬────┘ └───────┘ └──────────────┘
//!                   ▼
//!        Refunded / PartiallyRefunded
//! ```

use crate::error::EpayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Status literal reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Initiated,
    Pending,
    Completed,
    Refunded,
    PartiallyRefunded,
    Expired,
    UserCanceled,
    /// A literal this crate does not know (passthrough)
    Unknown(String),
}

impl PaymentStatus {
    /// Parse a status literal. The gateway sometimes uses human-readable
    /// spellings ("User canceled", "Partially refunded"); both are accepted.
    pub fn parse(s: &str) -> Self {
        match s {
            "Initiated" => PaymentStatus::Initiated,
            "Pending" => PaymentStatus::Pending,
            "Completed" => PaymentStatus::Completed,
            "Refunded" => PaymentStatus::Refunded,
            "PartiallyRefunded" | "Partially refunded" | "Partially Refunded" => {
                PaymentStatus::PartiallyRefunded
            }
            "Expired" => PaymentStatus::Expired,
            "UserCanceled" | "User canceled" | "User Canceled" => PaymentStatus::UserCanceled,
            other => PaymentStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Initiated => "Initiated",
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Refunded => "Refunded",
            PaymentStatus::PartiallyRefunded => "PartiallyRefunded",
            PaymentStatus::Expired => "Expired",
            PaymentStatus::UserCanceled => "UserCanceled",
            PaymentStatus::Unknown(s) => s.as_str(),
        }
    }

    /// What the merchant should do with the order
    pub fn disposition(&self) -> Disposition {
        match self {
            PaymentStatus::Completed => Disposition::Fulfill,
            PaymentStatus::Pending | PaymentStatus::Unknown(_) => Disposition::Reconcile,
            PaymentStatus::Initiated
            | PaymentStatus::Refunded
            | PaymentStatus::PartiallyRefunded
            | PaymentStatus::Expired
            | PaymentStatus::UserCanceled => Disposition::Withhold,
        }
    }

    /// Only `Completed` authorizes delivery
    pub fn is_fulfillable(&self) -> bool {
        matches!(self, PaymentStatus::Completed)
    }

    /// Statuses that may still change; worth polling again under backoff
    pub fn should_poll(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Initiated | PaymentStatus::Pending | PaymentStatus::Unknown(_)
        )
    }
}

impl From<String> for PaymentStatus {
    fn from(s: String) -> Self {
        PaymentStatus::parse(&s)
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Unknown(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merchant-side action implied by a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Payment confirmed; deliver the service
    Fulfill,
    /// Do not deliver
    Withhold,
    /// Hold the order and reconcile with the gateway manually
    Reconcile,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Disposition::Fulfill => "fulfill",
            Disposition::Withhold => "withhold",
            Disposition::Reconcile => "reconcile",
        };
        f.write_str(s)
    }
}

/// Lookup response exactly as it appears on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResponse {
    pub pidx: String,
    /// Paisa
    pub total_amount: i64,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    /// Paisa
    #[serde(default)]
    pub fee: i64,
    #[serde(default)]
    pub refunded: bool,
}

/// Fields shared by every lookup outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupDetails {
    pub pidx: String,
    pub total_amount: i64,
    pub fee: i64,
    pub refunded: bool,
}

/// Decoded lookup result.
///
/// The transaction id is only present on the variants where the gateway
/// guarantees one, so it cannot be read without first matching the status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LookupResponse", into = "LookupResponse")]
pub enum PaymentLookup {
    /// Created, not yet attempted
    Initiated {
        details: LookupDetails,
        transaction_id: Option<String>,
    },
    /// Attempted, unresolved
    Pending { details: LookupDetails },
    /// Authoritative success
    Completed {
        details: LookupDetails,
        transaction_id: String,
    },
    Refunded {
        details: LookupDetails,
        transaction_id: String,
    },
    PartiallyRefunded {
        details: LookupDetails,
        transaction_id: String,
    },
    /// Link lapsed unused
    Expired { details: LookupDetails },
    /// User aborted at the hosted page
    UserCanceled { details: LookupDetails },
    /// Status literal newer than this crate
    Unrecognized {
        status: String,
        details: LookupDetails,
        transaction_id: Option<String>,
    },
}

impl PaymentLookup {
    pub fn details(&self) -> &LookupDetails {
        match self {
            PaymentLookup::Initiated { details, .. }
            | PaymentLookup::Pending { details }
            | PaymentLookup::Completed { details, .. }
            | PaymentLookup::Refunded { details, .. }
            | PaymentLookup::PartiallyRefunded { details, .. }
            | PaymentLookup::Expired { details }
            | PaymentLookup::UserCanceled { details }
            | PaymentLookup::Unrecognized { details, .. } => details,
        }
    }

    pub fn pidx(&self) -> &str {
        &self.details().pidx
    }

    pub fn status(&self) -> PaymentStatus {
        match self {
            PaymentLookup::Initiated { .. } => PaymentStatus::Initiated,
            PaymentLookup::Pending { .. } => PaymentStatus::Pending,
            PaymentLookup::Completed { .. } => PaymentStatus::Completed,
            PaymentLookup::Refunded { .. } => PaymentStatus::Refunded,
            PaymentLookup::PartiallyRefunded { .. } => PaymentStatus::PartiallyRefunded,
            PaymentLookup::Expired { .. } => PaymentStatus::Expired,
            PaymentLookup::UserCanceled { .. } => PaymentStatus::UserCanceled,
            PaymentLookup::Unrecognized { status, .. } => PaymentStatus::Unknown(status.clone()),
        }
    }

    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            PaymentLookup::Completed { transaction_id, .. }
            | PaymentLookup::Refunded { transaction_id, .. }
            | PaymentLookup::PartiallyRefunded { transaction_id, .. } => Some(transaction_id),
            PaymentLookup::Initiated { transaction_id, .. }
            | PaymentLookup::Unrecognized { transaction_id, .. } => transaction_id.as_deref(),
            PaymentLookup::Pending { .. }
            | PaymentLookup::Expired { .. }
            | PaymentLookup::UserCanceled { .. } => None,
        }
    }

    pub fn disposition(&self) -> Disposition {
        self.status().disposition()
    }

    pub fn is_fulfillable(&self) -> bool {
        matches!(self, PaymentLookup::Completed { .. })
    }
}

impl TryFrom<LookupResponse> for PaymentLookup {
    type Error = EpayError;

    fn try_from(raw: LookupResponse) -> Result<Self, Self::Error> {
        if raw.pidx.trim().is_empty() {
            return Err(EpayError::Decode(format!(
                "lookup with status {} has a blank pidx",
                raw.status
            )));
        }

        let transaction_id = raw.transaction_id.filter(|id| !id.trim().is_empty());
        let status = raw.status;
        let details = LookupDetails {
            pidx: raw.pidx,
            total_amount: raw.total_amount,
            fee: raw.fee,
            refunded: raw.refunded,
        };

        let lookup = match status {
            PaymentStatus::Initiated => PaymentLookup::Initiated {
                details,
                transaction_id,
            },
            PaymentStatus::Pending => {
                drop_stray(&status, &details, transaction_id);
                PaymentLookup::Pending { details }
            }
            PaymentStatus::Completed => PaymentLookup::Completed {
                transaction_id: require_present(&status, &details, transaction_id)?,
                details,
            },
            PaymentStatus::Refunded => PaymentLookup::Refunded {
                transaction_id: require_present(&status, &details, transaction_id)?,
                details,
            },
            PaymentStatus::PartiallyRefunded => PaymentLookup::PartiallyRefunded {
                transaction_id: require_present(&status, &details, transaction_id)?,
                details,
            },
            PaymentStatus::Expired => {
                drop_stray(&status, &details, transaction_id);
                PaymentLookup::Expired { details }
            }
            PaymentStatus::UserCanceled => {
                drop_stray(&status, &details, transaction_id);
                PaymentLookup::UserCanceled { details }
            }
            PaymentStatus::Unknown(status) => PaymentLookup::Unrecognized {
                status,
                details,
                transaction_id,
            },
        };

        Ok(lookup)
    }
}

impl From<PaymentLookup> for LookupResponse {
    fn from(lookup: PaymentLookup) -> Self {
        let status = lookup.status();
        let transaction_id = lookup.transaction_id().map(String::from);
        let details = lookup.details().clone();

        LookupResponse {
            pidx: details.pidx,
            total_amount: details.total_amount,
            status,
            transaction_id,
            fee: details.fee,
            refunded: details.refunded,
        }
    }
}

fn require_present(
    status: &PaymentStatus,
    details: &LookupDetails,
    transaction_id: Option<String>,
) -> Result<String, EpayError> {
    transaction_id.ok_or_else(|| {
        EpayError::Decode(format!(
            "lookup for {} has status {} but no transaction_id",
            details.pidx, status
        ))
    })
}

/// Unsettled statuses carry no transaction id. A stray one is logged and
/// discarded so the payment is still held rather than reported as an error.
fn drop_stray(status: &PaymentStatus, details: &LookupDetails, transaction_id: Option<String>) {
    if let Some(id) = transaction_id {
        warn!(
            "Ignoring transaction_id {} on {} lookup: pidx={}",
            id, status, details.pidx
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(status: &str, transaction_id: Option<&str>) -> Result<PaymentLookup, serde_json::Error> {
        serde_json::from_value(json!({
            "pidx": "HT6o6PEZRWFJ5ygavzHWd5",
            "total_amount": 1000,
            "status": status,
            "transaction_id": transaction_id,
            "fee": 0,
            "refunded": status == "Refunded"
        }))
    }

    #[test]
    fn test_completed_requires_transaction_id() {
        let lookup = decode("Completed", Some("GFq9PFS7b2iYvL8Lir9oXe")).unwrap();
        assert!(lookup.is_fulfillable());
        assert_eq!(lookup.transaction_id(), Some("GFq9PFS7b2iYvL8Lir9oXe"));
        assert_eq!(lookup.disposition(), Disposition::Fulfill);

        assert!(decode("Completed", None).is_err());
        assert!(decode("Completed", Some("")).is_err());
    }

    #[test]
    fn test_unsettled_statuses_have_no_transaction_id() {
        for status in ["Pending", "Expired", "UserCanceled"] {
            let lookup = decode(status, None).unwrap();
            assert_eq!(lookup.transaction_id(), None);
            assert!(!lookup.is_fulfillable());
        }
    }

    #[test]
    fn test_unsettled_status_with_stray_transaction_id_is_still_held() {
        let lookup = decode("Pending", Some("GFq9PFS7b2iYvL8Lir9oXe")).unwrap();

        assert!(matches!(lookup, PaymentLookup::Pending { .. }));
        assert_eq!(lookup.transaction_id(), None);
        assert_eq!(lookup.disposition(), Disposition::Reconcile);

        for status in ["Expired", "UserCanceled"] {
            let lookup = decode(status, Some("abc")).unwrap();
            assert_eq!(lookup.status().as_str(), status);
            assert_eq!(lookup.transaction_id(), None);
        }
    }

    #[test]
    fn test_blank_pidx_is_decode_error() {
        let raw = LookupResponse {
            pidx: " ".to_string(),
            total_amount: 1000,
            status: PaymentStatus::Pending,
            transaction_id: None,
            fee: 0,
            refunded: false,
        };

        assert!(matches!(PaymentLookup::try_from(raw), Err(EpayError::Decode(_))));
    }

    #[test]
    fn test_refunded_variants() {
        let lookup = decode("Refunded", Some("t1")).unwrap();
        assert!(matches!(lookup, PaymentLookup::Refunded { .. }));
        assert!(lookup.details().refunded);
        assert_eq!(lookup.disposition(), Disposition::Withhold);

        let lookup = decode("Partially refunded", Some("t2")).unwrap();
        assert_eq!(lookup.status(), PaymentStatus::PartiallyRefunded);
        assert!(!lookup.is_fulfillable());
    }

    #[test]
    fn test_initiated_accepts_either_transaction_id() {
        assert!(matches!(
            decode("Initiated", None).unwrap(),
            PaymentLookup::Initiated { transaction_id: None, .. }
        ));
        assert_eq!(decode("Initiated", Some("t")).unwrap().transaction_id(), Some("t"));
    }

    #[test]
    fn test_unknown_status_is_held_not_completed() {
        let lookup = decode("SomeFutureStatus", None).unwrap();

        match &lookup {
            PaymentLookup::Unrecognized { status, .. } => assert_eq!(status, "SomeFutureStatus"),
            other => panic!("expected Unrecognized, got {:?}", other),
        }
        assert!(!lookup.is_fulfillable());
        assert_eq!(lookup.disposition(), Disposition::Reconcile);
        assert!(lookup.status().should_poll());
    }

    #[test]
    fn test_human_readable_cancel_literal() {
        let lookup = decode("User canceled", None).unwrap();
        assert!(matches!(lookup, PaymentLookup::UserCanceled { .. }));
    }

    #[test]
    fn test_pending_is_reconcile() {
        assert_eq!(PaymentStatus::Pending.disposition(), Disposition::Reconcile);
        assert!(PaymentStatus::Pending.should_poll());
        assert!(!PaymentStatus::Expired.should_poll());
        assert_eq!(PaymentStatus::Expired.disposition(), Disposition::Withhold);
    }

    #[test]
    fn test_missing_fee_and_refunded_default() {
        let lookup: PaymentLookup = serde_json::from_value(json!({
            "pidx": "p",
            "total_amount": 500,
            "status": "Expired",
            "transaction_id": null
        }))
        .unwrap();

        assert_eq!(lookup.details().fee, 0);
        assert!(!lookup.details().refunded);
    }

    #[test]
    fn test_serializes_back_to_wire_shape() {
        let lookup = decode("Completed", Some("t1")).unwrap();
        let value = serde_json::to_value(&lookup).unwrap();

        assert_eq!(value["status"], "Completed");
        assert_eq!(value["transaction_id"], "t1");
        assert_eq!(value["total_amount"], 1000);
    }
}
