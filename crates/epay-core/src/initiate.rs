//! # Payment Initiation Types
//!
//! Request and response shapes for `POST /epayment/initiate/`.
//! All amounts are in paisa (1/100 of a rupee).

use crate::error::{EpayError, EpayResult};
use crate::merchant::MerchantFields;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Customer billing information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl CustomerInfo {
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }
}

/// A single labelled charge inside the total (tax, delivery, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountBreakdownItem {
    pub label: String,
    /// Amount in paisa
    pub amount: i64,
}

/// A product included in the transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    /// Merchant's product identifier
    pub identity: String,
    pub name: String,
    /// Total for this line (paisa)
    pub total_price: i64,
    pub quantity: u32,
    /// Price per unit (paisa)
    pub unit_price: i64,
}

impl ProductDetail {
    /// Create a product line, deriving `total_price` from unit price and quantity.
    /// A product that overflows saturates, which `is_consistent` then rejects.
    pub fn new(
        identity: impl Into<String>,
        name: impl Into<String>,
        unit_price: i64,
        quantity: u32,
    ) -> Self {
        Self {
            identity: identity.into(),
            name: name.into(),
            total_price: unit_price.saturating_mul(quantity as i64),
            quantity,
            unit_price,
        }
    }

    /// `unit_price * quantity == total_price`
    pub fn is_consistent(&self) -> bool {
        self.unit_price
            .checked_mul(self.quantity as i64)
            .is_some_and(|total| total == self.total_price)
    }
}

/// Payload for initiating a payment.
///
/// The gateway validates every field itself; the only local checks are the
/// ones the type system can express (e.g. the `merchant_` key prefix).
/// The `breakdown_*` and `products_consistent` helpers let callers check
/// their own conventions before submitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiatePaymentRequest {
    /// Where the gateway redirects the user after the attempt
    pub return_url: String,

    /// Merchant website
    pub website_url: String,

    /// Total amount in paisa
    pub amount: i64,

    /// Merchant-unique order identifier
    pub purchase_order_id: String,

    pub purchase_order_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_info: Option<CustomerInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_breakdown: Option<Vec<AmountBreakdownItem>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_details: Option<Vec<ProductDetail>>,

    /// `merchant_*` pass-through fields
    #[serde(flatten)]
    pub merchant: MerchantFields,
}

impl InitiatePaymentRequest {
    pub fn new(
        return_url: impl Into<String>,
        website_url: impl Into<String>,
        amount: i64,
        purchase_order_id: impl Into<String>,
        purchase_order_name: impl Into<String>,
    ) -> Self {
        Self {
            return_url: return_url.into(),
            website_url: website_url.into(),
            amount,
            purchase_order_id: purchase_order_id.into(),
            purchase_order_name: purchase_order_name.into(),
            customer_info: None,
            amount_breakdown: None,
            product_details: None,
            merchant: MerchantFields::new(),
        }
    }

    /// Set customer billing info
    pub fn with_customer(mut self, customer: CustomerInfo) -> Self {
        self.customer_info = Some(customer);
        self
    }

    /// Append a breakdown line
    pub fn with_breakdown_item(mut self, label: impl Into<String>, amount: i64) -> Self {
        self.amount_breakdown
            .get_or_insert_with(Vec::new)
            .push(AmountBreakdownItem {
                label: label.into(),
                amount,
            });
        self
    }

    /// Append a product line
    pub fn with_product(mut self, product: ProductDetail) -> Self {
        self.product_details.get_or_insert_with(Vec::new).push(product);
        self
    }

    /// Add a `merchant_*` field. Fails if the key lacks the prefix.
    pub fn with_merchant_field(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> EpayResult<Self> {
        self.merchant.insert(key, value)?;
        Ok(self)
    }

    /// Sum of the breakdown lines, if any
    pub fn breakdown_total(&self) -> Option<i64> {
        self.amount_breakdown
            .as_ref()
            .map(|items| items.iter().map(|i| i.amount).sum())
    }

    /// True when there is no breakdown or it sums to `amount`
    pub fn breakdown_matches_amount(&self) -> bool {
        self.breakdown_total()
            .map_or(true, |total| total == self.amount)
    }

    /// True when every product line satisfies `unit_price * quantity == total_price`
    pub fn products_consistent(&self) -> bool {
        self.product_details
            .iter()
            .flatten()
            .all(ProductDetail::is_consistent)
    }
}

/// Successful initiation response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiatePaymentResponse {
    /// Payment identifier used for every later lookup
    pub pidx: String,

    /// Hosted payment page to redirect the user to
    pub payment_url: String,

    /// When the payment link lapses
    pub expires_at: DateTime<FixedOffset>,

    /// Seconds until expiry (informational duplicate of `expires_at`)
    pub expires_in: u64,

    /// `merchant_*` fields echoed from the request
    #[serde(flatten)]
    pub merchant: MerchantFields,
}

impl InitiatePaymentResponse {
    /// Reject a response that decoded but cannot be acted on
    pub fn ensure_actionable(self) -> EpayResult<Self> {
        if self.pidx.trim().is_empty() {
            return Err(EpayError::Decode(
                "initiation response has a blank pidx".to_string(),
            ));
        }
        if self.payment_url.trim().is_empty() {
            return Err(EpayError::Decode(format!(
                "initiation response for {} has a blank payment_url",
                self.pidx
            )));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> InitiatePaymentRequest {
        InitiatePaymentRequest::new("https://x/", "https://x/", 1000, "PO1", "Order")
    }

    #[test]
    fn test_minimal_request_omits_optional_fields() {
        let value = serde_json::to_value(minimal()).unwrap();

        assert_eq!(
            value,
            json!({
                "return_url": "https://x/",
                "website_url": "https://x/",
                "amount": 1000,
                "purchase_order_id": "PO1",
                "purchase_order_name": "Order"
            })
        );
    }

    #[test]
    fn test_merchant_fields_are_flattened() {
        let request = minimal()
            .with_merchant_field("merchant_ref", "X123")
            .unwrap()
            .with_merchant_field("merchant_extra", json!({"a": 1}))
            .unwrap();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["merchant_ref"], "X123");
        assert_eq!(value["merchant_extra"]["a"], 1);
        assert!(value.get("merchant").is_none());
    }

    #[test]
    fn test_unprefixed_merchant_field_rejected() {
        let err = minimal().with_merchant_field("ref", "X123").unwrap_err();
        assert!(matches!(err, crate::EpayError::InvalidRequest(_)));
    }

    #[test]
    fn test_breakdown_and_products() {
        let request = minimal()
            .with_breakdown_item("Mark Price", 900)
            .with_breakdown_item("VAT", 100)
            .with_product(ProductDetail::new("p1", "Widget", 500, 2))
            .with_customer(CustomerInfo::new("Ram", "ram@example.com", "9800000001"));

        assert_eq!(request.breakdown_total(), Some(1000));
        assert!(request.breakdown_matches_amount());
        assert!(request.products_consistent());

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["amount_breakdown"][1]["label"], "VAT");
        assert_eq!(value["product_details"][0]["total_price"], 1000);
        assert_eq!(value["customer_info"]["phone"], "9800000001");
    }

    #[test]
    fn test_inconsistent_conventions_detected() {
        let mut product = ProductDetail::new("p1", "Widget", 500, 2);
        product.total_price = 999;

        let request = minimal().with_breakdown_item("Mark Price", 10).with_product(product);

        assert!(!request.breakdown_matches_amount());
        assert!(!request.products_consistent());
        assert!(minimal().breakdown_matches_amount());
    }

    #[test]
    fn test_decode_response_with_echo() {
        let response: InitiatePaymentResponse = serde_json::from_value(json!({
            "pidx": "bZQLD9wRVWo4CdESSfuSsB",
            "payment_url": "https://test-pay.khalti.com/?pidx=bZQLD9wRVWo4CdESSfuSsB",
            "expires_at": "2023-05-25T16:26:16.471649+05:45",
            "expires_in": 1800,
            "merchant_ref": "X123",
            "unrelated": true
        }))
        .unwrap();

        assert_eq!(response.pidx, "bZQLD9wRVWo4CdESSfuSsB");
        assert_eq!(response.expires_in, 1800);
        assert_eq!(response.merchant.get("merchant_ref"), Some(&json!("X123")));
        assert_eq!(response.merchant.len(), 1);
    }

    #[test]
    fn test_overflowing_product_is_inconsistent_not_a_panic() {
        let product = ProductDetail::new("p1", "Bulk", i64::MAX, 3);

        assert_eq!(product.total_price, i64::MAX);
        assert!(!product.is_consistent());
    }

    #[test]
    fn test_blank_identifiers_are_not_actionable() {
        let response = |pidx: &str, url: &str| InitiatePaymentResponse {
            pidx: pidx.to_string(),
            payment_url: url.to_string(),
            expires_at: "2023-05-25T16:26:16+05:45".parse().unwrap(),
            expires_in: 1800,
            merchant: MerchantFields::new(),
        };

        assert!(response("p1", "https://test-pay.khalti.com/?pidx=p1")
            .ensure_actionable()
            .is_ok());
        assert!(matches!(
            response("", "https://test-pay.khalti.com/").ensure_actionable(),
            Err(EpayError::Decode(_))
        ));
        assert!(matches!(
            response("p1", " ").ensure_actionable(),
            Err(EpayError::Decode(_))
        ));
    }
}
