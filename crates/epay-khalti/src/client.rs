//! # Khalti ePayment Client
//!
//! Implementation of the Khalti ePayment v2 API:
//! - `POST /epayment/initiate/` starts a payment
//! - `GET /epayment/lookup?pidx=` reads its authoritative status

use crate::config::KhaltiConfig;
use async_trait::async_trait;
use epay_core::{
    attempt, EpayError, EpayResult, InitiatePaymentRequest, InitiatePaymentResponse,
    LookupResponse, PaymentGateway, PaymentLookup, ValidationError,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, instrument};

const INITIATE_PATH: &str = "/epayment/initiate/";
const LOOKUP_PATH: &str = "/epayment/lookup";

/// Longest slice of an unstructured error body kept in an error message
const MAX_BODY_IN_ERROR: usize = 512;

/// Khalti gateway client.
///
/// Build one per merchant credential and share it; cloning is cheap and the
/// value is never mutated after construction.
#[derive(Debug, Clone)]
pub struct KhaltiClient {
    config: KhaltiConfig,
    client: Client,
}

impl KhaltiClient {
    /// Create a client with its own HTTP transport
    pub fn new(config: KhaltiConfig) -> EpayResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| {
            EpayError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self { config, client })
    }

    /// Create a client on top of a caller-configured transport
    /// (timeouts, proxies, connection limits).
    pub fn with_http_client(config: KhaltiConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> EpayResult<Self> {
        let config = KhaltiConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &KhaltiConfig {
        &self.config
    }

    /// JSON content type plus the `Key` credential
    fn headers(&self) -> EpayResult<HeaderMap> {
        let mut auth = HeaderValue::from_str(&self.config.auth_header()).map_err(|_| {
            EpayError::Configuration("secret key contains invalid header characters".to_string())
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }

    async fn send_initiate(
        &self,
        request: &InitiatePaymentRequest,
    ) -> EpayResult<InitiatePaymentResponse> {
        let url = self.config.endpoint(INITIATE_PATH);

        debug!(
            "Initiating Khalti payment: amount={}, merchant_fields={}, env={}",
            request.amount,
            request.merchant.len(),
            self.config.environment
        );

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let (status, body) = read_body(response).await?;

        if !status.is_success() {
            return Err(error_from_response(status, &body, None));
        }

        let started = decode::<InitiatePaymentResponse>(&body)?.ensure_actionable()?;

        info!(
            "Initiated Khalti payment: pidx={}, expires_in={}s",
            started.pidx, started.expires_in
        );

        Ok(started)
    }

    async fn send_lookup(&self, pidx: &str) -> EpayResult<PaymentLookup> {
        let url = self.config.endpoint(LOOKUP_PATH);

        debug!("Looking up Khalti payment: pidx={}", pidx);

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(&[("pidx", pidx)])
            .send()
            .await
            .map_err(transport_error)?;

        let (status, body) = read_body(response).await?;

        if !status.is_success() {
            return Err(error_from_response(status, &body, Some(pidx)));
        }

        // Decoded in two steps so shape errors keep their own message
        let lookup = PaymentLookup::try_from(decode::<LookupResponse>(&body)?)?;

        info!(
            "Khalti lookup: pidx={}, status={}, disposition={}",
            lookup.pidx(),
            lookup.status(),
            lookup.disposition()
        );

        Ok(lookup)
    }
}

#[async_trait]
impl PaymentGateway for KhaltiClient {
    #[instrument(
        skip(self, request),
        fields(purchase_order_id = %request.purchase_order_id, amount = request.amount)
    )]
    async fn initiate_payment(
        &self,
        request: &InitiatePaymentRequest,
    ) -> EpayResult<InitiatePaymentResponse> {
        attempt("initiate_payment", self.send_initiate(request)).await
    }

    #[instrument(skip(self))]
    async fn lookup_payment(&self, pidx: &str) -> EpayResult<PaymentLookup> {
        attempt("lookup_payment", self.send_lookup(pidx)).await
    }

    fn provider_name(&self) -> &'static str {
        "khalti"
    }
}

// =============================================================================
// Response handling
// =============================================================================

#[derive(Debug, Deserialize)]
struct DetailBody {
    #[serde(default)]
    detail: Option<String>,
}

fn transport_error(e: reqwest::Error) -> EpayError {
    if e.is_timeout() {
        EpayError::Network(format!("request timed out: {}", e))
    } else {
        EpayError::Network(e.to_string())
    }
}

async fn read_body(response: Response) -> EpayResult<(StatusCode, String)> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    Ok((status, body))
}

fn decode<T: DeserializeOwned>(body: &str) -> EpayResult<T> {
    serde_json::from_str(body)
        .map_err(|e| EpayError::Decode(format!("Failed to parse Khalti response: {}", e)))
}

fn detail_of(body: &str) -> Option<String> {
    serde_json::from_str::<DetailBody>(body)
        .ok()
        .and_then(|b| b.detail)
}

/// Map a non-2xx response onto the error taxonomy
fn error_from_response(status: StatusCode, body: &str, pidx: Option<&str>) -> EpayError {
    if status == StatusCode::NOT_FOUND {
        if let Some(pidx) = pidx {
            return EpayError::NotFound {
                pidx: pidx.to_string(),
                detail: detail_of(body),
            };
        }
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return EpayError::Unauthorized(
            detail_of(body).unwrap_or_else(|| format!("HTTP {}", status)),
        );
    }

    if let Some(structured) = ValidationError::from_body(body) {
        if structured.is_validation_error() {
            return EpayError::Validation(structured);
        }
        return EpayError::Provider {
            status: status.as_u16(),
            message: structured.to_string(),
        };
    }

    EpayError::Provider {
        status: status.as_u16(),
        message: detail_of(body).unwrap_or_else(|| truncate(body)),
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_IN_ERROR) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    #[test]
    fn test_headers_carry_key_credential() {
        let client = KhaltiClient::new(KhaltiConfig::new(Environment::Sandbox, "abc")).unwrap();
        let headers = client.headers().unwrap();

        assert_eq!(headers[AUTHORIZATION], "Key abc");
        assert!(headers[AUTHORIZATION].is_sensitive());
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_invalid_secret_is_configuration_error() {
        let client = KhaltiClient::new(KhaltiConfig::new(Environment::Sandbox, "bad\nkey")).unwrap();
        assert!(matches!(client.headers(), Err(EpayError::Configuration(_))));
    }

    #[test]
    fn test_not_found_only_for_lookup() {
        let body = r#"{"detail":"Not found.","error_key":"validation_error"}"#;

        match error_from_response(StatusCode::NOT_FOUND, body, Some("missing")) {
            EpayError::NotFound { pidx, detail } => {
                assert_eq!(pidx, "missing");
                assert_eq!(detail.as_deref(), Some("Not found."));
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert!(error_from_response(StatusCode::NOT_FOUND, body, None).is_validation());
    }

    #[test]
    fn test_unauthorized_mapping() {
        let err = error_from_response(
            StatusCode::UNAUTHORIZED,
            r#"{"detail":"Invalid token.","status_code":401}"#,
            None,
        );
        assert!(matches!(err, EpayError::Unauthorized(ref m) if m == "Invalid token."));
    }

    #[test]
    fn test_unstructured_body_is_provider_error() {
        let body = "x".repeat(2000);
        match error_from_response(StatusCode::BAD_GATEWAY, &body, None) {
            EpayError::Provider { status, message } => {
                assert_eq!(status, 502);
                assert!(message.len() < 600);
                assert!(message.ends_with("..."));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_other_error_keys_are_provider_errors() {
        let body = r#"{"detail":"Merchant is inactive.","error_key":"merchant_inactive"}"#;

        match error_from_response(StatusCode::BAD_REQUEST, body, None) {
            EpayError::Provider { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("merchant_inactive"));
                assert!(message.contains("Merchant is inactive."));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_decode_error_message_is_not_prefixed_twice() {
        let raw: LookupResponse = decode(
            r#"{"pidx":"p1","total_amount":1000,"status":"Completed","transaction_id":null}"#,
        )
        .unwrap();
        let err = PaymentLookup::try_from(raw).unwrap_err();

        let message = err.to_string();
        assert!(message.contains("no transaction_id"));
        assert_eq!(message.matches("Decode error").count(), 1);
        assert!(!message.contains("Failed to parse"));
    }

    #[test]
    fn test_provider_name() {
        let client = KhaltiClient::new(KhaltiConfig::new(Environment::Sandbox, "k")).unwrap();
        assert_eq!(client.provider_name(), "khalti");
    }
}
