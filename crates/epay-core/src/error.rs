//! # Error Types
//!
//! Typed error handling for the khalti-epay client.
//! Every public operation returns `Result<T, EpayError>`; nothing crosses the
//! public boundary as a panic.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// The `error_key` literal the gateway uses for field validation failures.
pub const VALIDATION_ERROR_KEY: &str = "validation_error";

/// Core error type for all gateway operations
#[derive(Debug, Error)]
pub enum EpayError {
    /// Configuration errors (missing secret, unknown environment)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request violates a local type-shape rule
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// DNS, TLS, timeout or connection failure talking to the gateway
    #[error("Network error: {0}")]
    Network(String),

    /// Gateway rejected the credential
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Structured validation error returned by the gateway
    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    /// Lookup for a pidx the gateway does not know
    #[error("Payment not found: {pidx}")]
    NotFound {
        pidx: String,
        detail: Option<String>,
    },

    /// Non-2xx response without a structured body
    #[error("Provider error [HTTP {status}]: {message}")]
    Provider { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Redirect callback data is missing or malformed
    #[error("Invalid callback: {0}")]
    Callback(String),
}

impl EpayError {
    /// Returns true if the caller may reasonably retry the call
    pub fn is_retryable(&self) -> bool {
        match self {
            EpayError::Network(_) => true,
            EpayError::Provider { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true for a structured validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, EpayError::Validation(_))
    }

    /// The validation payload, if this is a validation failure
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            EpayError::Validation(v) => Some(v),
            _ => None,
        }
    }
}

/// Result type alias for gateway operations
pub type EpayResult<T> = Result<T, EpayError>;

/// Field-keyed validation failure reported by the gateway.
///
/// The gateway answers a rejected request with a flat JSON object:
///
/// ```json
/// { "return_url": ["Enter a valid URL."], "error_key": "validation_error" }
/// ```
///
/// Every key other than `error_key`, `detail` and `status_code` is treated as
/// an offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub error_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    /// Parse a gateway error body. Returns `None` unless the body is a JSON
    /// object carrying a string `error_key`.
    pub fn from_body(body: &str) -> Option<Self> {
        let mut obj = match serde_json::from_str::<Value>(body).ok()? {
            Value::Object(map) => map,
            _ => return None,
        };

        let error_key = match obj.remove("error_key") {
            Some(Value::String(key)) => key,
            _ => return None,
        };

        let detail = match obj.remove("detail") {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };

        obj.remove("status_code");

        let fields = obj
            .into_iter()
            .map(|(field, value)| (field, messages(value)))
            .collect();

        Some(Self {
            error_key,
            detail,
            fields,
        })
    }

    /// True when the gateway tagged this as a field validation failure
    pub fn is_validation_error(&self) -> bool {
        self.error_key == VALIDATION_ERROR_KEY
    }

    /// Messages reported against one field
    pub fn messages_for(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when at least one field message is present
    pub fn has_field_messages(&self) -> bool {
        self.fields.values().any(|m| !m.is_empty())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error_key)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        for (field, msgs) in &self.fields {
            write!(f, "; {}: {}", field, msgs.join(" "))?;
        }
        Ok(())
    }
}

fn messages(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.into_iter().map(message).collect(),
        other => vec![message(other)],
    }
}

fn message(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
