//! # Khalti Configuration
//!
//! Environment selection and credentials for the Khalti ePayment API.
//! The secret is read from the environment and never printed.

use epay_core::{EpayError, EpayResult};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Sandbox API base
pub const SANDBOX_BASE_URL: &str = "https://dev.khalti.com/api/v2";

/// Production API base
pub const PRODUCTION_BASE_URL: &str = "https://a.khalti.com/api/v2";

/// Which gateway deployment to talk to. Always chosen explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    /// API base URL for this environment
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Sandbox => SANDBOX_BASE_URL,
            Environment::Production => PRODUCTION_BASE_URL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = EpayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "test" | "dev" => Ok(Environment::Sandbox),
            "production" | "prod" | "live" => Ok(Environment::Production),
            other => Err(EpayError::Configuration(format!(
                "unknown Khalti environment `{}` (expected sandbox or production)",
                other
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merchant secret key. `Debug` and `Display` are redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for building the auth header only
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(****)")
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// Khalti API configuration
#[derive(Debug, Clone)]
pub struct KhaltiConfig {
    /// Sandbox or production
    pub environment: Environment,

    /// Live or test secret key
    secret_key: SecretKey,

    /// API base URL (defaults to the environment's; override for testing/proxies)
    pub api_base_url: String,

    /// Transport timeout. None means the caller imposes one.
    pub timeout: Option<Duration>,
}

impl KhaltiConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `KHALTI_SECRET_KEY`
    /// - `KHALTI_ENVIRONMENT` (`sandbox` or `production`)
    ///
    /// Optional:
    /// - `KHALTI_API_BASE_URL`
    /// - `KHALTI_TIMEOUT_SECS`
    pub fn from_env() -> EpayResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> EpayResult<Self> {
        let secret_key = var("KHALTI_SECRET_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| EpayError::Configuration("KHALTI_SECRET_KEY not set".to_string()))?;

        let environment: Environment = var("KHALTI_ENVIRONMENT")
            .ok_or_else(|| EpayError::Configuration("KHALTI_ENVIRONMENT not set".to_string()))?
            .parse()?;

        let mut config = Self::new(environment, secret_key);

        if let Some(url) = var("KHALTI_API_BASE_URL").filter(|u| !u.trim().is_empty()) {
            config = config.with_api_base_url(url);
        }

        if let Some(raw) = var("KHALTI_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                EpayError::Configuration(format!(
                    "KHALTI_TIMEOUT_SECS must be a positive integer, got `{}`",
                    raw
                ))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Create config with explicit values
    pub fn new(environment: Environment, secret_key: impl Into<String>) -> Self {
        Self {
            environment,
            secret_key: SecretKey::new(secret_key),
            api_base_url: environment.base_url().to_string(),
            timeout: None,
        }
    }

    pub fn is_sandbox(&self) -> bool {
        self.environment == Environment::Sandbox
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Key {}", self.secret_key.expose())
    }

    /// Full URL for an API path such as `/epayment/initiate/`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set a transport timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
