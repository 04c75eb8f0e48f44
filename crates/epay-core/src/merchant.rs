//! # Merchant Extra Fields
//!
//! Open-ended `merchant_*` keys that ride along on an initiation request and
//! are echoed back verbatim on the response.

use crate::error::{EpayError, EpayResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Required prefix for every merchant extra field
pub const MERCHANT_PREFIX: &str = "merchant_";

/// Map of `merchant_*` keys to arbitrary JSON values.
///
/// Flattened into the surrounding record on the wire. On deserialization only
/// keys carrying the prefix are kept, so it can sit next to typed fields and
/// collect the echo without picking up unrelated keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MerchantFields(BTreeMap<String, Value>);

impl MerchantFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field. The key must start with `merchant_`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> EpayResult<()> {
        let key = key.into();
        if !is_merchant_key(&key) {
            return Err(EpayError::InvalidRequest(format!(
                "merchant field `{}` must start with `{}` followed by a name",
                key, MERCHANT_PREFIX
            )));
        }
        self.0.insert(key, value.into());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for MerchantFields {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut all = BTreeMap::<String, Value>::deserialize(deserializer)?;
        all.retain(|k, _| is_merchant_key(k));
        Ok(Self(all))
    }
}

/// A key is a merchant key when it has the prefix and a non-empty name after it
pub fn is_merchant_key(key: &str) -> bool {
    key.strip_prefix(MERCHANT_PREFIX)
        .is_some_and(|rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_requires_prefix() {
        let mut fields = MerchantFields::new();
        assert!(fields.insert("merchant_ref", "X123").is_ok());
        assert!(fields.insert("merchant_", "empty name").is_err());
        assert!(fields.insert("ref", "X123").is_err());

        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("merchant_ref"), Some(&json!("X123")));
    }

    #[test]
    fn test_deserialize_drops_unprefixed_keys() {
        let fields: MerchantFields = serde_json::from_value(json!({
            "merchant_ref": "X123",
            "merchant_extra": {"nested": true},
            "pidx": "abc"
        }))
        .unwrap();

        assert_eq!(fields.len(), 2);
        assert!(fields.get("pidx").is_none());
        assert_eq!(fields.get("merchant_extra"), Some(&json!({"nested": true})));
    }
}
