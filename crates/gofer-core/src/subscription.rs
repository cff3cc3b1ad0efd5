//! Subscription records and their parameter maps.

use crate::ids::SubscriptionKey;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters a pipeline owner attached to a subscription.
///
/// Keys keep the casing the host sent; lookups compare upper-cased keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionParams(BTreeMap<String, String>);

impl SubscriptionParams {
    pub fn new(params: BTreeMap<String, String>) -> Self {
        Self(params)
    }

    /// Case-insensitive lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        let wanted = key.to_uppercase();
        self.0
            .iter()
            .find(|(k, _)| k.to_uppercase() == wanted)
            .map(|(_, v)| v.as_str())
    }

    /// Lookup that treats a missing or blank value as an error.
    pub fn require(&self, key: &str) -> Result<&str> {
        match self.get(key).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(Error::MissingParameter(key.to_string())),
        }
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SubscriptionParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A subscription as held by a registry.
///
/// `M` is the event source's parsed match state; `params` is kept verbatim
/// for debugging only.
#[derive(Debug, Clone)]
pub struct Subscription<M> {
    pub key: SubscriptionKey,
    pub matcher: M,
    pub params: SubscriptionParams,
}

impl<M> Subscription<M> {
    pub fn new(key: SubscriptionKey, matcher: M, params: SubscriptionParams) -> Self {
        Self {
            key,
            matcher,
            params,
        }
    }
}

/// A subscription as the host reports it during boot restoration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub namespace_id: String,
    pub pipeline_id: String,
    pub subscription_id: String,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}
