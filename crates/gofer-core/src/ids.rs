//! Strongly-typed identifiers for subscriptions and their owners.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest identifier the host hands out.
pub const MAX_ID_LENGTH: usize = 32;

/// Check `value` against the host's identifier rules.
pub fn validate_id(value: &str) -> Result<(), Error> {
    let invalid = |reason: &str| Error::InvalidIdentifier {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if value.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if value.len() > MAX_ID_LENGTH {
        return Err(invalid("too long"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(invalid("only alphanumerics, '_' and '-' are allowed"));
    }
    Ok(())
}

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Result<Self, Error> {
                let value = value.into();
                validate_id(&value)?;
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(NamespaceId);
define_id!(PipelineId);
define_id!(SubscriptionId);

/// Primary key of a subscription inside a registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionKey {
    pub namespace_id: NamespaceId,
    pub pipeline_id: PipelineId,
    pub subscription_id: SubscriptionId,
}

impl SubscriptionKey {
    pub fn new(
        namespace_id: NamespaceId,
        pipeline_id: PipelineId,
        subscription_id: SubscriptionId,
    ) -> Self {
        Self {
            namespace_id,
            pipeline_id,
            subscription_id,
        }
    }

    /// Build a key from raw strings, validating each part.
    pub fn parse(namespace_id: &str, pipeline_id: &str, subscription_id: &str) -> Result<Self, Error> {
        Ok(Self {
            namespace_id: namespace_id.parse()?,
            pipeline_id: pipeline_id.parse()?,
            subscription_id: subscription_id.parse()?,
        })
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.namespace_id, self.pipeline_id, self.subscription_id
        )
    }
}
