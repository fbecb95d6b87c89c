//! Feature kill-switches.
//!
//! Every public operation is gated on a per-kind feature key; governance
//! can switch off creation, execution or cancellation of any request kind
//! independently. A disabled feature is a fatal error at entry.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

/// A feature key such as `create:deposit` or `execute:order`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureKey(String);

impl FeatureKey {
    pub fn create(kind: &str) -> Self {
        Self(format!("create:{kind}"))
    }

    pub fn execute(kind: &str) -> Self {
        Self(format!("execute:{kind}"))
    }

    pub fn cancel(kind: &str) -> Self {
        Self(format!("cancel:{kind}"))
    }

    pub fn custom(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The set of disabled feature keys.
#[derive(Debug, Default)]
pub struct FeatureFlags {
    disabled: RwLock<HashSet<FeatureKey>>,
}

impl FeatureFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disable(&self, key: FeatureKey) {
        warn!(feature = %key, "Feature disabled");
        self.disabled.write().insert(key);
    }

    pub fn enable(&self, key: &FeatureKey) {
        self.disabled.write().remove(key);
    }

    pub fn is_disabled(&self, key: &FeatureKey) -> bool {
        self.disabled.read().contains(key)
    }
}
