//! Correlation key generation.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque token binding a submitted request to its eventual result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    /// Wrap an already issued key, e.g. one read back from a poll or callback.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for CorrelationKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Source of fresh correlation keys.
///
/// Implementations must be unique with overwhelming probability for the
/// lifetime of the process and must never fail.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> CorrelationKey;
}

/// Random UUID v4 keys in their hyphenated form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidKeyGenerator;

impl KeyGenerator for UuidKeyGenerator {
    fn generate(&self) -> CorrelationKey {
        CorrelationKey(Uuid::new_v4().to_string())
    }
}
