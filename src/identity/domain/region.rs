//! Caller region used for content-policy decisions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Region codes in which unrestricted person generation is not offered.
const RESTRICTED_REGIONS: [&str; 10] = [
    "EU", "UK", "CH", "MENA", "SA", "AE", "QA", "KW", "OM", "BH",
];

/// Upper-cased region code reported for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRegion(String);

impl UserRegion {
    /// Normalizes a region code. Returns `None` for blank input.
    #[must_use]
    pub fn new(value: &str) -> Option<Self> {
        let normalized = value.trim();
        if normalized.is_empty() {
            return None;
        }
        Some(Self(normalized.to_ascii_uppercase()))
    }

    /// Returns the region code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `allow_all` person generation is forbidden in this region.
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        RESTRICTED_REGIONS.contains(&self.0.as_str())
    }
}

impl fmt::Display for UserRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
