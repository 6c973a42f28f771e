//! Typed identifiers for projects and calculations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ReportError, ReportResult};

/// Identifier of a project record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(Uuid);

impl ProjectId {
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an untrusted path segment.
    ///
    /// Anything that is not a UUID is a validation failure; callers must run
    /// this before touching the store or the cache.
    pub fn parse(raw: &str) -> ReportResult<Self> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|e| ReportError::invalid_id(e.to_string()))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ProjectId {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for ProjectId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Identifier of a calculation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalculationId(Uuid);

impl CalculationId {
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CalculationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl From<Uuid> for CalculationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_accepts_hyphenated_uuid() {
        let id = ProjectId::parse("12345678-1234-5678-9012-123456789012").unwrap();
        assert_eq!(id.to_string(), "12345678-1234-5678-9012-123456789012");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = ProjectId::parse("invalid-id").unwrap_err();
        assert!(matches!(err, ReportError::InvalidId { .. }));
        assert!(ProjectId::parse("").is_err());
        assert!(ProjectId::parse("test_project").is_err());
    }

    proptest! {
        #[test]
        fn prop_display_parse_is_stable(bytes in any::<[u8; 16]>()) {
            let id = ProjectId::new(Uuid::from_bytes(bytes));
            prop_assert_eq!(ProjectId::parse(&id.to_string()).unwrap(), id);
        }

        #[test]
        fn prop_non_hex_strings_never_parse(raw in "[g-z_ ]{1,40}") {
            prop_assert!(ProjectId::parse(&raw).is_err());
        }
    }
}
