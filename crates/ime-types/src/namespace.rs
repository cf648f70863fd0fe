//! Placeholder namespaces
//!
//! Template placeholders are written `{{namespace.key}}`. The namespace
//! decides where the value comes from at render time.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Examiner profile values and signature
    Examiner,
    /// Per-contract values (dates, claim numbers, ...)
    Contract,
    /// Organization defaults
    Thrive,
    /// Legacy name for `Thrive`, read only when `thrive` is absent
    Org,
    /// Fee-structure variables as seen by templates
    Fees,
    /// Per-contract fee values stored in field values
    FeesOverrides,
}

impl Namespace {
    /// Namespaces stored in `FieldValues`, in merge order
    pub const STORED: [Namespace; 5] = [
        Namespace::Examiner,
        Namespace::Contract,
        Namespace::Thrive,
        Namespace::Org,
        Namespace::FeesOverrides,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Examiner => "examiner",
            Self::Contract => "contract",
            Self::Thrive => "thrive",
            Self::Org => "org",
            Self::Fees => "fees",
            Self::FeesOverrides => "fees_overrides",
        }
    }

    /// Fully-qualified placeholder name for a key in this namespace
    pub fn qualify(&self, key: &str) -> String {
        format!("{}.{}", self.as_str(), key)
    }
}

impl FromStr for Namespace {
    type Err = NamespaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "examiner" => Ok(Self::Examiner),
            "contract" => Ok(Self::Contract),
            "thrive" => Ok(Self::Thrive),
            "org" => Ok(Self::Org),
            "fees" => Ok(Self::Fees),
            "fees_overrides" => Ok(Self::FeesOverrides),
            _ => Err(NamespaceError::Unknown(s.to_string())),
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NamespaceError {
    #[error("Unknown namespace: {0}")]
    Unknown(String),
}
