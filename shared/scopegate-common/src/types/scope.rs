//! Scope Types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Breadth of data an operation may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeType {
    /// Unrestricted.
    #[serde(rename = "GLOBAL")]
    Global,
    /// One organizational unit.
    #[serde(rename = "UNIT")]
    Unit,
    /// Only the acting principal's own records.
    #[serde(rename = "SELF")]
    SelfOnly,
}

impl ScopeType {
    /// Wire tag for this scope.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "GLOBAL",
            Self::Unit => "UNIT",
            Self::SelfOnly => "SELF",
        }
    }

    /// Returns all scope types, broadest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Global, Self::Unit, Self::SelfOnly]
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeType {
    type Err = Error;

    /// Tags are matched case-insensitively; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GLOBAL" => Ok(Self::Global),
            "UNIT" => Ok(Self::Unit),
            "SELF" => Ok(Self::SelfOnly),
            _ => Err(Error::InvalidScopeType(s.to_string())),
        }
    }
}

impl TryFrom<String> for ScopeType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
