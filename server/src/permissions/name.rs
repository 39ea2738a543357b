//! Dotted permission names and the coverage test.
//!
//! Names look like `module.resource.action`. A name whose final segment is
//! `*` is a wildcard covering every name below its prefix. Hierarchy is read
//! from the name alone; there are no stored parent/child links.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wildcard segment.
pub const WILDCARD: &str = "*";

/// Reasons a permission name is rejected at write time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionNameError {
    #[error("Permission name must not be empty")]
    Empty,

    #[error("Permission name must not contain whitespace: {0:?}")]
    Whitespace(String),

    #[error("Permission name has an empty segment: {0:?}")]
    EmptySegment(String),

    #[error("Wildcard is only valid as the final segment: {0:?}")]
    MisplacedWildcard(String),

    #[error("Wildcard needs a non-empty prefix: {0:?}")]
    BareWildcard(String),
}

/// A validated permission name with its segments split once.
///
/// Catalog entries and role bindings hold this type so the coverage test
/// never re-splits strings on the hot path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionName {
    raw: String,
    segments: Vec<String>,
}

impl PermissionName {
    /// Parse and validate a dotted permission name.
    pub fn parse(raw: &str) -> Result<Self, PermissionNameError> {
        if raw.is_empty() {
            return Err(PermissionNameError::Empty);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(PermissionNameError::Whitespace(raw.to_string()));
        }

        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(PermissionNameError::EmptySegment(raw.to_string()));
        }

        let last = segments.len() - 1;
        for (i, segment) in segments.iter().enumerate() {
            if segment.contains('*') && (i != last || segment != WILDCARD) {
                return Err(PermissionNameError::MisplacedWildcard(raw.to_string()));
            }
        }
        if segments.len() == 1 && segments[0] == WILDCARD {
            return Err(PermissionNameError::BareWildcard(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The full dotted name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Dot-separated segments, wildcard included.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether the final segment is `*`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.segments.last().is_some_and(|s| s == WILDCARD)
    }

    /// Leading segment, used to group permissions by module.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.segments[0]
    }

    /// Whether this (granted) name covers `requested`.
    #[must_use]
    pub fn covers(&self, requested: &Self) -> bool {
        segments_cover(&self.segments, &requested.segments)
    }

    /// Whether this (granted) name covers a raw requested name.
    #[must_use]
    pub fn covers_str(&self, requested: &str) -> bool {
        let requested: Vec<&str> = requested.split('.').collect();
        segments_cover(&self.segments, &requested)
    }
}

fn segments_cover<G, R>(granted: &[G], requested: &[R]) -> bool
where
    G: AsRef<str>,
    R: AsRef<str>,
{
    match granted.split_last() {
        Some((last, prefix)) if last.as_ref() == WILDCARD => {
            requested.len() >= prefix.len()
                && prefix
                    .iter()
                    .zip(requested)
                    .all(|(g, r)| g.as_ref() == r.as_ref())
        }
        _ => {
            granted.len() == requested.len()
                && granted
                    .iter()
                    .zip(requested)
                    .all(|(g, r)| g.as_ref() == r.as_ref())
        }
    }
}

/// Coverage test over raw names.
///
/// `granted` covers `requested` when they are equal, or when `granted` ends in
/// a `*` segment and every segment before it matches the corresponding leading
/// segment of `requested`. Comparison is case-sensitive.
#[must_use]
pub fn covers(granted: &str, requested: &str) -> bool {
    let granted: Vec<&str> = granted.split('.').collect();
    let requested: Vec<&str> = requested.split('.').collect();
    segments_cover(&granted, &requested)
}

impl fmt::Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PermissionName {
    type Err = PermissionNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PermissionName {
    type Error = PermissionNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PermissionName> for String {
    fn from(name: PermissionName) -> Self {
        name.raw
    }
}

impl AsRef<str> for PermissionName {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}
