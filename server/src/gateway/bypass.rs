//! Explicit, audited bypass of the scope predicate.

use crate::error::{AuthzError, AuthzResult};

/// Marker that lets one gateway operation skip the scope predicate.
///
/// Consumed by the operation it is passed to. Every use is written to the
/// audit trail together with its reason and the requester.
#[derive(Debug, PartialEq, Eq)]
pub struct Bypass {
    reason: String,
}

impl Bypass {
    /// A bypass must say why it is needed.
    pub fn new(reason: impl Into<String>) -> AuthzResult<Self> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(AuthzError::ScopeViolation(
                "scope bypass requires a reason".into(),
            ));
        }
        Ok(Self { reason })
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_required() {
        assert!(matches!(Bypass::new("  "), Err(AuthzError::ScopeViolation(_))));
        assert_eq!(Bypass::new("nightly export").unwrap().reason(), "nightly export");
    }
}
