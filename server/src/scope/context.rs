//! The per-operation scope descriptor.

use scopegate_common::ScopeType;
use serde::{Serialize, Serializer};

/// Immutable scope of one inbound operation.
///
/// Each variant carries exactly the ids that scope needs, so a UNIT context
/// without a unit id cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeContext {
    /// No principal.
    Anonymous,
    /// Authenticated principal with unrestricted scope.
    Global { user_id: String },
    /// Principal confined to one organizational unit.
    Unit { user_id: String, unit_id: String },
    /// Principal confined to its own records.
    SelfOnly { user_id: String },
}

impl ScopeContext {
    #[must_use]
    pub const fn scope_type(&self) -> ScopeType {
        match self {
            Self::Anonymous | Self::Global { .. } => ScopeType::Global,
            Self::Unit { .. } => ScopeType::Unit,
            Self::SelfOnly { .. } => ScopeType::SelfOnly,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Global { user_id } | Self::Unit { user_id, .. } | Self::SelfOnly { user_id } => {
                Some(user_id)
            }
        }
    }

    #[must_use]
    pub fn unit_id(&self) -> Option<&str> {
        match self {
            Self::Unit { unit_id, .. } => Some(unit_id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

/// Wire form `{type, userId, unitId}`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScopeContextView<'a> {
    #[serde(rename = "type")]
    scope_type: ScopeType,
    user_id: Option<&'a str>,
    unit_id: Option<&'a str>,
}

impl Serialize for ScopeContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ScopeContextView {
            scope_type: self.scope_type(),
            user_id: self.user_id(),
            unit_id: self.unit_id(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        let ctx = ScopeContext::Unit {
            user_id: "u2".into(),
            unit_id: "unitA".into(),
        };
        assert_eq!(ctx.scope_type(), ScopeType::Unit);
        assert_eq!(ctx.user_id(), Some("u2"));
        assert_eq!(ctx.unit_id(), Some("unitA"));

        assert_eq!(ScopeContext::Anonymous.scope_type(), ScopeType::Global);
        assert_eq!(ScopeContext::Anonymous.user_id(), None);
        assert!(ScopeContext::Anonymous.is_anonymous());
    }

    #[test]
    fn test_wire_form() {
        let ctx = ScopeContext::SelfOnly { user_id: "u1".into() };
        assert_eq!(
            serde_json::to_value(&ctx).unwrap(),
            json!({"type": "SELF", "userId": "u1", "unitId": null})
        );

        assert_eq!(
            serde_json::to_value(ScopeContext::Anonymous).unwrap(),
            json!({"type": "GLOBAL", "userId": null, "unitId": null})
        );
    }
}
