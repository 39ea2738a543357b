//! Denial Response

use serde::{Deserialize, Serialize};

use super::scope::ScopeType;

/// Machine-readable code carried by every denial.
pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";

/// Body returned when an access requirement is not met.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenialResponse {
    /// Human-readable message.
    pub message: String,
    /// Always [`PERMISSION_DENIED`].
    pub code: String,
    /// `"<name> with scope <type>[ and id <id>]"`.
    pub required_permission: String,
}

impl DenialResponse {
    /// Build a denial naming the unmet requirement.
    #[must_use]
    pub fn new(permission: &str, scope_type: ScopeType, scope_id: Option<&str>) -> Self {
        Self {
            message: "You do not have permission to perform this action".to_string(),
            code: PERMISSION_DENIED.to_string(),
            required_permission: describe_requirement(permission, scope_type, scope_id),
        }
    }
}

/// Render a requirement as `"<name> with scope <type>[ and id <id>]"`.
#[must_use]
pub fn describe_requirement(permission: &str, scope_type: ScopeType, scope_id: Option<&str>) -> String {
    match scope_id {
        Some(id) => format!("{permission} with scope {scope_type} and id {id}"),
        None => format!("{permission} with scope {scope_type}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_without_id() {
        assert_eq!(
            describe_requirement("benefits.request.read", ScopeType::Global, None),
            "benefits.request.read with scope GLOBAL"
        );
    }

    #[test]
    fn test_describe_with_id() {
        assert_eq!(
            describe_requirement("benefits.request.approve", ScopeType::Unit, Some("unitA")),
            "benefits.request.approve with scope UNIT and id unitA"
        );
    }

    #[test]
    fn test_denial_serializes_camel_case() {
        let denial = DenialResponse::new("payments.*", ScopeType::SelfOnly, Some("u1"));
        let json = serde_json::to_value(&denial).unwrap();

        assert_eq!(json["code"], PERMISSION_DENIED);
        assert_eq!(json["requiredPermission"], "payments.* with scope SELF and id u1");
        assert!(json.get("message").is_some());
    }
}
