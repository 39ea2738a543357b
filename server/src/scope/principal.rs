//! Typed principal resolved from the authentication payload.

use scopegate_common::{PrincipalClaims, ScopeType};
use serde_json::Value;

use crate::error::{AuthzError, AuthzResult};

/// Authenticated actor, injected into request extensions.
///
/// Built once from [`PrincipalClaims`]; downstream code never inspects the
/// raw payload again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Principal id, coerced to string form.
    pub id: String,
    /// Role tags.
    pub roles: Vec<String>,
    /// Declared scope. `None` when absent or unrecognized.
    pub declared_scope: Option<ScopeType>,
    /// Owning unit, coerced to string form.
    pub unit_id: Option<String>,
}

impl Principal {
    /// Resolve a raw payload.
    ///
    /// A missing or non-scalar id makes the payload unusable. An unknown
    /// scope tag is kept as `None` and narrowed later by the scope resolver.
    pub fn from_claims(claims: &PrincipalClaims) -> AuthzResult<Self> {
        let id = claims
            .id
            .as_ref()
            .and_then(coerce_id)
            .ok_or_else(|| AuthzError::InvalidScopeContext("principal has no usable id".into()))?;

        let unit_id = match &claims.unit_id {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(value) => Some(coerce_id(value).ok_or_else(|| {
                AuthzError::InvalidScopeContext("principal unit id is not a scalar".into())
            })?),
        };

        let declared_scope = claims.scope.as_deref().and_then(|tag| match tag.parse() {
            Ok(scope) => Some(scope),
            Err(e) => {
                tracing::debug!(principal_id = %id, error = %e, "Ignoring unrecognized principal scope");
                None
            }
        });

        let roles = claims
            .roles
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            id,
            roles,
            declared_scope,
            unit_id,
        })
    }

    /// Whether the principal holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Coerce a scalar JSON id into its string form.
///
/// Blank strings, booleans, arrays and objects are not ids.
fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl<S> axum::extract::FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthzError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(AuthzError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> PrincipalClaims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_string_and_numeric_ids() {
        let p = Principal::from_claims(&claims(json!({"id": "u1"}))).unwrap();
        assert_eq!(p.id, "u1");

        let p = Principal::from_claims(&claims(json!({"id": 17, "unitId": 4}))).unwrap();
        assert_eq!(p.id, "17");
        assert_eq!(p.unit_id.as_deref(), Some("4"));
    }

    #[test]
    fn test_missing_id_is_invalid() {
        for payload in [json!({}), json!({"id": null}), json!({"id": ""}), json!({"id": true})] {
            let err = Principal::from_claims(&claims(payload)).unwrap_err();
            assert!(matches!(err, AuthzError::InvalidScopeContext(_)));
        }
    }

    #[test]
    fn test_non_scalar_unit_is_invalid() {
        let err = Principal::from_claims(&claims(json!({"id": "u1", "unitId": {"id": 1}}))).unwrap_err();
        assert!(matches!(err, AuthzError::InvalidScopeContext(_)));
    }

    #[test]
    fn test_blank_unit_is_absent() {
        let p = Principal::from_claims(&claims(json!({"id": "u1", "unitId": "  "}))).unwrap();
        assert_eq!(p.unit_id, None);
    }

    #[test]
    fn test_unrecognized_scope_is_none() {
        let p = Principal::from_claims(&claims(json!({"id": "u1", "scope": "TENANT"}))).unwrap();
        assert_eq!(p.declared_scope, None);

        let p = Principal::from_claims(&claims(json!({"id": "u1", "scope": "unit"}))).unwrap();
        assert_eq!(p.declared_scope, Some(ScopeType::Unit));
    }

    #[test]
    fn test_roles_trimmed() {
        let p = Principal::from_claims(&claims(json!({"id": "u1", "roles": [" clerk ", "", "manager"]})))
            .unwrap();
        assert_eq!(p.roles, vec!["clerk".to_string(), "manager".to_string()]);
        assert!(p.has_role("manager"));
        assert!(!p.has_role("auditor"));
    }
}
