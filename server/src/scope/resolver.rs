//! Scope context resolution.
//!
//! Derives the [`ScopeContext`] of an operation from its principal and the
//! client's advisory unit hint. Pure: the same inputs always give the same
//! context, and it never fails. Inconsistent principals are narrowed, never
//! widened.

use scopegate_common::ScopeType;

use super::context::ScopeContext;
use super::principal::Principal;

/// Resolve the scope of an operation.
///
/// Rules, in priority order:
/// 1. No principal: anonymous, GLOBAL with no ids
/// 2. UNIT with its own unit id: that unit; the hint is ignored
/// 3. UNIT without a unit id: narrowed to SELF
/// 4. GLOBAL: global, or the hinted unit when a hint is present
/// 5. SELF, absent or unrecognized scope: SELF
#[must_use]
pub fn resolve_scope_context(principal: Option<&Principal>, unit_hint: Option<&str>) -> ScopeContext {
    let Some(principal) = principal else {
        return ScopeContext::Anonymous;
    };

    let user_id = principal.id.clone();
    let hint = unit_hint.map(str::trim).filter(|h| !h.is_empty());

    match (principal.declared_scope, principal.unit_id.as_deref()) {
        (Some(ScopeType::Unit), Some(unit_id)) => {
            if hint.is_some_and(|h| h != unit_id) {
                tracing::debug!(user_id = %user_id, unit_id, "Ignoring unit hint that differs from principal unit");
            }
            ScopeContext::Unit {
                user_id,
                unit_id: unit_id.to_string(),
            }
        }
        (Some(ScopeType::Unit), None) => {
            tracing::warn!(user_id = %user_id, "UNIT principal without unit id, narrowing to SELF");
            ScopeContext::SelfOnly { user_id }
        }
        (Some(ScopeType::Global), _) => match hint {
            Some(unit_id) => ScopeContext::Unit {
                user_id,
                unit_id: unit_id.to_string(),
            },
            None => ScopeContext::Global { user_id },
        },
        (Some(ScopeType::SelfOnly) | None, _) => ScopeContext::SelfOnly { user_id },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(id: &str, scope: Option<ScopeType>, unit_id: Option<&str>) -> Principal {
        Principal {
            id: id.to_string(),
            roles: Vec::new(),
            declared_scope: scope,
            unit_id: unit_id.map(str::to_string),
        }
    }

    #[test]
    fn test_no_principal_is_anonymous_global() {
        let ctx = resolve_scope_context(None, None);
        assert_eq!(ctx, ScopeContext::Anonymous);
        assert_eq!(ctx.scope_type(), ScopeType::Global);
        assert_eq!(ctx.user_id(), None);
        assert_eq!(ctx.unit_id(), None);

        // A hint alone never produces a unit scope.
        assert_eq!(resolve_scope_context(None, Some("unitB")), ScopeContext::Anonymous);
    }

    #[test]
    fn test_self_principal() {
        let p = principal("u1", Some(ScopeType::SelfOnly), None);
        assert_eq!(
            resolve_scope_context(Some(&p), None),
            ScopeContext::SelfOnly { user_id: "u1".into() }
        );
    }

    #[test]
    fn test_unit_principal_ignores_hint() {
        let p = principal("u2", Some(ScopeType::Unit), Some("unitA"));
        assert_eq!(
            resolve_scope_context(Some(&p), Some("unitB")),
            ScopeContext::Unit {
                user_id: "u2".into(),
                unit_id: "unitA".into()
            }
        );
    }

    #[test]
    fn test_unit_principal_without_unit_narrows_to_self() {
        let p = principal("u3", Some(ScopeType::Unit), None);
        assert_eq!(
            resolve_scope_context(Some(&p), None),
            ScopeContext::SelfOnly { user_id: "u3".into() }
        );
        // The hint cannot fill in the missing unit.
        assert_eq!(
            resolve_scope_context(Some(&p), Some("unitB")),
            ScopeContext::SelfOnly { user_id: "u3".into() }
        );
    }

    #[test]
    fn test_absent_scope_is_self_even_with_unit() {
        let p = principal("u4", None, Some("unitA"));
        assert_eq!(
            resolve_scope_context(Some(&p), Some("unitA")),
            ScopeContext::SelfOnly { user_id: "u4".into() }
        );
    }

    #[test]
    fn test_global_principal_narrowed_by_hint() {
        let p = principal("admin", Some(ScopeType::Global), None);
        assert_eq!(
            resolve_scope_context(Some(&p), None),
            ScopeContext::Global { user_id: "admin".into() }
        );
        assert_eq!(
            resolve_scope_context(Some(&p), Some(" unitC ")),
            ScopeContext::Unit {
                user_id: "admin".into(),
                unit_id: "unitC".into()
            }
        );
        assert_eq!(
            resolve_scope_context(Some(&p), Some("")),
            ScopeContext::Global { user_id: "admin".into() }
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let p = principal("u2", Some(ScopeType::Unit), Some("unitA"));
        let first = resolve_scope_context(Some(&p), Some("unitB"));
        for _ in 0..10 {
            assert_eq!(resolve_scope_context(Some(&p), Some("unitB")), first);
        }
    }
}
