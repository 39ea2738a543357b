//! Permission resolution logic.
//!
//! Decides whether a requested permission is granted to a user, given the
//! user's role tags, their override rows and the role bindings.

use chrono::{DateTime, Utc};
use scopegate_common::ScopeType;
use serde::Serialize;
use uuid::Uuid;

use super::catalog::RoleBindings;
use super::models::UserPermissionOverride;
use super::name::PermissionName;
use crate::scope::ScopeContext;

/// Scope a permission is being requested at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestScope {
    pub scope_type: ScopeType,
    pub unit_id: Option<String>,
}

impl RequestScope {
    #[must_use]
    pub const fn global() -> Self {
        Self {
            scope_type: ScopeType::Global,
            unit_id: None,
        }
    }

    #[must_use]
    pub fn unit(unit_id: impl Into<String>) -> Self {
        Self {
            scope_type: ScopeType::Unit,
            unit_id: Some(unit_id.into()),
        }
    }

    #[must_use]
    pub const fn self_only() -> Self {
        Self {
            scope_type: ScopeType::SelfOnly,
            unit_id: None,
        }
    }

    /// Scope of an operation's context. Anonymous operations are GLOBAL.
    #[must_use]
    pub fn from_context(ctx: &ScopeContext) -> Self {
        match ctx {
            ScopeContext::Anonymous | ScopeContext::Global { .. } => Self::global(),
            ScopeContext::Unit { unit_id, .. } => Self::unit(unit_id.clone()),
            ScopeContext::SelfOnly { .. } => Self::self_only(),
        }
    }

    /// Whether an override row applies at this scope.
    ///
    /// Scope types must be equal; UNIT overrides also need the same unit id.
    #[must_use]
    pub fn admits(&self, ovr: &UserPermissionOverride) -> bool {
        if ovr.scope_type != self.scope_type {
            return false;
        }
        match self.scope_type {
            ScopeType::Unit => match (&ovr.scope_id, &self.unit_id) {
                (Some(ovr_unit), Some(unit)) => ovr_unit == unit,
                _ => false,
            },
            ScopeType::Global | ScopeType::SelfOnly => true,
        }
    }
}

/// Where a decision came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionSource {
    /// A user override decided.
    Override {
        override_id: Uuid,
        permission: String,
        exact: bool,
    },
    /// A role binding granted.
    Role { role: String, permission: String },
    /// Nothing applied; default deny.
    Default,
}

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub source: DecisionSource,
}

impl Decision {
    #[must_use]
    pub const fn deny() -> Self {
        Self {
            allowed: false,
            source: DecisionSource::Default,
        }
    }
}

/// Specificity rank of an override for a requested name.
///
/// Exact matches rank above every wildcard; a wildcard with a longer prefix
/// ranks above a shorter one.
fn specificity(granted: &PermissionName, requested: &PermissionName) -> (bool, usize) {
    if granted == requested {
        (true, granted.segments().len())
    } else {
        (false, granted.segments().len())
    }
}

/// Pick the override that decides `requested` at `scope`, if any.
///
/// Expired rows and rows at an incompatible scope are ignored. Among the
/// rest the most specific wins, then the most recently updated. Equal
/// timestamps resolve to the revoking row.
#[must_use]
pub fn select_override<'a>(
    requested: &PermissionName,
    scope: &RequestScope,
    overrides: &'a [UserPermissionOverride],
    now: DateTime<Utc>,
) -> Option<(&'a UserPermissionOverride, bool)> {
    overrides
        .iter()
        .filter(|ovr| !ovr.is_expired(now))
        .filter(|ovr| scope.admits(ovr))
        .filter_map(|ovr| {
            let granted = PermissionName::parse(&ovr.permission_name).ok()?;
            granted
                .covers(requested)
                .then(|| (ovr, specificity(&granted, requested)))
        })
        .max_by(|(a, a_rank), (b, b_rank)| {
            a_rank
                .cmp(b_rank)
                .then(a.updated_at.cmp(&b.updated_at))
                .then(b.granted.cmp(&a.granted))
                .then(a.id.cmp(&b.id))
        })
        .map(|(ovr, (exact, _))| (ovr, exact))
}

/// Resolve a permission for a user.
///
/// Resolution order:
/// 1. Applicable user override (most specific, then freshest) decides
/// 2. Otherwise any role binding covering the name grants
/// 3. Otherwise deny
#[must_use]
pub fn resolve_permission(
    requested: &PermissionName,
    scope: &RequestScope,
    roles: &[String],
    overrides: &[UserPermissionOverride],
    bindings: &RoleBindings,
    now: DateTime<Utc>,
) -> Decision {
    if let Some((ovr, exact)) = select_override(requested, scope, overrides, now) {
        return Decision {
            allowed: ovr.granted,
            source: DecisionSource::Override {
                override_id: ovr.id,
                permission: ovr.permission_name.clone(),
                exact,
            },
        };
    }

    if let Some((role, granted)) = bindings.find_covering(roles, requested) {
        return Decision {
            allowed: true,
            source: DecisionSource::Role {
                role: role.to_string(),
                permission: granted.to_string(),
            },
        };
    }

    Decision::deny()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::catalog::PermissionCatalog;
    use crate::permissions::models::{Permission, RolePermissionBinding};
    use chrono::Duration;

    fn permission(name: &str) -> Permission {
        let now = Utc::now();
        Permission {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            active: true,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn bindings(pairs: &[(&str, &str)]) -> RoleBindings {
        let permissions: Vec<Permission> = pairs.iter().map(|(_, name)| permission(name)).collect();
        let rows = pairs
            .iter()
            .zip(&permissions)
            .map(|((role, _), p)| RolePermissionBinding {
                role: (*role).to_string(),
                permission_id: p.id,
                permission_name: p.name.clone(),
            })
            .collect();
        let catalog = PermissionCatalog::from_permissions(permissions);
        RoleBindings::from_bindings(rows, &catalog)
    }

    fn ovr(name: &str, granted: bool, scope: RequestScope, age_secs: i64) -> UserPermissionOverride {
        let updated = Utc::now() - Duration::seconds(age_secs);
        UserPermissionOverride {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            permission_id: Uuid::new_v4(),
            permission_name: name.to_string(),
            granted,
            scope_type: scope.scope_type,
            scope_id: scope.unit_id,
            valid_until: None,
            created_by: None,
            updated_by: None,
            created_at: updated,
            updated_at: updated,
        }
    }

    fn name(raw: &str) -> PermissionName {
        PermissionName::parse(raw).unwrap()
    }

    fn roles(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| (*t).to_string()).collect()
    }

    #[test]
    fn test_role_grant() {
        let b = bindings(&[("clerk", "benefits.request.read")]);
        let d = resolve_permission(
            &name("benefits.request.read"),
            &RequestScope::global(),
            &roles(&["clerk"]),
            &[],
            &b,
            Utc::now(),
        );
        assert!(d.allowed);
        assert!(matches!(d.source, DecisionSource::Role { ref role, .. } if role == "clerk"));
    }

    #[test]
    fn test_role_wildcard_grant() {
        let b = bindings(&[("manager", "benefits.*")]);
        let d = resolve_permission(
            &name("benefits.payment.approve"),
            &RequestScope::global(),
            &roles(&["manager"]),
            &[],
            &b,
            Utc::now(),
        );
        assert!(d.allowed);
    }

    #[test]
    fn test_default_deny() {
        let b = bindings(&[("clerk", "benefits.request.read")]);
        let d = resolve_permission(
            &name("payments.read"),
            &RequestScope::global(),
            &roles(&["clerk"]),
            &[],
            &b,
            Utc::now(),
        );
        assert_eq!(d, Decision::deny());
    }

    #[test]
    fn test_revoke_override_beats_role_wildcard() {
        let b = bindings(&[("manager", "benefits.*")]);
        let overrides = [ovr("benefits.payment.approve", false, RequestScope::global(), 10)];

        let d = resolve_permission(
            &name("benefits.payment.approve"),
            &RequestScope::global(),
            &roles(&["manager"]),
            &overrides,
            &b,
            Utc::now(),
        );
        assert!(!d.allowed);
        assert!(matches!(d.source, DecisionSource::Override { exact: true, .. }));
    }

    #[test]
    fn test_grant_override_without_role() {
        let b = RoleBindings::default();
        let overrides = [ovr("payments.*", true, RequestScope::global(), 10)];

        let d = resolve_permission(
            &name("payments.batch.export"),
            &RequestScope::global(),
            &[],
            &overrides,
            &b,
            Utc::now(),
        );
        assert!(d.allowed);
        assert!(matches!(d.source, DecisionSource::Override { exact: false, .. }));
    }

    #[test]
    fn test_exact_override_beats_fresher_wildcard() {
        let overrides = [
            ovr("payments.read", true, RequestScope::global(), 100),
            ovr("payments.*", false, RequestScope::global(), 1),
        ];

        let d = resolve_permission(
            &name("payments.read"),
            &RequestScope::global(),
            &[],
            &overrides,
            &RoleBindings::default(),
            Utc::now(),
        );
        assert!(d.allowed);
    }

    #[test]
    fn test_narrower_wildcard_beats_broader() {
        let overrides = [
            ovr("payments.*", false, RequestScope::global(), 1),
            ovr("payments.batch.*", true, RequestScope::global(), 100),
        ];

        let d = resolve_permission(
            &name("payments.batch.export"),
            &RequestScope::global(),
            &[],
            &overrides,
            &RoleBindings::default(),
            Utc::now(),
        );
        assert!(d.allowed);
    }

    #[test]
    fn test_freshest_override_wins_ties() {
        let overrides = [
            ovr("payments.read", true, RequestScope::global(), 100),
            ovr("payments.read", false, RequestScope::global(), 1),
        ];
        let d = resolve_permission(
            &name("payments.read"),
            &RequestScope::global(),
            &[],
            &overrides,
            &RoleBindings::default(),
            Utc::now(),
        );
        assert!(!d.allowed);

        let overrides = [
            ovr("payments.read", false, RequestScope::global(), 100),
            ovr("payments.read", true, RequestScope::global(), 1),
        ];
        let d = resolve_permission(
            &name("payments.read"),
            &RequestScope::global(),
            &[],
            &overrides,
            &RoleBindings::default(),
            Utc::now(),
        );
        assert!(d.allowed);
    }

    #[test]
    fn test_same_timestamp_resolves_to_revoke() {
        let mut grant = ovr("payments.read", true, RequestScope::global(), 5);
        let mut revoke = ovr("payments.read", false, RequestScope::global(), 5);
        let ts = Utc::now();
        grant.updated_at = ts;
        revoke.updated_at = ts;

        for overrides in [[grant.clone(), revoke.clone()], [revoke, grant]] {
            let d = resolve_permission(
                &name("payments.read"),
                &RequestScope::global(),
                &[],
                &overrides,
                &RoleBindings::default(),
                Utc::now(),
            );
            assert!(!d.allowed);
        }
    }

    #[test]
    fn test_expired_override_ignored() {
        let b = bindings(&[("clerk", "payments.read")]);
        let mut revoke = ovr("payments.read", false, RequestScope::global(), 10);
        revoke.valid_until = Some(Utc::now() - Duration::seconds(1));

        let d = resolve_permission(
            &name("payments.read"),
            &RequestScope::global(),
            &roles(&["clerk"]),
            &[revoke],
            &b,
            Utc::now(),
        );
        assert!(d.allowed);
        assert!(matches!(d.source, DecisionSource::Role { .. }));
    }

    #[test]
    fn test_override_scope_must_match() {
        let b = bindings(&[("clerk", "payments.read")]);
        let overrides = [ovr("payments.read", false, RequestScope::unit("unitA"), 10)];

        // Different scope type: role decides.
        let d = resolve_permission(
            &name("payments.read"),
            &RequestScope::global(),
            &roles(&["clerk"]),
            &overrides,
            &b,
            Utc::now(),
        );
        assert!(d.allowed);

        // Same scope type, different unit: role decides.
        let d = resolve_permission(
            &name("payments.read"),
            &RequestScope::unit("unitB"),
            &roles(&["clerk"]),
            &overrides,
            &b,
            Utc::now(),
        );
        assert!(d.allowed);

        // Same unit: override revokes.
        let d = resolve_permission(
            &name("payments.read"),
            &RequestScope::unit("unitA"),
            &roles(&["clerk"]),
            &overrides,
            &b,
            Utc::now(),
        );
        assert!(!d.allowed);
    }

    #[test]
    fn test_unit_override_without_scope_id_never_applies() {
        let mut grant = ovr("payments.read", true, RequestScope::unit("unitA"), 10);
        grant.scope_id = None;

        let d = resolve_permission(
            &name("payments.read"),
            &RequestScope::unit("unitA"),
            &[],
            &[grant],
            &RoleBindings::default(),
            Utc::now(),
        );
        assert!(!d.allowed);
    }

    #[test]
    fn test_invalid_override_name_ignored() {
        let overrides = [ovr("payments..read", true, RequestScope::global(), 10)];
        let d = resolve_permission(
            &name("payments.read"),
            &RequestScope::global(),
            &[],
            &overrides,
            &RoleBindings::default(),
            Utc::now(),
        );
        assert!(!d.allowed);
    }

    #[test]
    fn test_request_scope_from_context() {
        assert_eq!(RequestScope::from_context(&ScopeContext::Anonymous), RequestScope::global());
        assert_eq!(
            RequestScope::from_context(&ScopeContext::Unit {
                user_id: "u2".into(),
                unit_id: "unitA".into()
            }),
            RequestScope::unit("unitA")
        );
        assert_eq!(
            RequestScope::from_context(&ScopeContext::SelfOnly { user_id: "u1".into() }),
            RequestScope::self_only()
        );
    }
}
