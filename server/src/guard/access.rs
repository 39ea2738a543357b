//! Access guard: the enforcement point of protected operations.

use std::sync::Arc;

use scopegate_common::ScopeType;
use serde::Serialize;
use serde_json::json;

use super::inputs::OperationInputs;
use super::requirement::Requirement;
use crate::audit::{AuditRecord, AuditRecorder, ACTION_GUARD_CHECK};
use crate::error::{AuthzError, AuthzResult};
use crate::permissions::{DecisionSource, PermissionEngine, RequestScope};
use crate::scope::{self, Principal, ScopeContext};

/// Checks declarative requirements against the permission engine.
///
/// Fails closed: an anonymous operation, a scope id that cannot be located
/// in the inputs, or a scope id that differs from the context all deny.
#[derive(Clone)]
pub struct AccessGuard {
    engine: Arc<PermissionEngine>,
    audit: AuditRecorder,
    audit_decisions: bool,
}

impl AccessGuard {
    #[must_use]
    pub const fn new(engine: Arc<PermissionEngine>, audit: AuditRecorder, audit_decisions: bool) -> Self {
        Self {
            engine,
            audit,
            audit_decisions,
        }
    }

    #[must_use]
    pub const fn engine(&self) -> &Arc<PermissionEngine> {
        &self.engine
    }

    /// Check every requirement; the first failure is returned.
    #[tracing::instrument(skip_all, fields(user_id = ?principal.map(|p| p.id.as_str())))]
    pub async fn check(
        &self,
        principal: Option<&Principal>,
        ctx: &ScopeContext,
        requirements: &[Requirement],
        inputs: &OperationInputs,
    ) -> AuthzResult<()> {
        for requirement in requirements {
            self.check_one(principal, ctx, requirement, inputs).await?;
        }
        Ok(())
    }

    /// Check requirements against a record the handler already loaded.
    ///
    /// Reads the operation's context from the propagation store, so it must
    /// run inside a scoped operation. `record.*` expressions read `record`.
    pub async fn check_record<T: Serialize>(
        &self,
        principal: Option<&Principal>,
        requirements: &[Requirement],
        record: &T,
    ) -> AuthzResult<()> {
        let ctx = scope::require_current()?;
        let record = serde_json::to_value(record).map_err(|e| {
            tracing::error!(error = %e, "Record is not serializable for access check");
            AuthzError::ScopeViolation("record cannot be inspected".into())
        })?;
        let inputs = OperationInputs::new().with_record(record);
        self.check(principal, &ctx, requirements, &inputs).await
    }

    async fn check_one(
        &self,
        principal: Option<&Principal>,
        ctx: &ScopeContext,
        requirement: &Requirement,
        inputs: &OperationInputs,
    ) -> AuthzResult<()> {
        let scope_type = requirement.scope_type.unwrap_or_else(|| ctx.scope_type());
        let scope_id = requirement
            .scope_id
            .as_ref()
            .and_then(|expr| expr.evaluate(inputs));

        let Some(principal) = principal else {
            tracing::debug!(permission = %requirement.permission, "Denying anonymous operation");
            return self
                .deny(None, requirement, scope_type, scope_id, "anonymous")
                .await;
        };

        let request_scope = match requirement.scope_type {
            None => None,
            // Confined principals cannot act at global scope.
            Some(ScopeType::Global) if ctx.scope_type() == ScopeType::Global => Some(RequestScope::global()),
            Some(ScopeType::Global) => {
                return self
                    .deny(Some(principal), requirement, scope_type, None, "scope_too_narrow")
                    .await;
            }
            Some(ScopeType::Unit) => {
                let target = match &requirement.scope_id {
                    Some(_) => scope_id.clone(),
                    None => ctx.unit_id().map(str::to_string),
                };
                match (target, ctx.unit_id()) {
                    (Some(target), Some(own)) if target == own => Some(RequestScope::unit(target)),
                    (target, _) => {
                        return self
                            .deny(Some(principal), requirement, scope_type, target, "unit_mismatch")
                            .await;
                    }
                }
            }
            Some(ScopeType::SelfOnly) => {
                let target = match &requirement.scope_id {
                    Some(_) => scope_id.clone(),
                    None => Some(principal.id.clone()),
                };
                match target {
                    Some(target) if target == principal.id => Some(RequestScope::self_only()),
                    target => {
                        return self
                            .deny(Some(principal), requirement, scope_type, target, "owner_mismatch")
                            .await;
                    }
                }
            }
        };

        let decision = self
            .engine
            .explain(principal, &requirement.permission, request_scope.as_ref())
            .await?;

        let scope_id = request_scope.and_then(|s| s.unit_id).or(scope_id);
        if !decision.allowed {
            let reason = match decision.source {
                DecisionSource::Override { .. } => "override_revoked",
                DecisionSource::Role { .. } | DecisionSource::Default => "not_granted",
            };
            return self
                .deny(Some(principal), requirement, scope_type, scope_id, reason)
                .await;
        }

        if self.audit_decisions {
            self.audit
                .record(
                    AuditRecord::new(ACTION_GUARD_CHECK, "granted")
                        .actor(Some(&principal.id))
                        .permission(&requirement.permission)
                        .scope(scope_type, scope_id.as_deref())
                        .details(json!({ "source": decision.source })),
                )
                .await;
        }
        Ok(())
    }

    async fn deny(
        &self,
        principal: Option<&Principal>,
        requirement: &Requirement,
        scope_type: ScopeType,
        scope_id: Option<String>,
        reason: &str,
    ) -> AuthzResult<()> {
        tracing::info!(
            user_id = ?principal.map(|p| p.id.as_str()),
            permission = %requirement.permission,
            scope_type = %scope_type,
            scope_id = ?scope_id,
            reason,
            "Access denied"
        );

        if self.audit_decisions {
            self.audit
                .record(
                    AuditRecord::new(ACTION_GUARD_CHECK, "denied")
                        .actor(principal.map(|p| p.id.as_str()))
                        .permission(&requirement.permission)
                        .scope(scope_type, scope_id.as_deref())
                        .details(json!({ "reason": reason })),
                )
                .await;
        }

        Err(AuthzError::denied(requirement.permission.clone(), scope_type, scope_id))
    }
}

impl std::fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGuard")
            .field("audit", &self.audit)
            .field("audit_decisions", &self.audit_decisions)
            .finish_non_exhaustive()
    }
}
