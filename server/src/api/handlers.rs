//! Authorization introspection and administration handlers.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use scopegate_common::ScopeType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::error::{AuthzError, AuthzResult};
use crate::permissions::{
    queries, AuditLogEntry, DecisionSource, EffectivePermissions, Permission, PermissionGroup,
    RequestScope,
};
use crate::scope::{Principal, ScopeContext};

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters of `GET /api/authz/check`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckParams {
    /// Permission name to resolve.
    pub permission: String,
    /// Scope to resolve at; the operation's own scope when absent.
    pub scope_type: Option<String>,
    /// Unit id, required with `scopeType=UNIT`.
    pub scope_id: Option<String>,
}

/// Query parameters of `GET /api/authz/audit`.
#[derive(Debug, Deserialize)]
pub struct AuditLogParams {
    /// Maximum number of items to return.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Number of items to skip.
    #[serde(default)]
    pub offset: i64,
    /// Filter by exact action (e.g. "gateway.bypass").
    pub action: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_limit() -> i64 {
    50
}

/// Body of `POST /api/authz/cache/invalidate`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateRequest {
    /// Only drop this user's overrides; everything when absent.
    pub user_id: Option<String>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Response of `GET /api/authz/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub roles: Vec<String>,
    pub scope: ScopeContext,
    pub effective: EffectivePermissions,
}

/// Response of `GET /api/authz/check`.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub permission: String,
    pub allowed: bool,
    pub source: DecisionSource,
    pub scope: RequestScope,
}

// ============================================================================
// Handlers
// ============================================================================

/// Who the caller is, at which scope, and what they hold there.
#[tracing::instrument(skip(state, principal), fields(user_id = %principal.id))]
pub async fn me(
    State(state): State<AppState>,
    principal: Principal,
    ctx: ScopeContext,
) -> AuthzResult<Json<MeResponse>> {
    let effective = state.engine.effective_permissions(&principal, None).await?;
    Ok(Json(MeResponse {
        id: principal.id,
        roles: principal.roles,
        scope: ctx,
        effective,
    }))
}

/// Resolve one permission for the caller and explain the outcome.
#[tracing::instrument(skip(state, principal), fields(user_id = %principal.id))]
pub async fn check(
    State(state): State<AppState>,
    principal: Principal,
    ctx: ScopeContext,
    Query(params): Query<CheckParams>,
) -> AuthzResult<Json<CheckResponse>> {
    let scope = match params.scope_type.as_deref() {
        None => RequestScope::from_context(&ctx),
        Some(tag) => match tag.parse::<ScopeType>()? {
            ScopeType::Global => RequestScope::global(),
            ScopeType::SelfOnly => RequestScope::self_only(),
            ScopeType::Unit => {
                let unit_id = params
                    .scope_id
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| AuthzError::InvalidScopeContext("UNIT scope requires scopeId".into()))?;
                RequestScope::unit(unit_id)
            }
        },
    };

    let decision = state
        .engine
        .explain(&principal, &params.permission, Some(&scope))
        .await?;

    Ok(Json(CheckResponse {
        permission: params.permission,
        allowed: decision.allowed,
        source: decision.source,
        scope,
    }))
}

/// Page through the authorization audit log.
#[tracing::instrument(skip(state))]
pub async fn get_audit_log(
    State(state): State<AppState>,
    Query(params): Query<AuditLogParams>,
) -> AuthzResult<Json<Vec<AuditLogEntry>>> {
    let limit = params.limit.clamp(1, 100);
    let offset = params.offset.max(0);
    let entries = queries::get_audit_log(&state.db, limit, offset, params.action.as_deref()).await?;
    Ok(Json(entries))
}

/// List permission groups.
#[tracing::instrument(skip(state))]
pub async fn list_groups(State(state): State<AppState>) -> AuthzResult<Json<Vec<PermissionGroup>>> {
    Ok(Json(queries::list_permission_groups(&state.db).await?))
}

/// List the active permissions bundled in a group.
#[tracing::instrument(skip(state))]
pub async fn list_group_permissions(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> AuthzResult<Json<Vec<Permission>>> {
    Ok(Json(queries::list_group_permissions(&state.db, group_id).await?))
}

/// Drop cached overrides after an administrative write.
///
/// An empty body drops every user's overrides.
#[tracing::instrument(skip(state, body))]
pub async fn invalidate_cache(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let request = if body.is_empty() {
        InvalidateRequest::default()
    } else {
        match serde_json::from_slice::<InvalidateRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "Malformed invalidation request");
                return StatusCode::BAD_REQUEST;
            }
        }
    };
    match request.user_id.as_deref() {
        Some(user_id) => state.engine.invalidate_user(user_id),
        None => state.engine.invalidate_all(),
    }
    StatusCode::NO_CONTENT
}
