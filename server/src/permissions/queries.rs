//! Database queries for the permission system.
//!
//! Read-only access to:
//! - Permission definitions
//! - Role permission bindings
//! - User permission overrides
//! - Permission groups
//!
//! plus the audit log writer.

use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{
    AuditLogEntry, GroupMapping, Permission, PermissionGroup, RolePermissionBinding,
    UserPermissionOverride,
};

// ============================================================================
// Catalog Queries
// ============================================================================

/// List all active permission definitions.
pub async fn list_active_permissions(pool: &PgPool) -> sqlx::Result<Vec<Permission>> {
    sqlx::query_as::<_, Permission>(
        r"
        SELECT id, name, description, active, created_by, updated_by, created_at, updated_at
        FROM permissions
        WHERE active = true
        ORDER BY name ASC
        ",
    )
    .fetch_all(pool)
    .await
}

/// List role bindings whose permission is active.
pub async fn list_role_bindings(pool: &PgPool) -> sqlx::Result<Vec<RolePermissionBinding>> {
    sqlx::query_as::<_, RolePermissionBinding>(
        r"
        SELECT rp.role, rp.permission_id, p.name AS permission_name
        FROM role_permissions rp
        INNER JOIN permissions p ON p.id = rp.permission_id
        WHERE p.active = true
        ORDER BY rp.role ASC, p.name ASC
        ",
    )
    .fetch_all(pool)
    .await
}

// ============================================================================
// Override Queries
// ============================================================================

/// List a user's overrides that have not expired yet.
///
/// Expired rows stay in the table for audit continuity and are filtered here.
pub async fn list_user_overrides(
    pool: &PgPool,
    user_id: &str,
) -> sqlx::Result<Vec<UserPermissionOverride>> {
    sqlx::query_as::<_, UserPermissionOverride>(
        r"
        SELECT
            o.id,
            o.user_id,
            o.permission_id,
            p.name AS permission_name,
            o.granted,
            o.scope_type,
            o.scope_id,
            o.valid_until,
            o.created_by,
            o.updated_by,
            o.created_at,
            o.updated_at
        FROM user_permission_overrides o
        INNER JOIN permissions p ON p.id = o.permission_id
        WHERE o.user_id = $1
          AND p.active = true
          AND (o.valid_until IS NULL OR o.valid_until > NOW())
        ORDER BY o.updated_at DESC
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

// ============================================================================
// Group Queries
// ============================================================================

/// List all permission groups.
pub async fn list_permission_groups(pool: &PgPool) -> sqlx::Result<Vec<PermissionGroup>> {
    sqlx::query_as::<_, PermissionGroup>(
        r"
        SELECT id, name, description, created_at
        FROM permission_groups
        ORDER BY name ASC
        ",
    )
    .fetch_all(pool)
    .await
}

/// List the group mappings of one group.
pub async fn list_group_mappings(pool: &PgPool, group_id: Uuid) -> sqlx::Result<Vec<GroupMapping>> {
    sqlx::query_as::<_, GroupMapping>(
        r"
        SELECT group_id, permission_id
        FROM permission_group_mappings
        WHERE group_id = $1
        ",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await
}

/// List the active permissions bundled in a group.
pub async fn list_group_permissions(pool: &PgPool, group_id: Uuid) -> sqlx::Result<Vec<Permission>> {
    sqlx::query_as::<_, Permission>(
        r"
        SELECT p.id, p.name, p.description, p.active, p.created_by, p.updated_by, p.created_at, p.updated_at
        FROM permissions p
        INNER JOIN permission_group_mappings m ON m.permission_id = p.id
        WHERE m.group_id = $1 AND p.active = true
        ORDER BY p.name ASC
        ",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await
}

// ============================================================================
// Audit Log Queries
// ============================================================================

/// Write an entry to the authorization audit log.
#[allow(clippy::too_many_arguments)]
pub async fn write_audit_log(
    pool: &PgPool,
    actor_id: Option<&str>,
    action: &str,
    permission: Option<&str>,
    scope_type: Option<&str>,
    scope_id: Option<&str>,
    outcome: &str,
    details: Option<JsonValue>,
) -> sqlx::Result<AuditLogEntry> {
    sqlx::query_as::<_, AuditLogEntry>(
        r"
        INSERT INTO authz_audit_log (actor_id, action, permission, scope_type, scope_id, outcome, details)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, actor_id, action, permission, scope_type, scope_id, outcome, details, created_at
        ",
    )
    .bind(actor_id)
    .bind(action)
    .bind(permission)
    .bind(scope_type)
    .bind(scope_id)
    .bind(outcome)
    .bind(details)
    .fetch_one(pool)
    .await
}

/// Get audit log entries with pagination and optional action filter.
pub async fn get_audit_log(
    pool: &PgPool,
    limit: i64,
    offset: i64,
    action_filter: Option<&str>,
) -> sqlx::Result<Vec<AuditLogEntry>> {
    sqlx::query_as::<_, AuditLogEntry>(
        r"
        SELECT id, actor_id, action, permission, scope_type, scope_id, outcome, details, created_at
        FROM authz_audit_log
        WHERE ($3::text IS NULL OR action = $3)
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        ",
    )
    .bind(limit)
    .bind(offset)
    .bind(action_filter)
    .fetch_all(pool)
    .await
}
