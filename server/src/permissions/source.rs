//! Where permission records come from.
//!
//! The engine reads the catalog, role bindings and overrides through
//! [`PermissionSource`]. Production uses Postgres; [`StaticPermissionSource`]
//! holds a fixed role table in memory for bootstrapping and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::PgPool;
use uuid::Uuid;

use super::catalog::CatalogSnapshot;
use super::models::{Permission, RolePermissionBinding, UserPermissionOverride};
use super::name::{PermissionName, PermissionNameError};
use super::queries;
use super::resolver::RequestScope;

/// Read access to permission records.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// Load active permissions and role bindings.
    async fn load_catalog(&self) -> sqlx::Result<CatalogSnapshot>;

    /// Load a user's non-expired overrides.
    async fn load_overrides(&self, user_id: &str) -> sqlx::Result<Vec<UserPermissionOverride>>;
}

/// Postgres-backed source.
#[derive(Debug, Clone)]
pub struct PgPermissionSource {
    pool: PgPool,
}

impl PgPermissionSource {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionSource for PgPermissionSource {
    #[tracing::instrument(skip(self))]
    async fn load_catalog(&self) -> sqlx::Result<CatalogSnapshot> {
        let permissions = queries::list_active_permissions(&self.pool).await?;
        let bindings = queries::list_role_bindings(&self.pool).await?;
        Ok(CatalogSnapshot::build(permissions, bindings))
    }

    #[tracing::instrument(skip(self))]
    async fn load_overrides(&self, user_id: &str) -> sqlx::Result<Vec<UserPermissionOverride>> {
        queries::list_user_overrides(&self.pool, user_id).await
    }
}

/// In-memory source with a fixed role table.
///
/// Permissions and bindings are fixed once built; overrides can be pushed
/// at any time, which makes this usable for exercising cache invalidation.
#[derive(Debug, Default)]
pub struct StaticPermissionSource {
    permissions: HashMap<String, Permission>,
    bindings: Vec<RolePermissionBinding>,
    overrides: DashMap<String, Vec<UserPermissionOverride>>,
}

impl StaticPermissionSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active permission; names are validated.
    pub fn with_permission(mut self, name: &str) -> Result<Self, PermissionNameError> {
        self.ensure_permission(name)?;
        Ok(self)
    }

    /// Bind a permission to a role, registering the permission if needed.
    pub fn bind(mut self, role: &str, name: &str) -> Result<Self, PermissionNameError> {
        let permission_id = self.ensure_permission(name)?;
        self.bindings.push(RolePermissionBinding {
            role: role.to_string(),
            permission_id,
            permission_name: name.to_string(),
        });
        Ok(self)
    }

    fn ensure_permission(&mut self, name: &str) -> Result<Uuid, PermissionNameError> {
        let name = PermissionName::parse(name)?;
        let now = Utc::now();
        let permission = self
            .permissions
            .entry(name.as_str().to_string())
            .or_insert_with(|| Permission {
                id: Uuid::now_v7(),
                name: name.to_string(),
                description: None,
                active: true,
                created_by: None,
                updated_by: None,
                created_at: now,
                updated_at: now,
            });
        Ok(permission.id)
    }

    /// Record an override for `user_id`.
    ///
    /// The permission name must already be registered.
    pub fn push_override(
        &self,
        user_id: &str,
        name: &str,
        granted: bool,
        scope: RequestScope,
        valid_until: Option<DateTime<Utc>>,
    ) -> Option<UserPermissionOverride> {
        let permission = self.permissions.get(name)?;
        let now = Utc::now();
        let ovr = UserPermissionOverride {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            permission_id: permission.id,
            permission_name: permission.name.clone(),
            granted,
            scope_type: scope.scope_type,
            scope_id: scope.unit_id,
            valid_until,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        self.overrides
            .entry(user_id.to_string())
            .or_default()
            .push(ovr.clone());
        Some(ovr)
    }

    /// Drop every override of `user_id`.
    pub fn clear_overrides(&self, user_id: &str) {
        self.overrides.remove(user_id);
    }
}

#[async_trait]
impl PermissionSource for StaticPermissionSource {
    async fn load_catalog(&self) -> sqlx::Result<CatalogSnapshot> {
        Ok(CatalogSnapshot::build(
            self.permissions.values().cloned().collect(),
            self.bindings.clone(),
        ))
    }

    async fn load_overrides(&self, user_id: &str) -> sqlx::Result<Vec<UserPermissionOverride>> {
        let now = Utc::now();
        Ok(self
            .overrides
            .get(user_id)
            .map(|rows| rows.iter().filter(|o| !o.is_expired(now)).cloned().collect())
            .unwrap_or_default())
    }
}
