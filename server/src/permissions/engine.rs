//! Permission resolution engine.
//!
//! Ties the catalog snapshot, the role bindings and the per-user override
//! cache together behind one entry point. The catalog is swapped whole on
//! refresh; readers clone an `Arc` and never hold the lock across a check.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;

use super::catalog::CatalogSnapshot;
use super::models::UserPermissionOverride;
use super::name::PermissionName;
use super::overrides::OverrideCache;
use super::resolver::{resolve_permission, Decision, DecisionSource, RequestScope};
use super::source::PermissionSource;
use crate::error::AuthzResult;
use crate::scope::{self, Principal};

/// One granted permission and what granted it.
#[derive(Debug, Clone, Serialize)]
pub struct EffectivePermission {
    pub permission: String,
    pub source: DecisionSource,
}

/// Everything a principal holds at one scope.
#[derive(Debug, Clone, Serialize)]
pub struct EffectivePermissions {
    pub scope: RequestScope,
    pub granted: Vec<EffectivePermission>,
}

/// Answers "is permission P granted to principal U at scope S right now?".
pub struct PermissionEngine {
    source: Arc<dyn PermissionSource>,
    snapshot: RwLock<Arc<CatalogSnapshot>>,
    overrides: OverrideCache,
}

impl PermissionEngine {
    /// Create an engine with an empty catalog. Call [`Self::reload_catalog`]
    /// before serving.
    #[must_use]
    pub fn new(source: Arc<dyn PermissionSource>, override_ttl: Duration) -> Self {
        Self {
            source,
            snapshot: RwLock::new(Arc::new(CatalogSnapshot::empty())),
            overrides: OverrideCache::new(override_ttl),
        }
    }

    /// Reload the catalog and role bindings from the source.
    #[tracing::instrument(skip(self))]
    pub async fn reload_catalog(&self) -> AuthzResult<()> {
        let fresh = self.source.load_catalog().await?;
        tracing::debug!(
            permissions = fresh.catalog.len(),
            "Permission catalog loaded"
        );
        *self.snapshot.write().await = Arc::new(fresh);
        Ok(())
    }

    /// Current catalog snapshot.
    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// Scope a check runs at: explicit, else the operation's context, else
    /// the principal's own resolved scope.
    fn request_scope(principal: &Principal, scope: Option<&RequestScope>) -> RequestScope {
        if let Some(scope) = scope {
            return scope.clone();
        }
        let ctx = scope::current()
            .unwrap_or_else(|| scope::resolve_scope_context(Some(principal), None));
        RequestScope::from_context(&ctx)
    }

    /// A user's overrides that still reference an active catalog entry.
    async fn active_overrides(
        &self,
        snapshot: &CatalogSnapshot,
        user_id: &str,
    ) -> AuthzResult<Vec<UserPermissionOverride>> {
        let rows = self
            .overrides
            .get_or_load(self.source.as_ref(), user_id)
            .await?;
        Ok(rows
            .iter()
            .filter(|ovr| snapshot.catalog.get_by_id(ovr.permission_id).is_some())
            .cloned()
            .collect())
    }

    /// Resolve `permission` for `principal` and report what decided it.
    ///
    /// A malformed requested name is denied, never an error.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.id))]
    pub async fn explain(
        &self,
        principal: &Principal,
        permission: &str,
        scope: Option<&RequestScope>,
    ) -> AuthzResult<Decision> {
        let Ok(requested) = PermissionName::parse(permission) else {
            tracing::debug!(permission, "Denying malformed permission name");
            return Ok(Decision::deny());
        };

        let scope = Self::request_scope(principal, scope);
        let snapshot = self.snapshot().await;
        let overrides = self.active_overrides(&snapshot, &principal.id).await?;

        let decision = resolve_permission(
            &requested,
            &scope,
            &principal.roles,
            &overrides,
            &snapshot.bindings,
            Utc::now(),
        );

        tracing::debug!(
            permission,
            scope_type = %scope.scope_type,
            unit_id = ?scope.unit_id,
            allowed = decision.allowed,
            "Permission resolved"
        );

        Ok(decision)
    }

    /// Whether `permission` is granted.
    pub async fn is_allowed(
        &self,
        principal: &Principal,
        permission: &str,
        scope: Option<&RequestScope>,
    ) -> AuthzResult<bool> {
        Ok(self.explain(principal, permission, scope).await?.allowed)
    }

    /// Every catalog permission granted to `principal` at `scope`, sorted by name.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.id))]
    pub async fn effective_permissions(
        &self,
        principal: &Principal,
        scope: Option<&RequestScope>,
    ) -> AuthzResult<EffectivePermissions> {
        let scope = Self::request_scope(principal, scope);
        let snapshot = self.snapshot().await;
        let overrides = self.active_overrides(&snapshot, &principal.id).await?;
        let now = Utc::now();

        let mut granted: Vec<EffectivePermission> = snapshot
            .catalog
            .iter()
            .filter_map(|entry| {
                let decision = resolve_permission(
                    &entry.name,
                    &scope,
                    &principal.roles,
                    &overrides,
                    &snapshot.bindings,
                    now,
                );
                decision.allowed.then(|| EffectivePermission {
                    permission: entry.name.to_string(),
                    source: decision.source,
                })
            })
            .collect();
        granted.sort_by(|a, b| a.permission.cmp(&b.permission));

        Ok(EffectivePermissions { scope, granted })
    }

    /// Drop a user's cached overrides after an override write.
    pub fn invalidate_user(&self, user_id: &str) {
        tracing::debug!(user_id, "Invalidating cached overrides");
        self.overrides.invalidate(user_id);
    }

    /// Drop every cached override.
    pub fn invalidate_all(&self) {
        tracing::debug!("Invalidating all cached overrides");
        self.overrides.invalidate_all();
    }

    /// Drop cached overrides past their TTL.
    pub fn sweep_overrides(&self) -> usize {
        let removed = self.overrides.sweep_expired();
        if removed > 0 {
            tracing::debug!(removed, "Swept expired override cache entries");
        }
        removed
    }
}

/// Start the periodic catalog refresh task.
///
/// The first tick is consumed immediately; startup performs its own load.
/// A failed reload keeps the previous snapshot. Each tick also sweeps
/// expired override cache entries.
pub fn spawn_refresh_task(engine: Arc<PermissionEngine>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await; // consume immediate first tick
        loop {
            interval.tick().await;
            if let Err(e) = engine.reload_catalog().await {
                tracing::warn!(error = %e, "Catalog refresh failed, keeping previous snapshot");
            }
            engine.sweep_overrides();
        }
    })
}
