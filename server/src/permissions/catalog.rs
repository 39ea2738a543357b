//! Permission catalog and role bindings snapshot.
//!
//! Both are read-mostly. A [`CatalogSnapshot`] is built from whatever the
//! permission source returns and swapped in whole on refresh, so readers
//! never observe a half-loaded catalog.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{Permission, RolePermissionBinding};
use super::name::PermissionName;

/// Catalog entry: the stored definition plus its pre-split name.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub permission: Permission,
    pub name: PermissionName,
}

/// Active permission definitions indexed by id and name.
#[derive(Debug, Clone, Default)]
pub struct PermissionCatalog {
    by_id: HashMap<Uuid, CatalogEntry>,
    by_name: HashMap<String, Uuid>,
}

impl PermissionCatalog {
    /// Build a catalog from stored definitions.
    ///
    /// Inactive rows and rows whose name fails validation are skipped with a
    /// warning; a bad row must not take the whole catalog down.
    #[must_use]
    pub fn from_permissions(permissions: Vec<Permission>) -> Self {
        let mut catalog = Self::default();

        for permission in permissions {
            if !permission.active {
                continue;
            }
            let name = match PermissionName::parse(&permission.name) {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!(permission_id = %permission.id, error = %e, "Skipping invalid permission name");
                    continue;
                }
            };
            catalog.by_name.insert(name.as_str().to_string(), permission.id);
            catalog.by_id.insert(permission.id, CatalogEntry { permission, name });
        }

        catalog
    }

    /// Look up an entry by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.by_name.get(name).and_then(|id| self.by_id.get(id))
    }

    /// Look up an entry by id.
    #[must_use]
    pub fn get_by_id(&self, id: Uuid) -> Option<&CatalogEntry> {
        self.by_id.get(&id)
    }

    /// Whether `name` is a known, active permission.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Catalog entries whose name covers `requested`.
    pub fn covering<'a>(&'a self, requested: &'a PermissionName) -> impl Iterator<Item = &'a CatalogEntry> + 'a {
        self.by_id.values().filter(move |entry| entry.name.covers(requested))
    }

    /// All entries, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.by_id.values()
    }

    /// Number of active permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Static map from role tags to granted permission names.
///
/// Wildcards are kept as wildcards; membership is decided by the coverage
/// test at check time.
#[derive(Debug, Clone, Default)]
pub struct RoleBindings {
    by_role: HashMap<String, Vec<PermissionName>>,
}

impl RoleBindings {
    /// Build bindings, keeping only those that reference a catalog entry.
    #[must_use]
    pub fn from_bindings(bindings: Vec<RolePermissionBinding>, catalog: &PermissionCatalog) -> Self {
        let mut by_role: HashMap<String, Vec<PermissionName>> = HashMap::new();

        for binding in bindings {
            let Some(entry) = catalog.get_by_id(binding.permission_id) else {
                tracing::debug!(
                    role = %binding.role,
                    permission = %binding.permission_name,
                    "Ignoring binding to unknown or inactive permission"
                );
                continue;
            };
            let granted = by_role.entry(binding.role).or_default();
            if !granted.contains(&entry.name) {
                granted.push(entry.name.clone());
            }
        }

        Self { by_role }
    }

    /// Permissions bound to a role.
    #[must_use]
    pub fn for_role(&self, role: &str) -> &[PermissionName] {
        self.by_role.get(role).map(Vec::as_slice).unwrap_or_default()
    }

    /// First `(role, granted name)` among `roles` that covers `requested`.
    #[must_use]
    pub fn find_covering<'a>(
        &'a self,
        roles: &'a [String],
        requested: &PermissionName,
    ) -> Option<(&'a str, &'a PermissionName)> {
        roles.iter().find_map(|role| {
            self.for_role(role)
                .iter()
                .find(|granted| granted.covers(requested))
                .map(|granted| (role.as_str(), granted))
        })
    }

    /// Known role tags.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.by_role.keys().map(String::as_str)
    }
}

/// Catalog and bindings loaded together.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub catalog: PermissionCatalog,
    pub bindings: RoleBindings,
    pub loaded_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Build a snapshot from raw rows.
    #[must_use]
    pub fn build(permissions: Vec<Permission>, bindings: Vec<RolePermissionBinding>) -> Self {
        let catalog = PermissionCatalog::from_permissions(permissions);
        let bindings = RoleBindings::from_bindings(bindings, &catalog);
        Self {
            catalog,
            bindings,
            loaded_at: Utc::now(),
        }
    }

    /// An empty snapshot, used before the first load.
    #[must_use]
    pub fn empty() -> Self {
        Self::build(Vec::new(), Vec::new())
    }
}
