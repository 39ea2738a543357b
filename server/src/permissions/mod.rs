//! Permission catalog, role bindings, user overrides and their resolution.
//!
//! Names are dotted (`module.resource.action`); a trailing `*` segment
//! covers every name under its prefix. Overrides beat role bindings, the
//! most specific override wins, and anything not granted is denied.

pub mod catalog;
pub mod engine;
pub mod models;
pub mod name;
pub mod overrides;
pub mod queries;
pub mod resolver;
pub mod source;

pub use catalog::{CatalogSnapshot, PermissionCatalog, RoleBindings};
pub use engine::{spawn_refresh_task, EffectivePermission, EffectivePermissions, PermissionEngine};
pub use models::*;
pub use name::{covers, PermissionName, PermissionNameError};
pub use overrides::OverrideCache;
pub use resolver::{resolve_permission, Decision, DecisionSource, RequestScope};
pub use source::{PermissionSource, PgPermissionSource, StaticPermissionSource};
