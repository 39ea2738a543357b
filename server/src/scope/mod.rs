//! Request scope: who is acting, and over which slice of data.
//!
//! The principal is parsed once at the boundary, resolved to a
//! [`ScopeContext`] and carried through the operation by a task-local store.

pub mod context;
pub mod middleware;
pub mod principal;
pub mod resolver;
pub mod store;

pub use context::ScopeContext;
pub use middleware::resolve_scope;
pub use principal::Principal;
pub use resolver::resolve_scope_context;
pub use store::{current, require_current, spawn_scoped, sync_scope, with_scope};
