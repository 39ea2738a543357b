//! Access guard attached to protected operations.
//!
//! Operations declare their [`Requirement`]s; the guard resolves each one
//! through the permission engine and denies unless all pass.

mod access;
mod inputs;
mod middleware;
mod requirement;

pub use access::AccessGuard;
pub use inputs::OperationInputs;
pub use middleware::require;
pub use requirement::{InputSource, Requirement, ScopeIdExpr, ScopeIdExprError};
