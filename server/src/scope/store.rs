//! Context propagation store.
//!
//! Carries one [`ScopeContext`] through an operation's call graph using a
//! tokio task-local. The value is set when the operation's future is wrapped
//! and released when that future completes, errors or is dropped, so it
//! cannot bleed into another request served by the same worker thread.
//!
//! Task-locals do not follow `tokio::spawn`; use [`spawn_scoped`] to carry
//! the current context into a child task.

use std::future::Future;

use tokio::task::JoinHandle;

use super::context::ScopeContext;
use crate::error::{AuthzError, AuthzResult};

tokio::task_local! {
    static CURRENT_SCOPE: ScopeContext;
}

/// Run `fut` with `ctx` as the current scope.
///
/// Fails if a scope is already set: an operation's context is set once.
pub async fn with_scope<F>(ctx: ScopeContext, fut: F) -> AuthzResult<F::Output>
where
    F: Future,
{
    if current().is_some() {
        return Err(AuthzError::ScopeViolation(
            "scope context is already set for this operation".into(),
        ));
    }
    Ok(CURRENT_SCOPE.scope(ctx, fut).await)
}

/// Synchronous counterpart of [`with_scope`], for blocking sections.
pub fn sync_scope<R>(ctx: ScopeContext, f: impl FnOnce() -> R) -> AuthzResult<R> {
    if current().is_some() {
        return Err(AuthzError::ScopeViolation(
            "scope context is already set for this operation".into(),
        ));
    }
    Ok(CURRENT_SCOPE.sync_scope(ctx, f))
}

/// The current scope, or `None` outside an operation.
#[must_use]
pub fn current() -> Option<ScopeContext> {
    CURRENT_SCOPE.try_with(Clone::clone).ok()
}

/// The current scope, or a violation when there is none.
pub fn require_current() -> AuthzResult<ScopeContext> {
    current().ok_or_else(|| AuthzError::ScopeViolation("no scope context for this operation".into()))
}

/// Spawn `fut` on the runtime with the current scope carried over.
///
/// Outside an operation the child runs without a scope.
pub fn spawn_scoped<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match current() {
        Some(ctx) => tokio::spawn(CURRENT_SCOPE.scope(ctx, fut)),
        None => tokio::spawn(fut),
    }
}
