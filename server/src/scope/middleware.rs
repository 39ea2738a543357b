//! Scope resolution middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::context::ScopeContext;
use super::principal::Principal;
use super::resolver::resolve_scope_context;
use super::store::with_scope;
use crate::api::AppState;
use crate::error::AuthzError;

/// Resolve the operation's scope and run the rest of the pipeline inside it.
///
/// Runs after authentication. Reads the optional [`Principal`] and the
/// advisory unit hint header, then sets the context for the lifetime of the
/// request future. The context is also placed in request extensions for
/// handlers that prefer an extractor.
///
/// # Usage
///
/// ```ignore
/// Router::new()
///     .route("/records", get(handler))
///     .layer(axum::middleware::from_fn_with_state(state, resolve_scope))
/// ```
#[tracing::instrument(skip_all)]
pub async fn resolve_scope(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthzError> {
    let principal = request.extensions().get::<Principal>().cloned();
    let hint = request
        .headers()
        .get(state.config.scope_hint_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let ctx = resolve_scope_context(principal.as_ref(), hint.as_deref());
    tracing::debug!(
        scope_type = %ctx.scope_type(),
        user_id = ?ctx.user_id(),
        unit_id = ?ctx.unit_id(),
        "Scope context resolved"
    );

    request.extensions_mut().insert(ctx.clone());
    with_scope(ctx, next.run(request)).await
}

/// Extractor for the resolved scope in handlers.
///
/// Missing only when the route is not behind [`resolve_scope`]; that is a
/// wiring error and fails closed.
impl<S> axum::extract::FromRequestParts<S> for ScopeContext
where
    S: Send + Sync,
{
    type Rejection = AuthzError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AuthzError::ScopeViolation("route has no scope context".into()))
    }
}
