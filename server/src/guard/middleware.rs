//! Route-level guard middleware.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, Query, RawPathParams, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::access::AccessGuard;
use super::inputs::OperationInputs;
use super::requirement::Requirement;
use crate::error::AuthzError;
use crate::scope::{self, Principal};

/// Largest JSON body buffered for scope id evaluation (1 MiB).
const MAX_GUARDED_BODY: usize = 1024 * 1024;

/// Middleware factory attaching requirements to a route.
///
/// Apply with `route_layer` so path parameters are available, and inside
/// the scope layer so the operation's context is set.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .route("/units/{unit_id}/requests", post(approve))
///     .route_layer(from_fn(require(
///         state.guard.clone(),
///         [Requirement::new("benefits.request.approve")
///             .at(ScopeType::Unit, ScopeIdExpr::path("unit_id"))],
///     )));
/// ```
pub fn require(
    guard: AccessGuard,
    requirements: impl IntoIterator<Item = Requirement>,
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Clone + Send + 'static {
    let requirements: Arc<[Requirement]> = requirements.into_iter().collect();
    move |request: Request, next: Next| {
        let guard = guard.clone();
        let requirements = Arc::clone(&requirements);
        Box::pin(async move {
            match enforce(&guard, &requirements, request).await {
                Ok(request) => next.run(request).await,
                Err(e) => e.into_response(),
            }
        })
    }
}

/// Collect inputs, run the guard and hand back the request unchanged.
async fn enforce(
    guard: &AccessGuard,
    requirements: &[Requirement],
    request: Request,
) -> Result<Request, AuthzError> {
    let ctx = scope::require_current()?;
    let (mut parts, body) = request.into_parts();

    let path = RawPathParams::from_request_parts(&mut parts, &())
        .await
        .map(|params| {
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map(|Query(q)| q)
        .unwrap_or_default();
    let mut inputs = OperationInputs::new().with_path(path).with_query(query);

    let body = if requirements.iter().any(Requirement::reads_body) {
        let bytes = to_bytes(body, MAX_GUARDED_BODY).await.map_err(|e| {
            tracing::debug!(error = %e, "Guarded body unreadable");
            AuthzError::ScopeViolation("request body could not be read".into())
        })?;
        if let Ok(json) = serde_json::from_slice(&bytes) {
            inputs = inputs.with_body(json);
        }
        Body::from(bytes)
    } else {
        body
    };

    let principal = parts.extensions.get::<Principal>().cloned();
    guard
        .check(principal.as_ref(), &ctx, requirements, &inputs)
        .await?;

    Ok(Request::from_parts(parts, body))
}
