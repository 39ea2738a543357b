//! Authentication Middleware

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use super::jwt::validate_principal_token;
use crate::api::AppState;
use crate::error::AuthzError;
use crate::scope::Principal;

/// Middleware that attaches the authenticated [`Principal`], if any.
///
/// No `Authorization` header means an anonymous operation and the request
/// continues without a principal. A header that is present but malformed,
/// or a token that fails verification, is rejected with 401. A verified
/// payload without a usable id is rejected with 400.
///
/// # Usage
///
/// ```ignore
/// Router::new()
///     .route("/records", get(handler))
///     .layer(axum::middleware::from_fn_with_state(state, authenticate))
/// ```
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthzError> {
    let Some(auth_header) = request.headers().get(AUTHORIZATION) else {
        return Ok(next.run(request).await);
    };

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AuthzError::Unauthenticated)?;

    let claims = validate_principal_token(token, &state.decoding_key)?;
    let principal = Principal::from_claims(&claims)?;

    tracing::debug!(user_id = %principal.id, roles = ?principal.roles, "Principal authenticated");
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}
