//! API Router and Application State
//!
//! Central routing configuration and shared state.

mod handlers;

use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::DecodingKey;
use scopegate_common::ScopeType;
use serde::Serialize;
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    audit::AuditRecorder,
    auth,
    config::Config,
    gateway::DataGateway,
    guard::{require, AccessGuard, Requirement},
    permissions::PermissionEngine,
    scope,
};

/// Permission needed to read the authorization audit log.
pub const AUDIT_READ: &str = "authz.audit.read";
/// Permission needed to list permission groups.
pub const GROUPS_READ: &str = "authz.groups.read";
/// Permission needed to drop cached overrides.
pub const CACHE_INVALIDATE: &str = "authz.cache.invalidate";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Server configuration
    pub config: Arc<Config>,
    /// Permission resolution engine
    pub engine: Arc<PermissionEngine>,
    /// Access guard for protected routes
    pub guard: AccessGuard,
    /// Scope-enforcing data gateway
    pub gateway: DataGateway,
    /// Principal token verification key
    pub decoding_key: Arc<DecodingKey>,
}

impl AppState {
    /// Create new application state.
    ///
    /// Fails when the configured public key cannot be decoded.
    pub fn new(
        db: PgPool,
        config: Config,
        engine: Arc<PermissionEngine>,
        audit: AuditRecorder,
    ) -> anyhow::Result<Self> {
        let decoding_key = auth::jwt::decoding_key(&config.jwt_public_key)?;
        let guard = AccessGuard::new(Arc::clone(&engine), audit.clone(), config.audit_guard_decisions);
        Ok(Self {
            db,
            config: Arc::new(config),
            engine,
            guard,
            gateway: DataGateway::new(audit),
            decoding_key: Arc::new(decoding_key),
        })
    }
}

/// Create the main application router.
///
/// Every `/api` request is authenticated (anonymous when no credential is
/// sent) and then runs inside its resolved scope context.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let audit_routes = Router::new()
        .route("/audit", get(handlers::get_audit_log))
        .route_layer(from_fn(require(
            state.guard.clone(),
            [Requirement::new(AUDIT_READ).scoped(ScopeType::Global)],
        )));

    let group_routes = Router::new()
        .route("/groups", get(handlers::list_groups))
        .route("/groups/{group_id}/permissions", get(handlers::list_group_permissions))
        .route_layer(from_fn(require(
            state.guard.clone(),
            [Requirement::new(GROUPS_READ)],
        )));

    let cache_routes = Router::new()
        .route("/cache/invalidate", post(handlers::invalidate_cache))
        .route_layer(from_fn(require(
            state.guard.clone(),
            [Requirement::new(CACHE_INVALIDATE).scoped(ScopeType::Global)],
        )));

    let authz_routes = Router::new()
        .route("/me", get(handlers::me))
        .route("/check", get(handlers::check))
        .merge(audit_routes)
        .merge(group_routes)
        .merge(cache_routes);

    let api_routes = Router::new()
        .nest("/api/authz", authz_routes)
        .layer(from_fn_with_state(state.clone(), scope::resolve_scope))
        .layer(from_fn_with_state(state.clone(), auth::authenticate));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .merge(api_routes)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Number of active permissions in the loaded catalog
    permissions: usize,
}

/// Health check endpoint.
async fn health_check(axum::extract::State(state): axum::extract::State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        permissions: state.engine.snapshot().await.catalog.len(),
    })
}
