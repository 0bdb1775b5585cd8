use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method},
    middleware,
    routing::get,
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::api;
use crate::auth::{identity_context, IdentityClaims, IdentityVerifier, JwksVerifier};
use crate::cache::QueryCache;
use crate::config::Config;
use crate::logto::LogtoClient;
use crate::rpc;

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub config: Config,
    pub logto: LogtoClient,
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Checks access tokens presented to `/api/data`.
    pub data_verifier: Arc<dyn IdentityVerifier>,
    pub queries: QueryCache,
}

impl AppState {
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let logto = LogtoClient::new(
            &config.logto_endpoint,
            config.client_id.clone(),
            config.client_secret.clone(),
        )?;
        let verifier = Arc::new(JwksVerifier::new(
            config.jwks_url.clone(),
            config.issuer_url.clone(),
            config.audience.clone(),
        ));
        let data_verifier = Arc::new(JwksVerifier::new(
            config.jwks_url.clone(),
            config.issuer_url.clone(),
            Some(config.data_api_audience.clone()),
        ));
        let queries = QueryCache::new(Duration::from_secs(config.query_stale_secs));

        Ok(Self {
            config,
            logto,
            verifier,
            data_verifier,
            queries,
        })
    }
}

/// Full HTTP surface: health, profile, data API, RPC, plus the cross-cutting layers.
pub fn router(state: Arc<AppState>) -> Router {
    let dashboard_origin = state.config.dashboard_origin.clone();

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/profile", get(profile))
        .route("/api/data", get(api::data::get_data))
        .nest("/api/trpc", rpc::rpc_router())
        .layer(middleware::from_fn_with_state(state.clone(), identity_context))
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors_layer(dashboard_origin))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
}

/// GET /api/profile: the caller's decoded claims, or null.
async fn profile(identity: Option<Extension<IdentityClaims>>) -> Json<Value> {
    Json(json!({ "claims": identity.map(|Extension(c)| c) }))
}

fn cors_layer(dashboard_origin: String) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            origin_str == dashboard_origin
                || origin_str.starts_with("http://localhost:")
                || origin_str.starts_with("http://127.0.0.1:")
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        // AllowHeaders::any() is not allowed together with allow_credentials(true)
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("authorization"),
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static("x-trpc-source"),
        ])
        .allow_credentials(true)
}

/// Middleware: injects a unique X-Request-Id into every response.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

/// Middleware: security headers on every response. Token values pass through
/// these responses, so nothing may be cached.
async fn security_headers_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));
    headers.remove("Server");

    resp
}
