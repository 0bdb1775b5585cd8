use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;

/// Middleware: decodes the caller's identity token into request extensions.
///
/// Never rejects. A missing or invalid token just leaves the call context
/// without claims; the RPC gate decides what that means.
pub async fn identity_context(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(req.headers()) {
        match state.verifier.verify(&token).await {
            Ok(claims) => {
                tracing::debug!(sub = %claims.sub, "identity token accepted");
                req.extensions_mut().insert(claims);
            }
            Err(e) => {
                tracing::debug!("identity token rejected: {}", e);
            }
        }
    }
    next.run(req).await
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}
