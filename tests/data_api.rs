//! Tests for `GET /api/data`, driven through the full router.
//!
//! The identity verifier rejects every token so a pass can only come from the
//! data API verifier.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use pat_dashboard::app::{self, AppState};
use pat_dashboard::auth::{IdentityClaims, IdentityVerifier, VerifyError};
use pat_dashboard::cache::QueryCache;
use pat_dashboard::config;
use pat_dashboard::logto::LogtoClient;

const SCOPED_TOKEN: &str = "scoped-token";
const UNSCOPED_TOKEN: &str = "unscoped-token";
const EXP: i64 = 1_900_000_000;

struct RejectAll;

#[async_trait]
impl IdentityVerifier for RejectAll {
    async fn verify(&self, _token: &str) -> Result<IdentityClaims, VerifyError> {
        Err(VerifyError::MissingSubject)
    }
}

struct AccessTokens;

#[async_trait]
impl IdentityVerifier for AccessTokens {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, VerifyError> {
        let mut claims = IdentityClaims::for_subject("user-1");
        claims.exp = Some(EXP);
        match token {
            SCOPED_TOKEN => {
                claims.scope = Some("openid read:generic_data".into());
                Ok(claims)
            }
            UNSCOPED_TOKEN => {
                claims.scope = Some("openid profile".into());
                Ok(claims)
            }
            _ => Err(VerifyError::MissingSubject),
        }
    }
}

fn state() -> Arc<AppState> {
    let cfg = config::from_lookup(|key| match key {
        "CLIENT_ID" => Some("m2m-app".into()),
        "CLIENT_SECRET" => Some("m2m-secret".into()),
        _ => None,
    })
    .unwrap();
    let logto = LogtoClient::new(&cfg.logto_endpoint, "m2m-app", "m2m-secret").unwrap();
    Arc::new(AppState {
        config: cfg,
        logto,
        verifier: Arc::new(RejectAll),
        data_verifier: Arc::new(AccessTokens),
        queries: QueryCache::new(Duration::ZERO),
    })
}

async fn get_data(token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("GET").uri("/api/data");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let resp = app::router(state())
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_missing_bearer_is_unauthorized() {
    let (status, body) = get_data(None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["data"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_rejected_token_is_unauthorized() {
    let (status, body) = get_data(Some("forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], -32001);
}

#[tokio::test]
async fn test_missing_scope_is_forbidden() {
    let (status, body) = get_data(Some(UNSCOPED_TOKEN)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"]["message"],
        "Forbidden: insufficient scope. Requires 'read:generic_data'"
    );
    assert_eq!(body["error"]["code"], -32003);
    assert_eq!(body["error"]["data"]["httpStatus"], 403);
}

#[tokio::test]
async fn test_scoped_token_gets_data() {
    let (status, body) = get_data(Some(SCOPED_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "You have access to generic data!");
    assert_eq!(body["subject"], "user-1");
    assert_eq!(body["scopes"], "openid read:generic_data");
    assert_eq!(body["expiresAt"], "2030-03-17T17:46:40Z");
}
