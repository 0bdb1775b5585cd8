//! tRPC-shaped RPC surface mounted at `/api/trpc`.
//!
//! `GET /api/trpc/{procedure}?input=<json>` runs a query,
//! `POST /api/trpc/{procedure}` with a JSON body runs a mutation.
//! Results come back as `{"result":{"data":...}}`, failures as the error
//! envelope built by [`AppError::into_rpc_response`].

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::Method,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::{require_identity, IdentityClaims};
use crate::errors::AppError;

pub mod hello;
pub mod pats;
pub mod procedure;

pub use procedure::{Procedure, ProcedureKind};

#[derive(Debug, Default, Deserialize)]
pub struct RpcQuery {
    /// URL-encoded JSON input for queries.
    pub input: Option<String>,
}

/// Build the RPC router. The caller mounts it under `/api/trpc`.
pub fn rpc_router() -> Router<Arc<AppState>> {
    Router::new().route("/:procedure", get(handle).post(handle))
}

async fn handle(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path(path): Path<String>,
    Query(query): Query<RpcQuery>,
    identity: Option<Extension<IdentityClaims>>,
    body: Bytes,
) -> Response {
    let claims = identity.as_ref().map(|Extension(c)| c);
    match dispatch(&state, &method, &path, &query, &body, claims).await {
        Ok(data) => Json(json!({ "result": { "data": data } })).into_response(),
        Err(e) => {
            tracing::info!(procedure = %path, code = e.code().name(), "rpc call failed");
            e.into_rpc_response(Some(&path))
        }
    }
}

/// Lookup, method check, authorization gate, input, then the handler.
pub async fn dispatch(
    state: &AppState,
    method: &Method,
    path: &str,
    query: &RpcQuery,
    body: &[u8],
    claims: Option<&IdentityClaims>,
) -> Result<Value, AppError> {
    let procedure =
        Procedure::from_path(path).ok_or_else(|| AppError::ProcedureNotFound(path.to_string()))?;

    let kind = procedure.kind();
    if *method != kind.method() {
        return Err(AppError::MethodNotSupported {
            method: method.to_string(),
            kind: kind.as_str(),
            path: path.to_string(),
        });
    }

    // every procedure is protected
    let claims = require_identity(claims)?;

    let raw_input: Option<&[u8]> = match kind {
        ProcedureKind::Query => query.input.as_deref().map(str::as_bytes),
        ProcedureKind::Mutation => Some(body).filter(|b| !b.is_empty()),
    };

    match procedure {
        Procedure::HelloTest => Ok(json!(hello::test())),
        Procedure::PatsList => to_data(pats::list(state, claims).await?),
        Procedure::PatsCreate => {
            let input = parse_input(raw_input)?;
            to_data(pats::create(state, claims, input).await?)
        }
        Procedure::PatsDelete => {
            let input = parse_input(raw_input)?;
            pats::delete(state, claims, input).await
        }
    }
}

fn parse_input<T: DeserializeOwned>(raw: Option<&[u8]>) -> Result<T, AppError> {
    let raw = raw.ok_or_else(|| AppError::BadRequest("input is required".into()))?;
    serde_json::from_slice(raw).map_err(|e| AppError::BadRequest(format!("invalid input: {}", e)))
}

fn to_data<T: serde::Serialize>(value: T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pats::CreatePatInput;

    #[test]
    fn test_parse_input_requires_body() {
        let err = parse_input::<CreatePatInput>(None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_parse_input_rejects_wrong_types() {
        let err = parse_input::<CreatePatInput>(Some(br#"{"name": 42}"#)).unwrap_err();
        assert!(err.to_string().starts_with("invalid input"));
    }

    #[test]
    fn test_parse_input_ok() {
        let input: CreatePatInput =
            parse_input(Some(br#"{"name":"ci","expiresAt":1750000000000}"#)).unwrap();
        assert_eq!(input.name, "ci");
        assert_eq!(input.expires_at, Some(1_750_000_000_000));
    }
}
