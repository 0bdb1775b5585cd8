use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::logto::LogtoError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("UNAUTHORIZED")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("No procedure found on path \"{0}\"")]
    ProcedureNotFound(String),

    #[error("Unsupported {method} request to {kind} procedure at path \"{path}\"")]
    MethodNotSupported {
        method: String,
        kind: &'static str,
        path: String,
    },

    #[error(transparent)]
    Upstream(#[from] LogtoError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// RPC error codes, named and numbered the way tRPC clients expect them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotSupported,
    InternalServerError,
}

impl RpcCode {
    pub fn name(self) -> &'static str {
        match self {
            RpcCode::BadRequest => "BAD_REQUEST",
            RpcCode::Unauthorized => "UNAUTHORIZED",
            RpcCode::Forbidden => "FORBIDDEN",
            RpcCode::NotFound => "NOT_FOUND",
            RpcCode::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            RpcCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    /// JSON-RPC 2.0 error number.
    pub fn json_rpc_code(self) -> i32 {
        match self {
            RpcCode::BadRequest => -32600,
            RpcCode::Unauthorized => -32001,
            RpcCode::Forbidden => -32003,
            RpcCode::NotFound => -32004,
            RpcCode::MethodNotSupported => -32005,
            RpcCode::InternalServerError => -32603,
        }
    }

    pub fn http_status(self) -> StatusCode {
        match self {
            RpcCode::BadRequest => StatusCode::BAD_REQUEST,
            RpcCode::Unauthorized => StatusCode::UNAUTHORIZED,
            RpcCode::Forbidden => StatusCode::FORBIDDEN,
            RpcCode::NotFound => StatusCode::NOT_FOUND,
            RpcCode::MethodNotSupported => StatusCode::METHOD_NOT_ALLOWED,
            RpcCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AppError {
    pub fn code(&self) -> RpcCode {
        match self {
            AppError::Unauthorized => RpcCode::Unauthorized,
            AppError::BadRequest(_) => RpcCode::BadRequest,
            AppError::Forbidden(_) => RpcCode::Forbidden,
            AppError::Upstream(LogtoError::InvalidArgument(_)) => RpcCode::BadRequest,
            AppError::ProcedureNotFound(_) => RpcCode::NotFound,
            AppError::MethodNotSupported { .. } => RpcCode::MethodNotSupported,
            AppError::Upstream(_) | AppError::Internal(_) => RpcCode::InternalServerError,
        }
    }

    /// Error envelope for a call on `path`.
    pub fn into_rpc_response(self, path: Option<&str>) -> Response {
        let code = self.code();

        let message = match &self {
            AppError::Upstream(e) => {
                tracing::warn!("upstream error: {}", e);
                e.to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut data = Map::new();
        data.insert("code".into(), json!(code.name()));
        data.insert("httpStatus".into(), json!(code.http_status().as_u16()));
        data.insert("path".into(), json!(path));
        if let AppError::Upstream(e) = &self {
            if let Some(status) = e.status() {
                data.insert("upstreamStatus".into(), json!(status));
            }
        }

        let body = Json(json!({
            "error": {
                "message": message,
                "code": code.json_rpc_code(),
                "data": Value::Object(data),
            }
        }));

        (code.http_status(), body).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_rpc_response(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_envelope() {
        let resp = AppError::Unauthorized.into_rpc_response(Some("pats.list"));
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["message"], "UNAUTHORIZED");
        assert_eq!(body["error"]["code"], -32001);
        assert_eq!(body["error"]["data"]["code"], "UNAUTHORIZED");
        assert_eq!(body["error"]["data"]["httpStatus"], 401);
        assert_eq!(body["error"]["data"]["path"], "pats.list");
    }

    #[tokio::test]
    async fn test_upstream_envelope_keeps_status_and_message() {
        let err = AppError::from(LogtoError::Api {
            status: 422,
            message: "Name already in use.".into(),
        });
        let resp = err.into_rpc_response(Some("pats.createPat"));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(
            body["error"]["message"],
            "API request failed with status 422: Name already in use."
        );
        assert_eq!(body["error"]["data"]["upstreamStatus"], 422);
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let resp = AppError::Internal(anyhow::anyhow!("secret detail")).into_response();
        let body = body_json(resp).await;
        assert_eq!(body["error"]["message"], "internal server error");
        assert!(body["error"]["data"]["path"].is_null());
        assert!(body["error"]["data"].get("upstreamStatus").is_none());
    }

    #[test]
    fn test_invalid_argument_maps_to_bad_request() {
        let err = AppError::from(LogtoError::InvalidArgument("name required"));
        assert_eq!(err.code(), RpcCode::BadRequest);
    }

    #[tokio::test]
    async fn test_forbidden_envelope() {
        let resp = AppError::Forbidden("insufficient scope".into()).into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["message"], "Forbidden: insufficient scope");
        assert_eq!(body["error"]["code"], -32003);
        assert_eq!(body["error"]["data"]["code"], "FORBIDDEN");
    }
}
