//! `GET /api/data`: a resource guarded by an access token for the data API
//! audience and the `read:generic_data` scope.

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::app::AppState;
use crate::auth::{bearer_token, require_scope};
use crate::errors::AppError;

pub const DATA_READ_SCOPE: &str = "read:generic_data";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    pub message: &'static str,
    pub subject: String,
    /// The raw space-separated scope claim.
    pub scopes: String,
    pub expires_at: Option<String>,
}

pub async fn get_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DataResponse>, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    let claims = state.data_verifier.verify(&token).await.map_err(|e| {
        tracing::info!("data API token rejected: {}", e);
        AppError::Unauthorized
    })?;
    require_scope(&claims, DATA_READ_SCOPE)?;

    let expires_at = claims
        .exp
        .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0))
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true));

    Ok(Json(DataResponse {
        message: "You have access to generic data!",
        subject: claims.sub,
        scopes: claims.scope.unwrap_or_default(),
        expires_at,
    }))
}
