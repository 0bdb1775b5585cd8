//! `pats.*` procedures: create, list and delete the caller's personal access
//! tokens. Each call exchanges client credentials for a Management API token,
//! makes one upstream request, and reshapes the result.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::IdentityClaims;
use crate::errors::AppError;
use crate::models::pat::{CreatePersonalAccessTokenRequest, Expiration, PatView, PersonalAccessToken};

use super::procedure::Procedure;

// ── Inputs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatInput {
    pub name: String,
    /// Epoch milliseconds, or -1 / absent for "never".
    #[serde(default)]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DeletePatInput {
    pub name: String,
}

// ── Handlers ─────────────────────────────────────────────────

/// pats.createPat: returns the new token, the only response carrying a fresh value.
pub async fn create(
    state: &AppState,
    claims: &IdentityClaims,
    input: CreatePatInput,
) -> Result<PatView, AppError> {
    validate_name(&input.name)?;
    let expiration = Expiration::from_client(input.expires_at)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let token = management_token(state).await?;
    let request = CreatePersonalAccessTokenRequest::new(input.name, expiration);
    let created = state
        .logto
        .create_personal_access_token(&claims.sub, &request, &token)
        .await?;

    state.queries.invalidate_session(&claims.sub);
    to_view(created)
}

/// pats.list: the caller's tokens, dates as dates.
pub async fn list(state: &AppState, claims: &IdentityClaims) -> Result<Vec<PatView>, AppError> {
    let key = Procedure::PatsList.path();
    if let Some(cached) = state.queries.get::<Vec<PatView>>(&claims.sub, key) {
        tracing::debug!(sub = %claims.sub, "pats.list served from session cache");
        return Ok(cached);
    }

    // a mutation finishing while we load makes this result stale
    let generation = state.queries.generation(&claims.sub);

    let token = management_token(state).await?;
    let pats = state
        .logto
        .list_personal_access_tokens(&claims.sub, &token)
        .await?;
    let views = pats.into_iter().map(to_view).collect::<Result<Vec<_>, _>>()?;

    match state.queries.set(&claims.sub, key, generation, &views) {
        Ok(true) => {}
        Ok(false) => tracing::debug!(sub = %claims.sub, "pats.list result not cached"),
        Err(e) => tracing::warn!("failed to cache pats.list result: {}", e),
    }
    Ok(views)
}

/// pats.delete: unknown names fail upstream and that failure is returned as-is.
pub async fn delete(
    state: &AppState,
    claims: &IdentityClaims,
    input: DeletePatInput,
) -> Result<Value, AppError> {
    validate_name(&input.name)?;

    let token = management_token(state).await?;
    state
        .logto
        .delete_personal_access_token(&claims.sub, &input.name, &token)
        .await?;

    state.queries.invalidate_session(&claims.sub);
    Ok(json!([]))
}

// ── Helpers ──────────────────────────────────────────────────

async fn management_token(state: &AppState) -> Result<String, AppError> {
    let token = state
        .logto
        .get_access_token(
            &state.config.management_resource,
            &state.config.management_scope,
        )
        .await?;
    Ok(token.access_token)
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name must be a non-empty string".into()));
    }
    Ok(())
}

fn to_view(pat: PersonalAccessToken) -> Result<PatView, AppError> {
    PatView::try_from(pat).map_err(|e| AppError::Internal(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_input_accepts_missing_expiry() {
        let input: CreatePatInput = serde_json::from_str(r#"{"name":"ci"}"#).unwrap();
        assert_eq!(input.expires_at, None);

        let input: CreatePatInput =
            serde_json::from_str(r#"{"name":"ci","expiresAt":-1}"#).unwrap();
        assert_eq!(input.expires_at, Some(-1));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("ci").is_ok());
        assert!(matches!(validate_name(""), Err(AppError::BadRequest(_))));
        assert!(matches!(validate_name("   "), Err(AppError::BadRequest(_))));
    }
}
