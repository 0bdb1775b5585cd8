//! Caller identity: verifying Logto identity tokens and exposing the decoded
//! claims to RPC procedures.

pub mod claims;
pub mod context;
pub mod jwks;

pub use claims::IdentityClaims;
pub use context::{bearer_token, identity_context};
pub use jwks::{IdentityVerifier, JwksVerifier, VerifyError};

use crate::errors::AppError;

/// The authorization gate: a call proceeds iff identity claims are present.
pub fn require_identity(claims: Option<&IdentityClaims>) -> Result<&IdentityClaims, AppError> {
    claims.ok_or(AppError::Unauthorized)
}

/// Scope check for access tokens: the scope must be among the granted ones.
pub fn require_scope(claims: &IdentityClaims, scope: &str) -> Result<(), AppError> {
    if claims.has_scope(scope) {
        return Ok(());
    }
    tracing::warn!(
        sub = %claims.sub,
        granted = claims.scope.as_deref().unwrap_or(""),
        "access denied, missing scope {}",
        scope
    );
    Err(AppError::Forbidden(format!(
        "insufficient scope. Requires '{}'",
        scope
    )))
}
