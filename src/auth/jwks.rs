//! Identity-token verification against the provider's JWKS.
//!
//! Workflow for each bearer token:
//! 1. Decode the header, pin the algorithm (RS256 / ES384) and read `kid`
//! 2. Look the key up in the cached JWKS, refetching on a miss unless the
//!    cached set is younger than the refetch interval
//! 3. Verify signature, expiry, issuer and (when configured) audience
//!
//! Keys are cached per verifier instance with a 1-hour TTL. Unknown `kid`s
//! trigger at most one refetch per 30 seconds.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::claims::IdentityClaims;

const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);
const JWKS_MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(30);
const CLOCK_SKEW_SECS: u64 = 60;

// ── Types ────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("unsupported algorithm {0:?}")]
    UnsupportedAlgorithm(Algorithm),
    #[error("missing key id")]
    MissingKeyId,
    #[error("signing key not found in JWKS")]
    KeyNotFound,
    #[error("missing subject")]
    MissingSubject,
    #[error("JWKS fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Turns a bearer token into identity claims, or refuses it.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, VerifyError>;
}

struct CachedJwks {
    jwks: JwkSet,
    fetched_at: Instant,
}

pub struct JwksVerifier {
    client: reqwest::Client,
    jwks_url: String,
    issuer: String,
    audience: Option<String>,
    min_refetch: Duration,
    cache: RwLock<Option<CachedJwks>>,
}

// ── JWKS Cache ───────────────────────────────────────────────

impl JwksVerifier {
    pub fn new(jwks_url: impl Into<String>, issuer: impl Into<String>, audience: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            jwks_url: jwks_url.into(),
            issuer: issuer.into(),
            audience,
            min_refetch: JWKS_MIN_REFETCH_INTERVAL,
            cache: RwLock::new(None),
        }
    }

    async fn cached_jwks(&self) -> Result<JwkSet, VerifyError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.fetched_at.elapsed() < JWKS_CACHE_TTL {
                return Ok(cached.jwks.clone());
            }
        }
        self.refresh_jwks().await
    }

    /// Refetch after a `kid` miss, unless the cached set is too fresh.
    async fn refetch_on_miss(&self) -> Result<Option<JwkSet>, VerifyError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.fetched_at.elapsed() < self.min_refetch {
                return Ok(None);
            }
        }
        self.refresh_jwks().await.map(Some)
    }

    async fn refresh_jwks(&self) -> Result<JwkSet, VerifyError> {
        tracing::info!(jwks_url = %self.jwks_url, "Fetching JWKS keys");
        let jwks: JwkSet = self
            .client
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        *self.cache.write().await = Some(CachedJwks {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
        });
        Ok(jwks)
    }
}

// ── JWT Validation ───────────────────────────────────────────

#[async_trait]
impl IdentityVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, VerifyError> {
        let header = decode_header(token)?;
        if !matches!(header.alg, Algorithm::RS256 | Algorithm::ES384) {
            return Err(VerifyError::UnsupportedAlgorithm(header.alg));
        }
        let kid = header.kid.as_deref().ok_or(VerifyError::MissingKeyId)?;

        let jwks = self.cached_jwks().await?;
        let jwk = match jwks.find(kid) {
            Some(jwk) => jwk.clone(),
            None => {
                // key rotation: one refetch before giving up
                let fresh = self.refetch_on_miss().await?.ok_or(VerifyError::KeyNotFound)?;
                fresh.find(kid).cloned().ok_or(VerifyError::KeyNotFound)?
            }
        };
        let key = DecodingKey::from_jwk(&jwk)?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[self.issuer.as_str()]);
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud.as_str()]),
            None => validation.validate_aud = false,
        }
        validation.leeway = CLOCK_SKEW_SECS;

        let data = decode::<IdentityClaims>(token, &key, &validation)?;
        if data.claims.sub.is_empty() {
            return Err(VerifyError::MissingSubject);
        }
        Ok(data.claims)
    }
}

// ── Tests ────────────────────────────────────────────────────
