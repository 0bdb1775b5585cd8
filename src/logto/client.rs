/// HTTP client for Logto's token endpoint and Management API.
/// One request per call: no retries, failures go straight back to the caller.
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::models::pat::{CreatePersonalAccessTokenRequest, PersonalAccessToken};
use crate::models::token::{AccessTokenResponse, TokenExchangeResponse};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const TOKEN_EXCHANGE_GRANT: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
const PAT_SUBJECT_TOKEN_TYPE: &str = "urn:logto:token-type:personal_access_token";

#[derive(Debug, thiserror::Error)]
pub enum LogtoError {
    #[error("{0}")]
    InvalidArgument(&'static str),

    #[error("failed to fetch access token, status {status}: {message}")]
    TokenEndpoint { status: u16, message: String },

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("API request returned status {status} (expected {expected}): {message}")]
    UnexpectedStatus {
        expected: u16,
        status: u16,
        message: String,
    },

    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid identity provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl LogtoError {
    /// HTTP status reported by Logto, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            LogtoError::TokenEndpoint { status, .. }
            | LogtoError::Api { status, .. }
            | LogtoError::UnexpectedStatus { status, .. } => Some(*status),
            LogtoError::Transport(e) => e.status().map(|s| s.as_u16()),
            LogtoError::InvalidArgument(_) | LogtoError::Decode(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Clone)]
pub struct LogtoClient {
    http: reqwest::Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
}

impl std::fmt::Debug for LogtoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogtoClient")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl LogtoClient {
    pub fn new(
        endpoint: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, LogtoError> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    // ── OIDC token endpoint ──────────────────────────────────

    /// Client-credentials grant for a Management API access token.
    pub async fn get_access_token(
        &self,
        resource: &str,
        scope: &str,
    ) -> Result<AccessTokenResponse, LogtoError> {
        let body = form_body(&[
            ("grant_type", "client_credentials"),
            ("resource", resource),
            ("scope", scope),
        ]);

        let req = self
            .http
            .post(self.token_url())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body);

        let resp = self.send_token_request(req).await?;
        decode_json(resp).await
    }

    /// Token-exchange grant: trade a PAT for an access token.
    pub async fn exchange_personal_access_token(
        &self,
        pat: &str,
        resource: Option<&str>,
        scope: Option<&str>,
    ) -> Result<TokenExchangeResponse, LogtoError> {
        if pat.is_empty() {
            return Err(LogtoError::InvalidArgument(
                "a personal access token is required for token exchange",
            ));
        }

        let mut pairs = vec![
            ("grant_type", TOKEN_EXCHANGE_GRANT),
            ("subject_token", pat),
            ("subject_token_type", PAT_SUBJECT_TOKEN_TYPE),
            ("client_id", self.client_id.as_str()),
        ];
        if let Some(scope) = scope.filter(|s| !s.is_empty()) {
            pairs.push(("scope", scope));
        }
        if let Some(resource) = resource.filter(|r| !r.is_empty()) {
            pairs.push(("resource", resource));
        }

        let mut req = self
            .http
            .post(self.token_url())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(form_body(&pairs));
        if !self.client_secret.is_empty() {
            req = req.basic_auth(&self.client_id, Some(&self.client_secret));
        }

        let resp = self.send_token_request(req).await?;
        decode_json(resp).await
    }

    async fn send_token_request(&self, req: RequestBuilder) -> Result<Response, LogtoError> {
        let resp = req.send().await.map_err(|e| {
            tracing::warn!("Logto token request failed: {}", e);
            LogtoError::Transport(e)
        })?;

        let status = resp.status();
        if !status.is_success() {
            let message = error_message(resp).await;
            tracing::error!(
                "Error fetching access token ({}): {}",
                status.as_u16(),
                message
            );
            return Err(LogtoError::TokenEndpoint {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    // ── Management API: personal access tokens ───────────────

    pub async fn list_personal_access_tokens(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Vec<PersonalAccessToken>, LogtoError> {
        if user_id.is_empty() {
            return Err(LogtoError::InvalidArgument(
                "user ID is required to list personal access tokens",
            ));
        }
        tracing::debug!("Fetching personal access tokens for user: {}", user_id);

        let path = pats_path(user_id);
        let resp = self
            .execute(Method::GET, &path, self.api_request(Method::GET, &path, token))
            .await?;
        decode_json(resp).await
    }

    /// Create a token. Logto answers `201 Created` with the new token, value included.
    pub async fn create_personal_access_token(
        &self,
        user_id: &str,
        request: &CreatePersonalAccessTokenRequest,
        token: &str,
    ) -> Result<PersonalAccessToken, LogtoError> {
        if user_id.is_empty() || request.name.is_empty() {
            return Err(LogtoError::InvalidArgument(
                "user ID and token name are required to create a personal access token",
            ));
        }
        tracing::info!(
            "Creating personal access token for user {} with name: {}",
            user_id,
            request.name
        );

        let path = pats_path(user_id);
        let req = self.api_request(Method::POST, &path, token).json(request);
        let resp = self.execute(Method::POST, &path, req).await?;
        let resp = expect_status(resp, StatusCode::CREATED).await?;
        decode_json(resp).await
    }

    /// Delete a token by name. Logto answers `204 No Content`.
    pub async fn delete_personal_access_token(
        &self,
        user_id: &str,
        name: &str,
        token: &str,
    ) -> Result<(), LogtoError> {
        if user_id.is_empty() || name.is_empty() {
            return Err(LogtoError::InvalidArgument(
                "user ID and token name are required to delete a personal access token",
            ));
        }
        tracing::info!(
            "Deleting personal access token with name \"{}\" for user: {}",
            name,
            user_id
        );

        let path = format!("{}/{}", pats_path(user_id), urlencoding::encode(name));
        let req = self.api_request(Method::DELETE, &path, token);
        let resp = self.execute(Method::DELETE, &path, req).await?;
        expect_status(resp, StatusCode::NO_CONTENT).await?;

        tracing::info!("Successfully deleted token: {}", name);
        Ok(())
    }

    fn api_request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.endpoint, path))
            .bearer_auth(token)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        req: RequestBuilder,
    ) -> Result<Response, LogtoError> {
        let resp = req.send().await.map_err(|e| {
            tracing::warn!("Logto API request {} {} failed: {}", method, path, e);
            LogtoError::Transport(e)
        })?;

        let status = resp.status();
        if !status.is_success() {
            let message = error_message(resp).await;
            tracing::error!(
                "API Error ({}) for {} {}: {}",
                status.as_u16(),
                method,
                path,
                message
            );
            return Err(LogtoError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    fn token_url(&self) -> String {
        format!("{}/oidc/token", self.endpoint)
    }
}

fn pats_path(user_id: &str) -> String {
    format!(
        "/api/users/{}/personal-access-tokens",
        urlencoding::encode(user_id)
    )
}

fn form_body(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().copied())
        .finish()
}

async fn expect_status(resp: Response, expected: StatusCode) -> Result<Response, LogtoError> {
    let status = resp.status();
    if status == expected {
        return Ok(resp);
    }
    let message = error_message(resp).await;
    Err(LogtoError::UnexpectedStatus {
        expected: expected.as_u16(),
        status: status.as_u16(),
        message,
    })
}

async fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T, LogtoError> {
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Upstream error text: the JSON `message` field, else the reason phrase.
async fn error_message(resp: Response) -> String {
    let fallback = resp
        .status()
        .canonical_reason()
        .unwrap_or("Unknown error")
        .to_string();

    let Ok(bytes) = resp.bytes().await else {
        return fallback;
    };
    match serde_json::from_slice::<ErrorBody>(&bytes) {
        Ok(body) => body
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Unknown error".to_string()),
        Err(_) => fallback,
    }
}
