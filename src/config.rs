use std::str::FromStr;

pub const DEFAULT_LOGTO_ENDPOINT: &str = "http://localhost:3001";
pub const DEFAULT_MANAGEMENT_RESOURCE: &str = "https://default.logto.app/api";
pub const DEFAULT_MANAGEMENT_SCOPE: &str = "all";
pub const DEFAULT_DATA_API_AUDIENCE: &str = "https://backend";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Base URL of the Logto tenant, without trailing slash.
    pub logto_endpoint: String,
    /// Machine-to-machine app used for the client-credentials grant.
    pub client_id: String,
    pub client_secret: String,
    /// Management API resource indicator requested with the grant.
    pub management_resource: String,
    pub management_scope: String,
    /// Expected `iss` of identity tokens.
    pub issuer_url: String,
    /// Expected `aud` of identity tokens. Not checked when unset.
    pub audience: Option<String>,
    pub jwks_url: String,
    /// Expected `aud` of access tokens presented to `/api/data`.
    pub data_api_audience: String,
    /// Browser origin allowed by CORS (localhost is always allowed).
    pub dashboard_origin: String,
    /// How long `pats.list` results stay fresh per session. 0 = no caching.
    pub query_stale_secs: u64,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build the config from any key lookup (the environment, in production).
pub fn from_lookup<F>(get: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

    let client_id = non_empty("CLIENT_ID");
    let client_secret = non_empty("CLIENT_SECRET");

    if client_id.is_none() || client_secret.is_none() {
        let env_mode = non_empty("DASHBOARD_ENV")
            .or_else(|| non_empty("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "CLIENT_ID and CLIENT_SECRET must be set to the Logto machine-to-machine \
                 app credentials before running in production."
            );
        }
        tracing::warn!(
            "CLIENT_ID or CLIENT_SECRET not set; Management API calls will be rejected by Logto."
        );
    }

    let logto_endpoint = non_empty("LOGTO_ENDPOINT")
        .unwrap_or_else(|| DEFAULT_LOGTO_ENDPOINT.into())
        .trim_end_matches('/')
        .to_string();

    let issuer_url = non_empty("ISSUER_URL").unwrap_or_else(|| format!("{}/oidc", logto_endpoint));

    let jwks_url = match non_empty("JWKS_URL") {
        Some(url) => url,
        None => {
            let derived = format!("{}/jwks", issuer_url.trim_end_matches('/'));
            tracing::info!("JWKS_URL not set, deriving as: {}", derived);
            derived
        }
    };

    Ok(Config {
        port: parse_or_default("DASHBOARD_PORT", non_empty("DASHBOARD_PORT"), 3000),
        logto_endpoint,
        client_id: client_id.unwrap_or_default(),
        client_secret: client_secret.unwrap_or_default(),
        management_resource: non_empty("LOGTO_MANAGEMENT_RESOURCE")
            .unwrap_or_else(|| DEFAULT_MANAGEMENT_RESOURCE.into()),
        management_scope: non_empty("LOGTO_MANAGEMENT_SCOPE")
            .unwrap_or_else(|| DEFAULT_MANAGEMENT_SCOPE.into()),
        issuer_url,
        audience: non_empty("AUDIENCE"),
        jwks_url,
        data_api_audience: non_empty("DATA_API_AUDIENCE")
            .unwrap_or_else(|| DEFAULT_DATA_API_AUDIENCE.into()),
        dashboard_origin: non_empty("DASHBOARD_ORIGIN")
            .unwrap_or_else(|| "http://localhost:3000".into()),
        query_stale_secs: parse_or_default("QUERY_STALE_SECS", non_empty("QUERY_STALE_SECS"), 30),
    })
}

/// Parse an optional value, warning and keeping the default when it is malformed.
fn parse_or_default<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!("{}={:?} is not valid, using default {}", key, raw, default);
            default
        }
    }
}
