// Personal access token shapes: what Logto stores, what we send it, and what
// RPC callers get back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel used by the dashboard for "this token never expires".
pub const NEVER_EXPIRES: i64 = -1;

/// A PAT record as returned by the Logto Management API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalAccessToken {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    pub value: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds. `None` means the token never expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// Body of `POST /api/users/{userId}/personal-access-tokens`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePersonalAccessTokenRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl CreatePersonalAccessTokenRequest {
    pub fn new(name: impl Into<String>, expiration: Expiration) -> Self {
        Self {
            name: name.into(),
            expires_at: expiration.as_millis(),
        }
    }
}

/// When a new token should expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    Never,
    /// Epoch milliseconds.
    At(i64),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("expiresAt must be a positive epoch millisecond value or -1, got {0}")]
pub struct InvalidExpiration(pub i64);

impl Expiration {
    /// Parse the client encoding: absent or `-1` means never.
    pub fn from_client(raw: Option<i64>) -> Result<Self, InvalidExpiration> {
        match raw {
            None | Some(NEVER_EXPIRES) => Ok(Expiration::Never),
            Some(ms) if ms > 0 => Ok(Expiration::At(ms)),
            Some(other) => Err(InvalidExpiration(other)),
        }
    }

    /// Expiration `days` from `now`, as offered by the dashboard presets.
    /// `None` when the date falls outside the representable range.
    pub fn in_days(now: DateTime<Utc>, days: u32) -> Option<Self> {
        let delta = chrono::Duration::try_days(i64::from(days))?;
        let at = now.checked_add_signed(delta)?;
        Some(Expiration::At(at.timestamp_millis()))
    }

    pub fn as_millis(self) -> Option<i64> {
        match self {
            Expiration::Never => None,
            Expiration::At(ms) => Some(ms),
        }
    }
}

/// A PAT reshaped for RPC callers: dates instead of epoch numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatView {
    pub name: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("timestamp {0} is out of range")]
pub struct TimestampOutOfRange(pub i64);

impl TryFrom<PersonalAccessToken> for PatView {
    type Error = TimestampOutOfRange;

    fn try_from(pat: PersonalAccessToken) -> Result<Self, Self::Error> {
        let created_at = millis_to_datetime(pat.created_at)?;
        let expires_at = pat.expires_at.map(millis_to_datetime).transpose()?;
        Ok(PatView {
            name: pat.name,
            value: pat.value,
            created_at,
            expires_at,
        })
    }
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, TimestampOutOfRange> {
    DateTime::<Utc>::from_timestamp_millis(ms).ok_or(TimestampOutOfRange(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_never_sentinel_and_absent_mean_never() {
        assert_eq!(Expiration::from_client(None), Ok(Expiration::Never));
        assert_eq!(Expiration::from_client(Some(-1)), Ok(Expiration::Never));
    }

    #[test]
    fn test_rejects_zero_and_other_negatives() {
        assert_eq!(Expiration::from_client(Some(0)), Err(InvalidExpiration(0)));
        assert_eq!(Expiration::from_client(Some(-5)), Err(InvalidExpiration(-5)));
    }

    #[test]
    fn test_create_request_omits_expiration_when_never() {
        let req = CreatePersonalAccessTokenRequest::new("ci", Expiration::Never);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "ci" }));
        assert!(json.get("expiresAt").is_none());
    }

    #[test]
    fn test_create_request_keeps_expiration() {
        let req = CreatePersonalAccessTokenRequest::new("ci", Expiration::At(1_750_000_000_000));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["expiresAt"], 1_750_000_000_000i64);
    }

    #[test]
    fn test_in_days() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let exp = Expiration::in_days(now, 7);
        let expected = Utc.with_ymd_and_hms(2025, 6, 8, 0, 0, 0).unwrap();
        assert_eq!(exp, Some(Expiration::At(expected.timestamp_millis())));
    }

    #[test]
    fn test_in_days_out_of_range() {
        assert_eq!(Expiration::in_days(Utc::now(), u32::MAX), None);
        assert_eq!(Expiration::in_days(DateTime::<Utc>::MAX_UTC, 1), None);
    }

    #[test]
    fn test_upstream_token_tolerates_missing_fields() {
        let pat: PersonalAccessToken = serde_json::from_str(
            r#"{"name":"ci","value":"pat_abc","createdAt":1700000000000}"#,
        )
        .unwrap();
        assert_eq!(pat.expires_at, None);
        assert_eq!(pat.tenant_id, "");
    }

    #[test]
    fn test_view_serializes_dates_not_numbers() {
        let pat = PersonalAccessToken {
            tenant_id: "default".into(),
            user_id: "u1".into(),
            name: "ci".into(),
            value: "pat_abc".into(),
            created_at: 1_700_000_000_000,
            expires_at: Some(1_800_000_000_000),
        };
        let view = PatView::try_from(pat).unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["createdAt"].is_string());
        assert!(json["expiresAt"].is_string());
        assert_eq!(json["createdAt"], "2023-11-14T22:13:20Z");
        assert!(json.get("tenantId").is_none());
    }

    #[test]
    fn test_view_null_expiry() {
        let pat = PersonalAccessToken {
            tenant_id: String::new(),
            user_id: String::new(),
            name: "forever".into(),
            value: "pat_x".into(),
            created_at: 0,
            expires_at: None,
        };
        let json = serde_json::to_value(PatView::try_from(pat).unwrap()).unwrap();
        assert!(json["expiresAt"].is_null());
    }

    #[test]
    fn test_view_rejects_out_of_range_timestamp() {
        let pat = PersonalAccessToken {
            tenant_id: String::new(),
            user_id: String::new(),
            name: "bad".into(),
            value: "pat_x".into(),
            created_at: i64::MAX,
            expires_at: None,
        };
        assert_eq!(PatView::try_from(pat), Err(TimestampOutOfRange(i64::MAX)));
    }
}
