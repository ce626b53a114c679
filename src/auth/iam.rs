//! IAM bearer tokens: cache, expiry check and refresh against the token endpoint.

use crate::transport::ReqwestTransport;
use crate::{Error, ErrorContext, Result};
use arc_swap::ArcSwapOption;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com/identity/token";

const APIKEY_GRANT: &str = "urn:ibm:params:oauth:grant-type:apikey";
const REFRESH_GRANT: &str = "refresh_token";
/// IAM client id/secret used by the public SDKs.
const IAM_CLIENT: (&str, &str) = ("bx", "bx");
const REFRESH_SKEW_SECS: i64 = 60;
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An IAM access token with optional refresh token and expiry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// `None` means the token is caller-managed and never refreshed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for IamToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamToken")
            .field("access_token", &"<redacted>")
            .field("refreshable", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl IamToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// True once `now` is within `skew` of the expiry.
    pub fn needs_refresh(&self, now: DateTime<Utc>, skew: chrono::Duration) -> bool {
        match self.expires_at {
            Some(exp) => now >= exp - skew,
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Absolute expiry, seconds since the epoch.
    #[serde(default)]
    expiration: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, now: DateTime<Utc>) -> IamToken {
        let expires_at = self
            .expiration
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .or_else(|| self.expires_in.map(|s| now + chrono::Duration::seconds(s)));
        IamToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

/// Caches the current token and refreshes it on demand.
///
/// Reads are lock-free through `ArcSwapOption`; refreshes are serialized so concurrent
/// callers holding the same expired token share a single token request.
pub struct IamTokenManager {
    iam_url: String,
    api_key: Option<String>,
    cached: ArcSwapOption<IamToken>,
    refresh_lock: tokio::sync::Mutex<()>,
    http: tokio::sync::OnceCell<reqwest::Client>,
    skew: chrono::Duration,
    refreshes: AtomicU64,
}

impl fmt::Debug for IamTokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamTokenManager")
            .field("iam_url", &self.iam_url)
            .field("refreshes", &self.refresh_count())
            .finish_non_exhaustive()
    }
}

impl IamTokenManager {
    pub fn new(iam_url: &str, api_key: Option<String>, token: Option<IamToken>) -> Self {
        Self {
            iam_url: iam_url.to_string(),
            api_key,
            cached: ArcSwapOption::from(token.map(Arc::new)),
            refresh_lock: tokio::sync::Mutex::new(()),
            http: tokio::sync::OnceCell::new(),
            skew: chrono::Duration::seconds(REFRESH_SKEW_SECS),
            refreshes: AtomicU64::new(0),
        }
    }

    pub fn iam_url(&self) -> &str {
        &self.iam_url
    }

    /// Number of token requests issued so far.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// The token endpoint client, built on first use and reused for every refresh.
    async fn http_client(&self) -> Result<&reqwest::Client> {
        self.http
            .get_or_try_init(|| async {
                ReqwestTransport::client_builder(TOKEN_REQUEST_TIMEOUT)
                    .build()
                    .map_err(|e| iam_error(format!("Failed to create HTTP client: {}", e)))
            })
            .await
    }

    fn current_valid(&self) -> Option<Arc<IamToken>> {
        self.cached
            .load_full()
            .filter(|t| !t.needs_refresh(Utc::now(), self.skew))
    }

    /// A usable access token, refreshing first when the cached one is missing or expiring.
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.current_valid() {
            return Ok(token.access_token.clone());
        }

        let _guard = self.refresh_lock.lock().await;
        // Another task may have refreshed while we waited.
        if let Some(token) = self.current_valid() {
            return Ok(token.access_token.clone());
        }

        let current = self.cached.load_full();
        let fresh = self.request_token(current.as_deref()).await?;
        let access = fresh.access_token.clone();
        self.cached.store(Some(Arc::new(fresh)));
        Ok(access)
    }

    async fn request_token(&self, current: Option<&IamToken>) -> Result<IamToken> {
        let form: Vec<(&str, String)> =
            match (current.and_then(|t| t.refresh_token.clone()), &self.api_key) {
                (Some(refresh), _) => vec![
                    ("grant_type", REFRESH_GRANT.to_string()),
                    ("refresh_token", refresh),
                ],
                (None, Some(key)) => vec![
                    ("grant_type", APIKEY_GRANT.to_string()),
                    ("apikey", key.clone()),
                    ("response_type", "cloud_iam".to_string()),
                ],
                (None, None) => {
                    return Err(Error::network_with_context(
                        "IAM access token expired and cannot be refreshed",
                        ErrorContext::new()
                            .with_source("iam")
                            .with_details("no refresh token or API key available"),
                    ))
                }
            };

        self.refreshes.fetch_add(1, Ordering::Relaxed);
        debug!(iam_url = self.iam_url.as_str(), grant = form[0].1.as_str(), "requesting IAM token");

        let resp = self
            .http_client()
            .await?
            .post(&self.iam_url)
            .basic_auth(IAM_CLIENT.0, Some(IAM_CLIENT.1))
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| iam_error(format!("IAM token request failed: {}", e)))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| iam_error(format!("Failed to read IAM response: {}", e)))?;

        if !status.is_success() {
            warn!(http_status = status.as_u16(), "IAM token request rejected");
            return Err(iam_error(format!("IAM token request returned HTTP {}", status)));
        }

        let parsed: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| iam_error(format!("Malformed IAM token response: {}", e)))?;
        Ok(parsed.into_token(Utc::now()))
    }
}

fn iam_error(msg: String) -> Error {
    Error::network_with_context(msg, ErrorContext::new().with_source("iam"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_without_expiry_never_refreshes() {
        let t = IamToken::new("abc");
        assert!(!t.needs_refresh(Utc::now(), chrono::Duration::seconds(60)));
    }

    #[test]
    fn refresh_window_includes_skew() {
        let now = Utc::now();
        let skew = chrono::Duration::seconds(60);
        let soon = IamToken::new("abc").with_expiry(now + chrono::Duration::seconds(30));
        assert!(soon.needs_refresh(now, skew));
        let later = IamToken::new("abc").with_expiry(now + chrono::Duration::seconds(600));
        assert!(!later.needs_refresh(now, skew));
    }

    #[test]
    fn token_response_prefers_absolute_expiration() {
        let now = Utc::now();
        let resp: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","token_type":"Bearer","expires_in":3600,"expiration":1900000000}"#,
        )
        .unwrap();
        let token = resp.into_token(now);
        assert_eq!(token.expires_at.map(|t| t.timestamp()), Some(1_900_000_000));
        assert_eq!(token.refresh_token.as_deref(), Some("r"));
    }

    #[tokio::test]
    async fn valid_cached_token_needs_no_request() {
        let token = IamToken::new("cached").with_expiry(Utc::now() + chrono::Duration::hours(1));
        let mgr = IamTokenManager::new("http://127.0.0.1:1/identity/token", None, Some(token));
        assert_eq!(mgr.access_token().await.unwrap(), "cached");
        assert_eq!(mgr.refresh_count(), 0);
    }

    #[tokio::test]
    async fn expired_token_without_refresh_path_is_network_error() {
        let token = IamToken::new("old").with_expiry(Utc::now() - chrono::Duration::hours(1));
        let mgr = IamTokenManager::new(DEFAULT_IAM_URL, None, Some(token));
        let err = mgr.access_token().await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Network);
        assert_eq!(mgr.refresh_count(), 0);
    }

    #[tokio::test]
    async fn token_client_is_built_once() {
        let mgr = IamTokenManager::new(DEFAULT_IAM_URL, Some("k".into()), None);
        assert!(!mgr.http.initialized());
        let first: *const reqwest::Client = mgr.http_client().await.unwrap();
        let second: *const reqwest::Client = mgr.http_client().await.unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(mgr.http.initialized());
    }
}
