//! SDK configuration file: per-service credentials plus dispatch knobs.
//!
//! ```json
//! {
//!   "credentials": [
//!     { "service_id": "compare-comply", "url": "https://...", "apikey": "..." }
//!   ],
//!   "timeout": 30.0,
//!   "maxRestConnections": 5
//! }
//! ```

use crate::auth::{CredentialStore, Credentials, IamToken};
use crate::client::{ClientContext, DEFAULT_MAX_REST_CONNECTIONS, DEFAULT_TIMEOUT};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Credentials record for one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialInfo {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "user", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, rename = "apikey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Caller-managed IAM access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_url: Option<String>,
}

/// The `{"credentials": {...}}` blob a service instance hands out.
#[derive(Debug, Serialize, Deserialize)]
struct ServiceCredentialsBlob {
    credentials: BlobFields,
}

#[derive(Debug, Serialize, Deserialize)]
struct BlobFields {
    url: String,
    username: String,
    password: String,
}

impl CredentialInfo {
    /// Render as a single-service credentials blob.
    pub fn make_json(&self) -> Result<String> {
        let blob = ServiceCredentialsBlob {
            credentials: BlobFields {
                url: self.url.clone(),
                username: self.username.clone().unwrap_or_default(),
                password: self.password.clone().unwrap_or_default(),
            },
        };
        Ok(serde_json::to_string_pretty(&blob)?)
    }

    /// Parse a single-service credentials blob (`url`, `username`, `password`).
    pub fn parse_json(json: &str) -> Result<Self> {
        let blob: ServiceCredentialsBlob = serde_json::from_str(json)?;
        Ok(Self {
            url: blob.credentials.url,
            username: Some(blob.credentials.username),
            password: Some(blob.credentials.password),
            ..Self::default()
        })
    }

    /// Build runtime credentials. API key wins over token, token over user/password.
    pub fn to_credentials(&self) -> Credentials {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        let creds = if let Some(key) = non_empty(&self.api_key) {
            Credentials::iam_api_key(key)
        } else if let Some(token) = non_empty(&self.token) {
            Credentials::iam_token(IamToken::new(token))
        } else if let (Some(u), Some(p)) = (non_empty(&self.username), non_empty(&self.password)) {
            Credentials::basic(u, p)
        } else {
            Credentials::none()
        };
        let creds = match non_empty(&self.iam_url) {
            Some(iam_url) => creds.with_iam_url(iam_url),
            None => creds,
        };
        creds.with_url(self.url.clone())
    }
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT.as_secs_f64()
}

fn default_max_rest_connections() -> usize {
    DEFAULT_MAX_REST_CONNECTIONS
}

/// Configuration loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    /// Maximum concurrent requests to the service back-ends.
    #[serde(default = "default_max_rest_connections")]
    pub max_rest_connections: usize,
    #[serde(default)]
    pub credentials: Vec<CredentialInfo>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_rest_connections: default_max_rest_connections(),
            credentials: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Config = serde_json::from_str(json).map_err(|e| {
            Error::configuration_with_context(
                format!("Failed to parse config: {}", e),
                ErrorContext::new().with_source("config"),
            )
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a config file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("Failed to read config: {}", e),
                ErrorContext::new()
                    .with_source("config")
                    .with_details(path.display().to_string()),
            )
        })?;
        let mut cfg = Self::from_json(&raw)?;
        cfg.apply_env_overrides();
        debug!(
            path = %path.display(),
            services = cfg.credentials.len(),
            "loaded configuration"
        );
        Ok(cfg)
    }

    /// Apply `WATSON_TIMEOUT_SECS` and `WATSON_MAX_REST_CONNECTIONS` when set and valid.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|k| std::env::var(k).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("WATSON_TIMEOUT_SECS") {
            match raw.parse::<f64>() {
                Ok(secs) if secs.is_finite() && secs > 0.0 => self.timeout = secs,
                _ => warn!(value = raw.as_str(), "ignoring invalid WATSON_TIMEOUT_SECS"),
            }
        }
        if let Some(raw) = lookup("WATSON_MAX_REST_CONNECTIONS") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => self.max_rest_connections = n,
                _ => warn!(value = raw.as_str(), "ignoring invalid WATSON_MAX_REST_CONNECTIONS"),
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.timeout.is_finite() || self.timeout <= 0.0 {
            return Err(Error::configuration_with_context(
                "timeout must be a positive number of seconds",
                ErrorContext::new().with_field_path("timeout"),
            ));
        }
        if self.max_rest_connections == 0 {
            return Err(Error::configuration_with_context(
                "maxRestConnections must be at least 1",
                ErrorContext::new().with_field_path("maxRestConnections"),
            ));
        }
        Ok(())
    }

    /// Serialize back to JSON.
    pub fn save(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }

    pub fn find_credentials(&self, service_id: &str) -> Option<&CredentialInfo> {
        self.credentials.iter().find(|c| c.service_id == service_id)
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }

    pub fn credential_store(&self) -> CredentialStore {
        self.credentials
            .iter()
            .fold(CredentialStore::new(), |store, info| {
                store.with(info.service_id.clone(), info.to_credentials())
            })
    }

    /// Build a [`ClientContext`] with this file's ceiling and timeout.
    pub fn client_context(&self) -> Result<ClientContext> {
        ClientContext::builder()
            .max_rest_connections(self.max_rest_connections)
            .timeout(self.timeout_duration())
            .build()
    }
}
