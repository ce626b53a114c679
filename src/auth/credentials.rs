use super::iam::{IamToken, IamTokenManager, DEFAULT_IAM_URL};
use std::fmt;
use std::sync::Arc;

/// Which authentication scheme a [`Credentials`] value uses.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// No `Authorization` header. Not accepted by any service facade.
    None,
    Basic { username: String, password: String },
    /// API key exchanged at the IAM endpoint for bearer tokens.
    IamApiKey { api_key: String },
    /// A caller-supplied IAM token, refreshed through its refresh token when it expires.
    IamToken(IamToken),
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::None => f.write_str("None"),
            AuthMode::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            AuthMode::IamApiKey { .. } => f.write_str("IamApiKey(<redacted>)"),
            AuthMode::IamToken(t) => f
                .debug_struct("IamToken")
                .field("expires_at", &t.expires_at)
                .field("refreshable", &t.refresh_token.is_some())
                .finish(),
        }
    }
}

/// Service URL plus authentication for one service.
///
/// Cheap to clone; clones share the IAM token cache. Replace the whole value to change
/// credentials, never mutate one that is attached to in-flight requests.
#[derive(Clone)]
pub struct Credentials {
    url: Option<String>,
    mode: AuthMode,
    iam: Option<Arc<IamTokenManager>>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Credentials {
    pub fn none() -> Self {
        Self {
            url: None,
            mode: AuthMode::None,
            iam: None,
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: None,
            mode: AuthMode::Basic {
                username: username.into(),
                password: password.into(),
            },
            iam: None,
        }
    }

    pub fn iam_api_key(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let iam = IamTokenManager::new(DEFAULT_IAM_URL, Some(api_key.clone()), None);
        Self {
            url: None,
            mode: AuthMode::IamApiKey { api_key },
            iam: Some(Arc::new(iam)),
        }
    }

    pub fn iam_token(token: IamToken) -> Self {
        let iam = IamTokenManager::new(DEFAULT_IAM_URL, None, Some(token.clone()));
        Self {
            url: None,
            mode: AuthMode::IamToken(token),
            iam: Some(Arc::new(iam)),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.url = if url.trim().is_empty() { None } else { Some(url) };
        self
    }

    /// Point token exchanges at a different IAM endpoint.
    ///
    /// Starts a fresh token cache; call before the credentials are shared.
    pub fn with_iam_url(mut self, iam_url: impl Into<String>) -> Self {
        let iam_url = iam_url.into();
        self.iam = match &self.mode {
            AuthMode::IamApiKey { api_key } => Some(Arc::new(IamTokenManager::new(
                &iam_url,
                Some(api_key.clone()),
                None,
            ))),
            AuthMode::IamToken(token) => Some(Arc::new(IamTokenManager::new(
                &iam_url,
                None,
                Some(token.clone()),
            ))),
            _ => None,
        };
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn mode(&self) -> &AuthMode {
        &self.mode
    }

    pub(crate) fn token_manager(&self) -> Option<&Arc<IamTokenManager>> {
        self.iam.as_ref()
    }

    /// User name and password are both present.
    pub fn has_credentials(&self) -> bool {
        matches!(&self.mode, AuthMode::Basic { username, password }
            if !username.is_empty() && !password.is_empty())
    }

    /// An IAM API key or access token is present.
    pub fn has_iam_token_data(&self) -> bool {
        match &self.mode {
            AuthMode::IamApiKey { api_key } => !api_key.is_empty(),
            AuthMode::IamToken(t) => !t.access_token.is_empty(),
            _ => false,
        }
    }

    pub fn has_usable_auth(&self) -> bool {
        self.has_credentials() || self.has_iam_token_data()
    }
}
