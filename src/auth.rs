//! Service credentials and `Authorization` header injection.
//!
//! Basic auth is encoded locally; IAM modes go through an [`IamTokenManager`] that
//! refreshes the bearer token before use when it is within a minute of expiring.

mod credentials;
mod iam;
mod store;

pub use credentials::{AuthMode, Credentials};
pub use iam::{IamToken, IamTokenManager, DEFAULT_IAM_URL};
pub use store::CredentialStore;

use crate::transport::RequestDescriptor;
use crate::{Error, ErrorContext, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// `Basic base64(user:password)`.
pub fn basic_authorization(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}

/// Add the `Authorization` header for `credentials` to `request`.
///
/// For IAM credentials this may perform a token request first; a failed refresh is
/// reported as a network error and the header is left unset.
pub async fn attach_auth(request: &mut RequestDescriptor, credentials: &Credentials) -> Result<()> {
    match credentials.mode() {
        AuthMode::None => Ok(()),
        AuthMode::Basic { username, password } => {
            request.set_header("Authorization", basic_authorization(username, password));
            Ok(())
        }
        AuthMode::IamApiKey { .. } | AuthMode::IamToken(_) => {
            let manager = credentials.token_manager().ok_or_else(|| {
                Error::invalid_argument_with_context(
                    "IAM credentials without a token manager",
                    ErrorContext::new().with_source("auth"),
                )
            })?;
            let token = manager.access_token().await?;
            request.set_header("Authorization", format!("Bearer {}", token));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reqwest::Method;

    #[test]
    fn basic_header_is_base64_of_user_colon_password() {
        assert_eq!(basic_authorization("user", "pass"), "Basic dXNlcjpwYXNz");
    }

    #[tokio::test]
    async fn attach_basic_auth() {
        let mut req = RequestDescriptor::builder(Method::GET).build();
        attach_auth(&mut req, &Credentials::basic("user", "pass")).await.unwrap();
        assert_eq!(
            req.headers().get("Authorization").map(String::as_str),
            Some("Basic dXNlcjpwYXNz")
        );
    }

    #[tokio::test]
    async fn attach_valid_iam_token() {
        let token = IamToken::new("tok").with_expiry(Utc::now() + chrono::Duration::hours(1));
        let mut req = RequestDescriptor::builder(Method::GET).build();
        attach_auth(&mut req, &Credentials::iam_token(token)).await.unwrap();
        assert_eq!(
            req.headers().get("Authorization").map(String::as_str),
            Some("Bearer tok")
        );
    }

    #[tokio::test]
    async fn no_header_for_none() {
        let mut req = RequestDescriptor::builder(Method::GET).build();
        attach_auth(&mut req, &Credentials::none()).await.unwrap();
        assert!(req.headers().is_empty());
    }
}
