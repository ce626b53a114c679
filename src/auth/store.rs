use super::credentials::Credentials;
use indexmap::IndexMap;

/// Named credentials, one entry per service id.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: IndexMap<String, Credentials>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the credentials for `service_id`.
    pub fn insert(&mut self, service_id: impl Into<String>, credentials: Credentials) {
        self.entries.insert(service_id.into(), credentials);
    }

    pub fn with(mut self, service_id: impl Into<String>, credentials: Credentials) -> Self {
        self.insert(service_id, credentials);
        self
    }

    /// Credentials for `service_id`, falling back to the environment.
    ///
    /// Environment lookup uses `<SERVICE_ID>_APIKEY` (or `<SERVICE_ID>_USERNAME` +
    /// `<SERVICE_ID>_PASSWORD`) and `<SERVICE_ID>_URL`, with the id upper-cased and
    /// dashes turned into underscores.
    pub fn resolve(&self, service_id: &str) -> Option<Credentials> {
        self.entries
            .get(service_id)
            .cloned()
            .or_else(|| Self::from_env(service_id, |k| std::env::var(k).ok()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn service_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn from_env(service_id: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<Credentials> {
        let prefix = service_id.to_uppercase().replace('-', "_");
        let var = |suffix: &str| lookup(&format!("{}_{}", prefix, suffix)).filter(|v| !v.is_empty());

        let credentials = if let Some(key) = var("APIKEY") {
            let c = Credentials::iam_api_key(key);
            match var("IAM_URL") {
                Some(iam_url) => c.with_iam_url(iam_url),
                None => c,
            }
        } else {
            match (var("USERNAME"), var("PASSWORD")) {
                (Some(u), Some(p)) => Credentials::basic(u, p),
                _ => return None,
            }
        };
        Some(match var("URL") {
            Some(url) => credentials.with_url(url),
            None => credentials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn resolve_prefers_explicit_entries() {
        let store = CredentialStore::new().with(
            "compare-comply",
            Credentials::basic("u", "p").with_url("https://cc.test/api"),
        );
        let c = store.resolve("compare-comply").unwrap();
        assert_eq!(c.url(), Some("https://cc.test/api"));
        assert!(c.has_credentials());
    }

    #[test]
    fn env_lookup_uses_service_prefix() {
        let env: HashMap<&str, &str> = [
            ("COMPARE_COMPLY_APIKEY", "k"),
            ("COMPARE_COMPLY_URL", "https://env.test/api"),
        ]
        .into_iter()
        .collect();
        let c = CredentialStore::from_env("compare-comply", |k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert!(c.has_iam_token_data());
        assert_eq!(c.url(), Some("https://env.test/api"));
    }

    #[test]
    fn env_lookup_needs_both_basic_fields() {
        let env: HashMap<&str, &str> = [("ASSISTANT_USERNAME", "u")].into_iter().collect();
        assert!(CredentialStore::from_env("assistant", |k| env.get(k).map(|v| v.to_string())).is_none());
    }
}
