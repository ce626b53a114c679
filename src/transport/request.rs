//! Request descriptor: the plain value a facade hands to a [`Connector`](super::Connector).

use super::response::ResponseDescriptor;
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use indexmap::IndexMap;
use reqwest::Method;
use std::fmt;

/// One-shot completion handler invoked with the response and the caller's passthrough state.
pub type OnComplete = Box<dyn FnOnce(ResponseDescriptor, CustomData) + Send + 'static>;

/// Opaque caller state threaded unchanged from the call to its completion callback.
///
/// `request_headers` are merged into the outgoing request by the service layer and
/// `raw_json` is filled with the response body once it arrives.
#[derive(Debug, Clone, Default)]
pub struct CustomData {
    pub request_headers: IndexMap<String, String>,
    pub values: serde_json::Map<String, serde_json::Value>,
    pub raw_json: Option<String>,
}

impl CustomData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }
}

/// Content of a multipart form part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormContent {
    Bytes(Bytes),
    Text(String),
}

/// A single `multipart/form-data` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub content: FormContent,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl FormPart {
    /// A file part; `Content-Disposition` will carry the file name.
    pub fn file(
        name: impl Into<String>,
        data: impl Into<Bytes>,
        file_name: impl Into<String>,
        content_type: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content: FormContent::Bytes(data.into()),
            file_name: Some(file_name.into()),
            content_type,
        }
    }

    /// A scalar form field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: FormContent::Text(value.into()),
            file_name: None,
            content_type: None,
        }
    }
}

/// Everything a [`Connector`](super::Connector) needs to issue one call.
///
/// Built through [`RequestBuilder`]; validated once by the connector before dispatch.
pub struct RequestDescriptor {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: IndexMap<String, String>,
    pub(crate) headers: IndexMap<String, String>,
    pub(crate) form: Vec<FormPart>,
    pub(crate) body: Option<Bytes>,
    pub(crate) disable_ssl_verification: bool,
    pub(crate) on_complete: Option<OnComplete>,
    pub(crate) user_state: CustomData,
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("form_parts", &self.form.len())
            .field("body_len", &self.body.as_ref().map(|b| b.len()))
            .field("disable_ssl_verification", &self.disable_ssl_verification)
            .field("has_callback", &self.on_complete.is_some())
            .finish()
    }
}

impl RequestDescriptor {
    pub fn builder(method: Method) -> RequestBuilder {
        RequestBuilder::new(method)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &IndexMap<String, String> {
        &self.query
    }

    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    pub fn form_parts(&self) -> &[FormPart] {
        &self.form
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn disable_ssl_verification(&self) -> bool {
        self.disable_ssl_verification
    }

    pub fn user_state(&self) -> &CustomData {
        &self.user_state
    }

    pub(crate) fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Structural checks performed before a descriptor is accepted for dispatch.
    pub fn validate(&self) -> Result<()> {
        if !self.form.is_empty() && self.body.is_some() {
            return Err(Error::invalid_argument_with_context(
                "form parts and a raw body are mutually exclusive",
                ErrorContext::new()
                    .with_field_path("body")
                    .with_source("request_descriptor"),
            ));
        }
        if self.on_complete.is_none() {
            return Err(Error::invalid_argument_with_context(
                "a completion callback is required",
                ErrorContext::new()
                    .with_field_path("on_complete")
                    .with_source("request_descriptor"),
            ));
        }
        for (name, value) in &self.headers {
            if reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err()
                || reqwest::header::HeaderValue::from_str(value).is_err()
            {
                return Err(Error::invalid_argument_with_context(
                    "invalid header",
                    ErrorContext::new().with_field_path(format!("headers.{}", name)),
                ));
            }
        }
        if let Some(part) = self.form.iter().find(|p| p.name.trim().is_empty()) {
            return Err(Error::invalid_argument_with_context(
                "form part name must be non-empty",
                ErrorContext::new()
                    .with_field_path("form")
                    .with_details(format!("{:?}", part.file_name)),
            ));
        }
        for part in &self.form {
            if let Some(ct) = part.content_type.as_deref() {
                // Same parser the multipart encoder applies later.
                reqwest::multipart::Part::text("").mime_str(ct).map_err(|e| {
                    Error::invalid_argument_with_context(
                        format!("invalid content type `{}`: {}", ct, e),
                        ErrorContext::new()
                            .with_field_path(format!("form.{}.content_type", part.name))
                            .with_source("request_descriptor"),
                    )
                })?;
            }
        }
        Ok(())
    }
}

/// Builder for [`RequestDescriptor`].
///
/// Query parameters and headers are last-write-wins per key; form parts with a repeated
/// name replace the earlier part in place.
#[derive(Debug)]
pub struct RequestBuilder {
    inner: RequestDescriptor,
}

impl RequestBuilder {
    pub fn new(method: Method) -> Self {
        Self {
            inner: RequestDescriptor {
                method,
                path: String::new(),
                query: IndexMap::new(),
                headers: IndexMap::new(),
                form: Vec::new(),
                body: None,
                disable_ssl_verification: false,
                on_complete: None,
                user_state: CustomData::default(),
            },
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.inner.method = method;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.inner.path = path.into();
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.query.insert(key.into(), value.into());
        self
    }

    /// Adds the parameter only when a value is present and non-empty.
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value.map(|v| v.to_string()).filter(|v| !v.is_empty()) {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers<'a>(mut self, headers: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (k, v) in headers {
            self.inner.headers.insert(k.clone(), v.clone());
        }
        self
    }

    pub fn form_part(mut self, part: FormPart) -> Self {
        match self.inner.form.iter_mut().find(|p| p.name == part.name) {
            Some(existing) => *existing = part,
            None => self.inner.form.push(part),
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.inner.body = Some(body.into());
        self
    }

    /// Serialize `value` as the request body and mark it `application/json`.
    pub fn json<T: serde::Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(value)?;
        Ok(self
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(bytes))
    }

    pub fn disable_ssl_verification(mut self, disable: bool) -> Self {
        self.inner.disable_ssl_verification = disable;
        self
    }

    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(ResponseDescriptor, CustomData) + Send + 'static,
    {
        self.inner.on_complete = Some(Box::new(f));
        self
    }

    pub fn user_state(mut self, state: CustomData) -> Self {
        self.inner.user_state = state;
        self
    }

    pub fn build(self) -> RequestDescriptor {
        self.inner
    }
}
