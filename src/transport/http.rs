use super::request::{FormContent, FormPart};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;
use reqwest::{Method, Proxy};
use std::env;
use std::time::Duration;
use url::Url;

/// A fully composed request, ready to put on the wire.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub headers: IndexMap<String, String>,
    pub body: WireBody,
    /// Skip certificate validation for this request only.
    pub disable_ssl_verification: bool,
}

#[derive(Debug, Clone)]
pub enum WireBody {
    Empty,
    Bytes(Bytes),
    Multipart(Vec<FormPart>),
}

/// Status, headers and body as received.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: IndexMap<String, String>,
    pub body: Bytes,
}

/// Seam between the connector and the network.
///
/// Implementations map connection and TLS failures to [`Error::Network`] and client-side
/// timeouts to [`Error::Timeout`]; any HTTP status is a successful exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: WireRequest) -> Result<RawResponse>;
}

/// Default transport over `reqwest`.
///
/// Holds one verifying and one non-verifying client so certificate checks can be relaxed
/// per request without touching any process-wide TLS state.
pub struct ReqwestTransport {
    verified: reqwest::Client,
    insecure: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            verified: Self::client_builder(timeout).build().map_err(map_build_error)?,
            insecure: Self::client_builder(timeout)
                .danger_accept_invalid_certs(true)
                .build()
                .map_err(map_build_error)?,
            timeout,
        })
    }

    /// Pool, proxy and user-agent settings shared by every client the SDK builds.
    pub(crate) fn client_builder(timeout: Duration) -> reqwest::ClientBuilder {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(
                env::var("WATSON_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(8),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .user_agent(crate::USER_AGENT);

        if let Ok(proxy_url) = env::var("WATSON_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }
        builder
    }

    fn client_for(&self, disable_ssl_verification: bool) -> &reqwest::Client {
        if disable_ssl_verification {
            &self.insecure
        } else {
            &self.verified
        }
    }

    fn multipart_form(parts: Vec<FormPart>) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for part in parts {
            let mut p = match part.content {
                FormContent::Bytes(b) => reqwest::multipart::Part::bytes(b.to_vec()),
                FormContent::Text(t) => reqwest::multipart::Part::text(t),
            };
            if let Some(name) = part.file_name {
                p = p.file_name(name);
            }
            if let Some(ct) = part.content_type.as_deref() {
                p = p.mime_str(ct).map_err(|e| {
                    Error::invalid_argument_with_context(
                        format!("Invalid content type: {}", e),
                        ErrorContext::new().with_field_path(part.name.clone()),
                    )
                })?;
            }
            form = form.part(part.name, p);
        }
        Ok(form)
    }

    fn map_send_error(&self, e: reqwest::Error, url: &Url) -> Error {
        let context = ErrorContext::new()
            .with_source("reqwest_transport")
            .with_details(url.as_str().to_string());
        if e.is_timeout() {
            Error::timeout(self.timeout, context)
        } else {
            Error::network_with_context(format!("request failed: {}", e), context)
        }
    }
}

fn map_build_error(e: reqwest::Error) -> Error {
    Error::configuration_with_context(
        format!("Failed to create HTTP client: {}", e),
        ErrorContext::new().with_source("reqwest_transport"),
    )
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: WireRequest) -> Result<RawResponse> {
        let WireRequest {
            method,
            url,
            headers,
            body,
            disable_ssl_verification,
        } = request;

        let is_multipart = matches!(body, WireBody::Multipart(_));
        let mut req = self
            .client_for(disable_ssl_verification)
            .request(method, url.clone());

        for (k, v) in &headers {
            // The multipart encoder owns Content-Type (it carries the boundary).
            if is_multipart && k.eq_ignore_ascii_case("content-type") {
                continue;
            }
            req = req.header(k.as_str(), v.as_str());
        }

        req = match body {
            WireBody::Empty => req,
            WireBody::Bytes(b) => req.body(b),
            WireBody::Multipart(parts) => req.multipart(Self::multipart_form(parts)?),
        };

        let resp = req.send().await.map_err(|e| self.map_send_error(e, &url))?;

        let status = resp.status().as_u16();
        let mut out_headers = IndexMap::new();
        for (k, v) in resp.headers() {
            if let Ok(s) = v.to_str() {
                out_headers.insert(k.as_str().to_string(), s.to_string());
            }
        }
        let body = resp.bytes().await.map_err(|e| self.map_send_error(e, &url))?;

        Ok(RawResponse {
            status,
            headers: out_headers,
            body,
        })
    }
}
