use super::http::{WireBody, WireRequest};
use super::request::RequestDescriptor;
use super::response::ResponseDescriptor;
use crate::auth::{attach_auth, Credentials};
use crate::client::ClientContext;
use crate::{Error, ErrorContext, Result};
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Dispatches requests to one service endpoint with one set of credentials.
///
/// Cheap to clone. All connectors built from the same [`ClientContext`] share its
/// connection ceiling, timeout and completion loop.
///
/// The exactly-once callback guarantee holds while the context's tokio runtime is
/// alive. Shutting the runtime down drops in-flight request tasks, and their callbacks
/// are dropped without running.
#[derive(Clone, Debug)]
pub struct Connector {
    ctx: ClientContext,
    credentials: Credentials,
    base_url: Url,
}

impl Connector {
    /// Bind `credentials` to `<credentials.url><function>`.
    ///
    /// Fails with `InvalidArgument` when the credentials carry no usable authentication
    /// or no service URL.
    pub fn new(ctx: &ClientContext, credentials: &Credentials, function: &str) -> Result<Self> {
        if !credentials.has_usable_auth() {
            return Err(Error::invalid_argument_with_context(
                "credentials carry no usable authentication",
                ErrorContext::new()
                    .with_field_path("credentials")
                    .with_source("connector"),
            ));
        }
        let service_url = credentials.url().ok_or_else(|| {
            Error::invalid_argument_with_context(
                "credentials have no service URL",
                ErrorContext::new()
                    .with_field_path("credentials.url")
                    .with_source("connector"),
            )
        })?;
        let base_url = parse_http_url(&join_path(service_url, function))?;

        Ok(Self {
            ctx: ctx.clone(),
            credentials: credentials.clone(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Submit a request. `true` means accepted: the callback will fire exactly once.
    /// `false` means rejected synchronously: nothing was sent and the callback never fires.
    pub fn send(&self, request: RequestDescriptor) -> bool {
        match self.try_send(request) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, url = self.base_url.as_str(), "request rejected");
                false
            }
        }
    }

    /// Like [`send`](Self::send), reporting why a request was rejected.
    pub fn try_send(&self, mut request: RequestDescriptor) -> Result<()> {
        request.validate()?;
        let url = self.compose_url(&request)?;
        let on_complete = request.on_complete.take().ok_or_else(|| {
            Error::invalid_argument("a completion callback is required")
        })?;
        let user_state = std::mem::take(&mut request.user_state);

        let caller_id = request
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(REQUEST_ID_HEADER))
            .map(|(_, v)| v.clone());
        let request_id = match caller_id {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                request.set_header(REQUEST_ID_HEADER, id.clone());
                id
            }
        };

        debug!(
            request_id = request_id.as_str(),
            method = %request.method,
            path = url.path(),
            form_parts = request.form.len(),
            "request accepted"
        );

        let ctx = self.ctx.clone();
        let credentials = self.credentials.clone();
        self.ctx.spawn(async move {
            let response = execute(&ctx, &credentials, request, url, request_id).await;
            ctx.deliver(Box::new(move || on_complete(response, user_state)));
        });
        Ok(())
    }

    /// Base URL plus the descriptor's path, with its query parameters URL-encoded in order.
    fn compose_url(&self, request: &RequestDescriptor) -> Result<Url> {
        let mut url = if request.path.is_empty() {
            self.base_url.clone()
        } else {
            parse_http_url(&join_path(self.base_url.as_str(), &request.path))?
        };
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &request.query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

/// Run one accepted request to completion. Never fails: every outcome becomes a response.
async fn execute(
    ctx: &ClientContext,
    credentials: &Credentials,
    mut request: RequestDescriptor,
    url: Url,
    request_id: String,
) -> ResponseDescriptor {
    let _permit = match ctx.acquire_slot().await {
        Ok(p) => p,
        Err(e) => return ResponseDescriptor::failed(request_id, e, std::time::Duration::ZERO),
    };
    let start = Instant::now();

    if let Err(e) = attach_auth(&mut request, credentials).await {
        warn!(request_id = request_id.as_str(), error = %e, "authentication failed, request not sent");
        return ResponseDescriptor::failed(request_id, e, start.elapsed());
    }

    let method = request.method.clone();
    let wire = into_wire(request, url);
    let path = wire.url.path().to_string();
    let timeout = ctx.timeout();

    let response = match tokio::time::timeout(timeout, ctx.transport().execute(wire)).await {
        Ok(Ok(raw)) => ResponseDescriptor::from_raw(request_id, raw, start.elapsed()),
        Ok(Err(e)) => ResponseDescriptor::failed(request_id, e, start.elapsed()),
        Err(_) => ResponseDescriptor::failed(
            request_id,
            Error::timeout(
                timeout,
                ErrorContext::new().with_source("connector").with_details(path.clone()),
            ),
            start.elapsed(),
        ),
    };

    info!(
        request_id = response.request_id.as_str(),
        method = %method,
        path = path.as_str(),
        http_status = response.status_code,
        success = response.success,
        duration_ms = response.elapsed.as_millis(),
        "request completed"
    );
    response
}

fn into_wire(request: RequestDescriptor, url: Url) -> WireRequest {
    let body = if !request.form.is_empty() {
        WireBody::Multipart(request.form)
    } else if let Some(b) = request.body {
        WireBody::Bytes(b)
    } else {
        WireBody::Empty
    };
    WireRequest {
        method: request.method,
        url,
        headers: request.headers,
        body,
        disable_ssl_verification: request.disable_ssl_verification,
    }
}

fn join_path(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| {
        Error::invalid_argument_with_context(
            format!("invalid service URL: {}", e),
            ErrorContext::new().with_field_path("url").with_details(raw.to_string()),
        )
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::invalid_argument_with_context(
            format!("unsupported URL scheme `{}`", other),
            ErrorContext::new().with_field_path("url"),
        )),
    }
}
