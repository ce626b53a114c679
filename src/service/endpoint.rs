use crate::auth::Credentials;
use crate::client::ClientContext;
use crate::transport::{Connector, CustomData, FormPart, RequestBuilder, ResponseDescriptor};
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use indexmap::IndexMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::Path;
use tokio::sync::oneshot;
use tracing::{debug, error};

const ANALYTICS_HEADER: &str = "X-IBMCloud-SDK-Analytics";

/// One operation of a service API.
///
/// `build_request` receives a builder that already carries the `version` query
/// parameter, the SDK default headers, any per-call headers and the SSL flag. It
/// validates required arguments and returns `InvalidArgument` to reject the call
/// before anything is sent.
pub trait Endpoint: Send + 'static {
    type Output: DeserializeOwned + Send + 'static;

    /// Operation name reported in the analytics header and in logs.
    const OPERATION: &'static str;

    /// Function path relative to the service URL, e.g. `/v1/feedback/{id}`.
    fn function(&self) -> Result<String>;

    fn build_request(self, base: RequestBuilder) -> Result<RequestBuilder>;

    fn decode_response(body: &[u8]) -> Result<Self::Output> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Typed result envelope delivered to service callbacks.
#[derive(Debug, Clone)]
pub struct DetailedResponse<T> {
    /// `None` on transport failure, non-2xx status or undecodable body.
    pub result: Option<T>,
    pub headers: IndexMap<String, String>,
    /// `0` when no response was received.
    pub status_code: u16,
}

impl<T> DetailedResponse<T> {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A boxed completion handler of a typed service call.
///
/// Every operation accepts any `FnOnce` with this signature; it is invoked exactly once
/// per accepted call, on the context's completion loop.
pub type ServiceCallback<T> =
    Box<dyn FnOnce(DetailedResponse<T>, Option<Error>, CustomData) + Send + 'static>;

/// Everything a service callback receives, bundled for channel delivery.
#[derive(Debug)]
pub struct ServiceReply<T> {
    pub response: DetailedResponse<T>,
    pub error: Option<Error>,
    pub custom_data: CustomData,
}

impl<T> ServiceReply<T> {
    /// Collapse into a `Result`, dropping headers and passthrough state.
    ///
    /// Replies produced by a service call always carry either a result or an error. A
    /// hand-built reply with neither is reported as a decode failure.
    pub fn into_result(self) -> Result<T> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.response.result.ok_or_else(|| {
            Error::Serialization(<serde_json::Error as serde::de::Error>::custom(
                "response carried no result",
            ))
        })
    }
}

/// A callback that forwards its arguments into a oneshot channel.
///
/// Lets async callers `await` a callback-style operation.
pub fn reply_channel<T: Send + 'static>(
) -> (
    impl FnOnce(DetailedResponse<T>, Option<Error>, CustomData) + Send + 'static,
    oneshot::Receiver<ServiceReply<T>>,
) {
    let (tx, rx) = oneshot::channel();
    let callback = move |response: DetailedResponse<T>,
                         error: Option<Error>,
                         custom_data: CustomData| {
        let _ = tx.send(ServiceReply {
            response,
            error,
            custom_data,
        });
    };
    (callback, rx)
}

/// A file to upload as one multipart part.
#[derive(Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub data: Bytes,
    pub content_type: Option<String>,
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("len", &self.data.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a file from disk; the part's file name is the path's final component.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::invalid_argument_with_context(
                    "path has no file name",
                    ErrorContext::new().with_details(path.display().to_string()),
                )
            })?;
        Ok(Self::new(file_name, data))
    }

    pub(crate) fn into_part(self, name: &str, operation: &str) -> Result<FormPart> {
        if self.file_name.trim().is_empty() {
            return Err(Error::missing_argument(name, operation));
        }
        Ok(FormPart::file(name, self.data, self.file_name, self.content_type))
    }
}

/// Shared state and dispatch for a service facade.
#[derive(Debug, Clone)]
pub struct BaseService {
    ctx: ClientContext,
    credentials: Credentials,
    service_id: &'static str,
    version_date: String,
    default_url: &'static str,
    disable_ssl_verification: bool,
}

impl BaseService {
    /// Fails with `InvalidArgument` on an empty version date or unusable credentials.
    /// Credentials without a URL fall back to `default_url`.
    pub fn new(
        ctx: &ClientContext,
        service_id: &'static str,
        version_date: impl Into<String>,
        credentials: Credentials,
        default_url: &'static str,
    ) -> Result<Self> {
        let version_date = version_date.into();
        if version_date.trim().is_empty() {
            return Err(Error::invalid_argument_with_context(
                "a version date (format `yyyy-mm-dd`) is required",
                ErrorContext::new()
                    .with_field_path("version_date")
                    .with_source(service_id),
            ));
        }
        let mut service = Self {
            ctx: ctx.clone(),
            credentials: Credentials::none(),
            service_id,
            version_date,
            default_url,
            disable_ssl_verification: false,
        };
        service.set_credentials(credentials)?;
        Ok(service)
    }

    pub fn service_id(&self) -> &'static str {
        self.service_id
    }

    pub fn version_date(&self) -> &str {
        &self.version_date
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn context(&self) -> &ClientContext {
        &self.ctx
    }

    /// Replace the credentials wholesale. In-flight calls keep the ones they started with.
    pub fn set_credentials(&mut self, credentials: Credentials) -> Result<()> {
        if !credentials.has_usable_auth() {
            return Err(Error::invalid_argument_with_context(
                "provide a username and password or IAM credentials",
                ErrorContext::new()
                    .with_field_path("credentials")
                    .with_source(self.service_id),
            ));
        }
        self.credentials = match credentials.url() {
            Some(_) => credentials,
            None => credentials.with_url(self.default_url),
        };
        Ok(())
    }

    pub fn disable_ssl_verification(&self) -> bool {
        self.disable_ssl_verification
    }

    pub fn set_disable_ssl_verification(&mut self, disable: bool) {
        self.disable_ssl_verification = disable;
    }

    /// Validate, build and dispatch one endpoint call.
    ///
    /// `Err` means the call was rejected synchronously and `callback` will never run.
    /// `Ok` means `callback` runs exactly once.
    pub fn invoke<E, F>(&self, endpoint: E, custom_data: CustomData, callback: F) -> Result<()>
    where
        E: Endpoint,
        F: FnOnce(DetailedResponse<E::Output>, Option<Error>, CustomData) + Send + 'static,
    {
        let function = endpoint.function()?;
        let base = RequestBuilder::new(Method::GET)
            .query("version", self.version_date.as_str())
            .header("User-Agent", crate::USER_AGENT)
            .header(
                ANALYTICS_HEADER,
                format!(
                    "service_name={};service_version=V1;operation_id={}",
                    self.service_id,
                    E::OPERATION
                ),
            )
            .headers(&custom_data.request_headers)
            .disable_ssl_verification(self.disable_ssl_verification);
        let builder = endpoint.build_request(base)?;

        let connector = Connector::new(&self.ctx, &self.credentials, &function)?;
        let request = builder
            .user_state(custom_data)
            .on_complete(move |response, data| {
                let (detailed, error, data) = complete::<E>(response, data);
                callback(detailed, error, data);
            })
            .build();

        debug!(
            service = self.service_id,
            operation = E::OPERATION,
            function = function.as_str(),
            "submitting"
        );
        connector.try_send(request)
    }
}

/// Turn a raw response into the typed envelope.
fn complete<E: Endpoint>(
    response: ResponseDescriptor,
    mut data: CustomData,
) -> (DetailedResponse<E::Output>, Option<Error>, CustomData) {
    let mut detailed = DetailedResponse {
        result: None,
        headers: response.headers,
        status_code: response.status_code,
    };
    if !response.body.is_empty() {
        data.raw_json = Some(String::from_utf8_lossy(&response.body).into_owned());
    }
    if let Some(e) = response.error {
        return (detailed, Some(e), data);
    }
    match E::decode_response(&response.body) {
        Ok(value) => {
            detailed.result = Some(value);
            (detailed, None, data)
        }
        Err(e) => {
            error!(
                operation = E::OPERATION,
                request_id = response.request_id.as_str(),
                error = %e,
                "failed to decode response"
            );
            (detailed, Some(e), data)
        }
    }
}
