use super::dispatch::{Completion, CompletionLoop};
use super::signals::InflightSnapshot;
use crate::transport::{ReqwestTransport, Transport};
use crate::{Error, ErrorContext, Result};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub const DEFAULT_MAX_REST_CONNECTIONS: usize = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared runtime state for every connector built from it: the connection ceiling,
/// the request timeout, the transport and the completion loop.
///
/// Clone it freely; clones share the same ceiling.
#[derive(Clone)]
pub struct ClientContext {
    inner: Arc<Inner>,
}

struct Inner {
    max_connections: usize,
    timeout: Duration,
    slots: Arc<Semaphore>,
    queued: AtomicUsize,
    transport: Arc<dyn Transport>,
    completions: CompletionLoop,
    runtime: Handle,
}

impl fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientContext")
            .field("max_connections", &self.inner.max_connections)
            .field("timeout", &self.inner.timeout)
            .field("inflight", &self.inflight())
            .finish()
    }
}

impl ClientContext {
    pub fn builder() -> ClientContextBuilder {
        ClientContextBuilder::new()
    }

    /// Context with default ceiling and timeout on the current tokio runtime.
    pub fn new() -> Result<Self> {
        ClientContextBuilder::new().build()
    }

    pub fn max_rest_connections(&self) -> usize {
        self.inner.max_connections
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    pub fn inflight(&self) -> InflightSnapshot {
        let max = self.inner.max_connections;
        let available = self.inner.slots.available_permits();
        InflightSnapshot {
            max,
            available,
            in_use: max.saturating_sub(available),
            queued: self.inner.queued.load(Ordering::SeqCst),
        }
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    /// Wait for a connection slot. Waiters are served first-in, first-out.
    pub(crate) async fn acquire_slot(&self) -> Result<OwnedSemaphorePermit> {
        self.inner.queued.fetch_add(1, Ordering::SeqCst);
        let permit = self.inner.slots.clone().acquire_owned().await;
        self.inner.queued.fetch_sub(1, Ordering::SeqCst);
        permit.map_err(|_| {
            Error::configuration_with_context(
                "connection ceiling closed",
                ErrorContext::new().with_source("client_context"),
            )
        })
    }

    pub(crate) fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.runtime.spawn(fut);
    }

    pub(crate) fn deliver(&self, job: Completion) {
        self.inner.completions.deliver(job);
    }
}

/// Builder for [`ClientContext`].
pub struct ClientContextBuilder {
    max_rest_connections: usize,
    timeout: Duration,
    transport: Option<Arc<dyn Transport>>,
    runtime: Option<Handle>,
}

impl ClientContextBuilder {
    pub fn new() -> Self {
        Self {
            max_rest_connections: DEFAULT_MAX_REST_CONNECTIONS,
            timeout: DEFAULT_TIMEOUT,
            transport: None,
            runtime: None,
        }
    }

    /// Maximum requests in flight at once across all connectors of this context.
    pub fn max_rest_connections(mut self, n: usize) -> Self {
        self.max_rest_connections = n.max(1);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the default `reqwest` transport (primarily for tests).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Run request tasks and the completion loop on this runtime instead of the current one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<ClientContext> {
        if self.timeout.is_zero() {
            return Err(Error::configuration_with_context(
                "timeout must be greater than zero",
                ErrorContext::new().with_field_path("timeout"),
            ));
        }
        let runtime = match self.runtime {
            Some(h) => h,
            None => Handle::try_current().map_err(|e| {
                Error::configuration_with_context(
                    "ClientContext must be built inside a tokio runtime",
                    ErrorContext::new()
                        .with_source("client_context")
                        .with_details(e.to_string()),
                )
            })?,
        };
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new(self.timeout)?),
        };
        let completions = CompletionLoop::start(&runtime);

        Ok(ClientContext {
            inner: Arc::new(Inner {
                max_connections: self.max_rest_connections,
                timeout: self.timeout,
                slots: Arc::new(Semaphore::new(self.max_rest_connections)),
                queued: AtomicUsize::new(0),
                transport,
                completions,
                runtime,
            }),
        })
    }
}

impl Default for ClientContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_outside_runtime_fails() {
        let err = ClientContext::new().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn ceiling_is_at_least_one() {
        let ctx = ClientContext::builder().max_rest_connections(0).build().unwrap();
        assert_eq!(ctx.max_rest_connections(), 1);
        assert_eq!(ctx.inflight().available, 1);
    }

    #[tokio::test]
    async fn slots_are_tracked() {
        let ctx = ClientContext::builder().max_rest_connections(2).build().unwrap();
        let p1 = ctx.acquire_slot().await.unwrap();
        let snap = ctx.inflight();
        assert_eq!((snap.in_use, snap.available, snap.queued), (1, 1, 0));
        drop(p1);
        assert_eq!(ctx.inflight().in_use, 0);
    }

    #[tokio::test]
    async fn zero_timeout_is_rejected() {
        assert!(ClientContext::builder().timeout(Duration::ZERO).build().is_err());
    }
}
