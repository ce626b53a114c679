//! Shared fixtures: a mockito server wrapper and recording transport doubles.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;
use mockito::{Server, ServerGuard};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;
use watson_sdk::service::ServiceReply;
use watson_sdk::transport::{RawResponse, Transport, WireRequest};
use watson_sdk::{ClientContext, Result};

pub const VERSION: &str = "2018-10-15";

/// Test fixture that owns a mock server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Service URL under the mock server, e.g. `http://127.0.0.1:1234/api`.
    pub fn service_url(&self) -> String {
        format!("{}/api", self.base_url)
    }

    pub fn iam_url(&self) -> String {
        format!("{}/identity/token", self.base_url)
    }
}

/// HTTPS listener on localhost presenting a self-signed certificate.
///
/// Answers every request with `200 {}`.
pub struct SelfSignedServer {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl SelfSignedServer {
    pub async fn start() -> Self {
        let certs = CertificateDer::pem_slice_iter(include_bytes!("../fixtures/self_signed_cert.pem"))
            .collect::<std::result::Result<Vec<_>, _>>()
            .expect("fixture certificate");
        let key = PrivateKeyDer::from_pem_slice(include_bytes!("../fixtures/self_signed_key.pem"))
            .expect("fixture key");
        let provider = Arc::new(tokio_rustls::rustls::crypto::ring::default_provider());
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .expect("protocol versions")
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .expect("server config");
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    // Rejected handshakes end here.
                    let Ok(mut tls) = acceptor.accept(stream).await else {
                        return;
                    };
                    let mut head = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match tls.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => head.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let _ = tls
                        .write_all(
                            b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}",
                        )
                        .await;
                    let _ = tls.shutdown().await;
                });
            }
        });
        Self { addr, task }
    }

    pub fn url(&self) -> String {
        format!("https://localhost:{}", self.addr.port())
    }
}

impl Drop for SelfSignedServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Wait for a service reply, failing the test instead of hanging.
pub async fn await_reply<T>(rx: oneshot::Receiver<ServiceReply<T>>) -> ServiceReply<T> {
    tokio::time::timeout(Duration::from_secs(10), rx)
        .await
        .expect("callback did not fire in time")
        .expect("callback dropped without firing")
}

/// Context with a short timeout over the real reqwest transport.
pub fn context() -> ClientContext {
    ClientContext::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("context")
}

/// Transport double that sleeps, counts overlap and records every request.
pub struct RecordingTransport {
    delay: Duration,
    status: u16,
    body: &'static str,
    active: AtomicUsize,
    max_active: AtomicUsize,
    requests: Mutex<Vec<WireRequest>>,
}

impl RecordingTransport {
    pub fn new(delay: Duration) -> Arc<Self> {
        Self::with_response(delay, 200, "{}")
    }

    pub fn with_response(delay: Duration, status: u16, body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            delay,
            status,
            body,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Highest number of requests observed executing at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn execute(&self, request: WireRequest) -> Result<RawResponse> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        tokio::time::sleep(self.delay).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        let mut headers = IndexMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Ok(RawResponse {
            status: self.status,
            headers,
            body: Bytes::from_static(self.body.as_bytes()),
        })
    }
}

pub fn context_with(transport: Arc<dyn Transport>, ceiling: usize, timeout: Duration) -> ClientContext {
    ClientContext::builder()
        .max_rest_connections(ceiling)
        .timeout(timeout)
        .transport(transport)
        .build()
        .expect("context")
}
