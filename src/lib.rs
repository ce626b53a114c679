//! # watson-sdk
//!
//! Async Rust client for IBM Watson REST services.
//!
//! ## Overview
//!
//! Every call goes through the same dispatch core: a typed facade validates its
//! arguments and fills a [`transport::RequestDescriptor`], a [`transport::Connector`]
//! authenticates and sends it under a shared concurrency ceiling, and exactly one
//! completion callback receives a typed result or a structured [`Error`].
//!
//! - **Explicit context**: [`ClientContext`] owns the connection ceiling, the request
//!   timeout, the HTTP transport and the completion loop. There is no global state.
//! - **Credentials**: basic auth, IAM API keys (exchanged and refreshed automatically)
//!   or caller-managed IAM tokens, resolved per service through [`auth::CredentialStore`].
//! - **Exactly once**: an accepted call invokes its callback once; a rejected call
//!   returns `Err` synchronously and never invokes it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use watson_sdk::auth::Credentials;
//! use watson_sdk::service::compare_comply::CompareComplyService;
//! use watson_sdk::service::{reply_channel, FileUpload};
//! use watson_sdk::transport::CustomData;
//! use watson_sdk::ClientContext;
//!
//! #[tokio::main]
//! async fn main() -> watson_sdk::Result<()> {
//!     let ctx = ClientContext::new()?;
//!     let service = CompareComplyService::new(
//!         &ctx,
//!         "2018-10-15",
//!         Credentials::iam_api_key("your-api-key"),
//!     )?;
//!
//!     let file = FileUpload::from_path("contract.pdf").await?;
//!     let (callback, reply) = reply_channel();
//!     service.convert_to_html(file, None, CustomData::new(), callback)?;
//!
//!     let html = reply.await.expect("callback dropped").into_result()?;
//!     println!("{}", html.html.unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`auth`] | Credentials, IAM token exchange, per-service credential store |
//! | [`client`] | [`ClientContext`]: ceiling, timeout, completion loop |
//! | [`config`] | JSON configuration file and credential blobs |
//! | [`transport`] | Request/response descriptors, connector, HTTP transport |
//! | [`service`] | Endpoint trait and service facades |

pub mod auth;
pub mod client;
pub mod config;
pub mod service;
pub mod transport;

// Re-export main types for convenience
pub use client::{ClientContext, ClientContextBuilder};
pub use config::{Config, CredentialInfo};
pub use service::DetailedResponse;
pub use transport::{Connector, CustomData, RequestDescriptor, ResponseDescriptor};

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("watson-sdk-rust/", env!("CARGO_PKG_VERSION"));

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ErrorKind};
