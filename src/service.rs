//! Typed service facades built on the [`transport`](crate::transport) layer.
//!
//! Each endpoint implements [`Endpoint`]: it turns typed arguments into a
//! [`RequestBuilder`](crate::transport::RequestBuilder) and names the JSON type its
//! response decodes into. [`BaseService`] does the rest: default headers, the
//! `version` query parameter, connector lookup and typed completion.

pub mod compare_comply;
mod endpoint;

pub use endpoint::{
    reply_channel, BaseService, DetailedResponse, Endpoint, FileUpload, ServiceCallback,
    ServiceReply,
};
