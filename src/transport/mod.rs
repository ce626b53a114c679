//! Request/response dispatch.
//!
//! | Type | Role |
//! |------|------|
//! | [`RequestDescriptor`] | method, path, query, headers, form parts or body, callback |
//! | [`Connector`] | validates, authenticates and dispatches descriptors |
//! | [`ResponseDescriptor`] | status, headers, body and error handed to the callback |
//! | [`Transport`] | network seam; [`ReqwestTransport`] is the default |

mod connector;
pub mod http;
mod request;
mod response;

pub use connector::Connector;
pub use http::{RawResponse, ReqwestTransport, Transport, WireBody, WireRequest};
pub use request::{CustomData, FormContent, FormPart, OnComplete, RequestBuilder, RequestDescriptor};
pub use response::ResponseDescriptor;
