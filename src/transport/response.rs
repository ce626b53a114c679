use crate::Error;
use bytes::Bytes;
use indexmap::IndexMap;
use std::time::Duration;

/// Outcome of one dispatched request, handed to the completion callback exactly once.
#[derive(Debug)]
pub struct ResponseDescriptor {
    /// HTTP status, or `0` when no response was received.
    pub status_code: u16,
    pub headers: IndexMap<String, String>,
    /// Whatever body arrived, including on non-2xx statuses.
    pub body: Bytes,
    pub success: bool,
    pub error: Option<Error>,
    pub request_id: String,
    pub elapsed: Duration,
}

impl ResponseDescriptor {
    /// A response that never reached (or never came back from) the server.
    pub(crate) fn failed(request_id: String, error: Error, elapsed: Duration) -> Self {
        Self {
            status_code: 0,
            headers: IndexMap::new(),
            body: Bytes::new(),
            success: false,
            error: Some(error),
            request_id,
            elapsed,
        }
    }

    /// Classify a received response; non-2xx keeps its body and carries an `HttpStatus` error.
    pub(crate) fn from_raw(
        request_id: String,
        raw: super::http::RawResponse,
        elapsed: Duration,
    ) -> Self {
        let success = (200..300).contains(&raw.status);
        let error = if success {
            None
        } else {
            let reason = reqwest::StatusCode::from_u16(raw.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("unexpected status");
            Some(Error::http_status(raw.status, reason, &raw.body))
        };
        Self {
            status_code: raw.status,
            headers: raw.headers,
            body: raw.body,
            success,
            error,
            request_id,
            elapsed,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }
}
