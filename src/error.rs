use thiserror::Error;

/// Longest response body excerpt kept on an [`Error::HttpStatus`].
const BODY_SNIPPET_LIMIT: usize = 512;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Argument or configuration key that caused the error (e.g., "file", "credentials.url")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected format, offending value)
    pub details: Option<String>,
    /// Component that raised the error (e.g., "connector", "iam", "compare_comply")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse classification of an [`Error`], mirroring what callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller misuse caught before any network activity.
    InvalidArgument,
    /// DNS, connect, TLS or token endpoint failure.
    Network,
    /// No response within the configured timeout.
    Timeout,
    /// Server answered with a non-2xx status.
    HttpStatus(u16),
    /// Response body was not the expected JSON.
    SerializationFailure,
    /// Configuration file or environment problem.
    Configuration,
}

/// Unified error type for the SDK.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid argument: {message}{}", format_context(.context))]
    InvalidArgument {
        message: String,
        context: ErrorContext,
    },

    #[error("Network error: {message}{}", format_context(.context))]
    Network {
        message: String,
        context: ErrorContext,
    },

    #[error("Request timed out after {timeout_ms} ms{}", format_context(.context))]
    Timeout {
        timeout_ms: u128,
        context: ErrorContext,
    },

    #[error("HTTP {status}: {message}")]
    HttpStatus {
        status: u16,
        message: String,
        /// Leading part of the response body, if any was received.
        body: Option<String>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::invalid_argument_with_context(msg, ErrorContext::new())
    }

    pub fn invalid_argument_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::InvalidArgument {
            message: msg.into(),
            context,
        }
    }

    /// Shorthand for a missing required argument of a facade operation.
    pub fn missing_argument(argument: &str, operation: &str) -> Self {
        Self::invalid_argument_with_context(
            format!("`{}` is required for `{}`", argument, operation),
            ErrorContext::new().with_field_path(argument),
        )
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::network_with_context(msg, ErrorContext::new())
    }

    pub fn network_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Network {
            message: msg.into(),
            context,
        }
    }

    pub fn timeout(after: std::time::Duration, context: ErrorContext) -> Self {
        Error::Timeout {
            timeout_ms: after.as_millis(),
            context,
        }
    }

    /// Build a status error, keeping a bounded excerpt of whatever body arrived.
    pub fn http_status(status: u16, reason: impl Into<String>, body: &[u8]) -> Self {
        let body = if body.is_empty() {
            None
        } else {
            let end = body.len().min(BODY_SNIPPET_LIMIT);
            Some(String::from_utf8_lossy(&body[..end]).into_owned())
        };
        Error::HttpStatus {
            status,
            message: reason.into(),
            body,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::configuration_with_context(msg, ErrorContext::new())
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Error::Network { .. } => ErrorKind::Network,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::HttpStatus { status, .. } => ErrorKind::HttpStatus(*status),
            Error::Serialization(_) => ErrorKind::SerializationFailure,
            Error::Configuration { .. } | Error::Io(_) => ErrorKind::Configuration,
        }
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::InvalidArgument { context, .. }
            | Error::Network { context, .. }
            | Error::Timeout { context, .. }
            | Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }
}
