//! Error types for crucible.

use derive_more::{Display, Error, From};

/// Main error type for crucible operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Invalid builder configuration, reported synchronously by the builder
    /// call that received the bad input. `param` names the offending
    /// parameter and is a stable, test-relevant contract.
    #[display("invalid configuration for `{param}`: {message}")]
    #[from(skip)]
    InvalidConfig {
        /// Name of the offending builder parameter.
        param: String,
        /// Description of the problem.
        message: String,
    },

    /// HTTP-level errors (non-2xx status codes surfaced as errors).
    #[display("HTTP error {status}: {message}")]
    #[from(skip)]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
        /// Response body, if available.
        #[error(not(source))]
        body: Option<bytes::Bytes>,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request construction.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// JSON serialization error.
    #[display("JSON error: {_0}")]
    #[from]
    Json(serde_json::Error),

    /// Caller-defined replacement produced by an exception translator.
    /// Downcast the boxed error to recover the concrete type.
    #[display("{_0}")]
    #[from(skip)]
    Translated(#[error(not(source))] Box<dyn std::error::Error + Send + Sync>),

    /// An exception translator matched this error but declined to replace
    /// it; the original error is carried as the source.
    #[display("request failed: {source}")]
    #[from(skip)]
    Untranslated {
        /// The original, untranslated error.
        source: Box<Error>,
    },
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid-configuration error naming the offending parameter.
    #[must_use]
    pub fn invalid_config(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP error from status code and message.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: None,
        }
    }

    /// Create an HTTP error with body.
    #[must_use]
    pub fn http_with_body(status: u16, message: impl Into<String>, body: bytes::Bytes) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: Some(body),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a translated error from a caller-defined replacement.
    #[must_use]
    pub fn translated(replacement: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Translated(Box::new(replacement))
    }

    /// Returns the offending parameter name for invalid-configuration errors.
    #[must_use]
    pub fn config_param(&self) -> Option<&str> {
        match self {
            Self::InvalidConfig { param, .. } => Some(param),
            _ => None,
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns the HTTP status code if this is an HTTP error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }

    /// Returns the response body if this is an HTTP error with a body.
    #[must_use]
    pub fn body(&self) -> Option<&bytes::Bytes> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}
