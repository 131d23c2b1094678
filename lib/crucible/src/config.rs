//! Transport configuration types.

use std::time::Duration;

use crate::connector::ClientCertificate;

/// Maximum idle pooled connections kept per host.
pub const DEFAULT_MAX_CONNECTIONS_PER_HOST: usize = 20;

/// Default lifetime bound for pooled connections.
pub const DEFAULT_CONNECTION_LIFETIME: Duration = Duration::from_secs(2 * 60);

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pool sizing and TLS knobs applied to a [`Transport`](crate::Transport).
///
/// The pipeline assembler resets the pool knobs to their defaults and
/// installs the configured client certificates on every client creation; a
/// registered transport configurator runs afterwards and may override any
/// of them. Once the transport has dispatched its first request the pool
/// bounds are fixed for the transport's lifetime.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum idle pooled connections kept per host.
    pub max_connections_per_host: usize,
    /// How long an idle pooled connection is kept before being dropped.
    pub pool_idle_timeout: Duration,
    /// Upper bound on how long a pooled connection may be reused.
    pub pool_connection_lifetime: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Client certificates offered for TLS client authentication.
    pub certificates: Vec<ClientCertificate>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_connections_per_host: DEFAULT_MAX_CONNECTIONS_PER_HOST,
            pool_idle_timeout: DEFAULT_CONNECTION_LIFETIME,
            pool_connection_lifetime: DEFAULT_CONNECTION_LIFETIME,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            certificates: Vec::new(),
        }
    }
}

/// HTTP protocol version preference for outgoing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVersion {
    /// HTTP/1.0.
    Http10,
    /// HTTP/1.1.
    Http11,
    /// HTTP/2.
    Http2,
    /// HTTP/3.
    Http3,
}

impl From<HttpVersion> for http::Version {
    fn from(version: HttpVersion) -> Self {
        match version {
            HttpVersion::Http10 => Self::HTTP_10,
            HttpVersion::Http11 => Self::HTTP_11,
            HttpVersion::Http2 => Self::HTTP_2,
            HttpVersion::Http3 => Self::HTTP_3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TransportConfig::default();
        assert_eq!(config.max_connections_per_host, 20);
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(120));
        assert_eq!(config.pool_connection_lifetime, Duration::from_secs(120));
        assert!(config.certificates.is_empty());
    }

    #[test]
    fn http_version_mapping() {
        assert_eq!(http::Version::from(HttpVersion::Http10), http::Version::HTTP_10);
        assert_eq!(http::Version::from(HttpVersion::Http11), http::Version::HTTP_11);
        assert_eq!(http::Version::from(HttpVersion::Http2), http::Version::HTTP_2);
        assert_eq!(http::Version::from(HttpVersion::Http3), http::Version::HTTP_3);
    }
}
