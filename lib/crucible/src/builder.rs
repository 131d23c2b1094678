//! Fluent factory builder accumulating client configuration.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tower::Layer;
use tower_service::Service;
use url::Url;

use crate::{
    Error, Request, Response, Result,
    config::{HttpVersion, TransportConfig},
    connector::ClientCertificate,
    factory::ClientFactory,
    middleware::{ExceptionTranslatorLayer, Handler},
    pipeline::BoxedSender,
    policy::Policy,
    transport::Transport,
};

/// Callback invoked on the transport configuration just before a client is
/// assembled, after pool bounds and certificates have been applied.
pub type TransportConfigurator = Arc<dyn Fn(&mut TransportConfig) + Send + Sync>;

/// Accumulated builder configuration, frozen into a [`ClientFactory`].
#[derive(Clone, Default)]
pub(crate) struct FactoryState {
    pub(crate) base_url: Option<Url>,
    pub(crate) default_headers: Vec<(String, String)>,
    pub(crate) certificates: Vec<ClientCertificate>,
    pub(crate) policies: Vec<Arc<dyn Policy>>,
    pub(crate) handlers: Vec<Handler>,
    pub(crate) request_timeout: Option<Duration>,
    pub(crate) http_version: Option<HttpVersion>,
    pub(crate) transport: Option<Transport>,
    pub(crate) configurator: Option<TransportConfigurator>,
}

impl std::fmt::Debug for FactoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryState")
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers.len())
            .field("certificates", &self.certificates.len())
            .field("policies", &self.policies.len())
            .field("handlers", &self.handlers.len())
            .field("request_timeout", &self.request_timeout)
            .field("http_version", &self.http_version)
            .field("transport_override", &self.transport.is_some())
            .field("configurator", &self.configurator.is_some())
            .finish()
    }
}

/// Fluent builder for a pre-configured HTTP client factory.
///
/// Registration order matters for middleware handlers (first registered =
/// first to see the request) and resilience policies (first registered =
/// closest to the transport). The builder is `Clone`, so configuration can
/// fork into several factories frozen at different points.
///
/// # Example
///
/// ```ignore
/// use crucible::FactoryBuilder;
/// use std::time::Duration;
///
/// let factory = FactoryBuilder::new()
///     .with_base_url("https://api.example.com")?
///     .with_default_header("Accept", "application/json")?
///     .with_request_timeout(Duration::from_secs(30))
///     .build();
/// let client = factory.create_client()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct FactoryBuilder {
    state: FactoryState,
}

impl FactoryBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL resolved against relative request paths.
    ///
    /// Setting a base URL twice overwrites the previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute URL.
    pub fn with_base_url(self, base_url: impl AsRef<str>) -> Result<Self> {
        Ok(self.with_base_uri(Url::parse(base_url.as_ref())?))
    }

    /// Set the base URL from an already-parsed [`Url`].
    #[must_use]
    pub fn with_base_uri(mut self, base_url: Url) -> Self {
        self.state.base_url = Some(base_url);
        self
    }

    /// Add a default header sent with every request.
    ///
    /// The first registration of a name wins; registering an
    /// already-present name is silently ignored.
    ///
    /// # Errors
    ///
    /// Returns an error naming `name` when the header name is empty.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid_config("name", "header name must not be empty"));
        }

        if !self.state.default_headers.iter().any(|(n, _)| *n == name) {
            self.state.default_headers.push((name, value.into()));
        }
        Ok(self)
    }

    /// Add a collection of default headers sent with every request.
    ///
    /// Duplicate names follow the same first-registration-wins rule as
    /// [`Self::with_default_header`].
    ///
    /// # Errors
    ///
    /// Returns an error naming `name` when any header name is empty.
    pub fn with_default_headers<K, V>(
        mut self,
        headers: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self = self.with_default_header(name, value)?;
        }
        Ok(self)
    }

    /// Add a client certificate offered for TLS client authentication.
    #[must_use]
    pub fn with_certificate(mut self, certificate: ClientCertificate) -> Self {
        self.state.certificates.push(certificate);
        self
    }

    /// Add a collection of client certificates.
    ///
    /// # Errors
    ///
    /// Returns an error naming `certificates` when the collection is empty.
    pub fn with_certificates(mut self, certificates: Vec<ClientCertificate>) -> Result<Self> {
        if certificates.is_empty() {
            return Err(Error::invalid_config(
                "certificates",
                "must contain at least one certificate",
            ));
        }

        self.state.certificates.extend(certificates);
        Ok(self)
    }

    /// Add a resilience policy to the pipeline.
    ///
    /// Policies nest in registration order: the first-registered policy is
    /// closest to the transport, the last-registered sees the request
    /// first.
    #[must_use]
    pub fn with_policy(self, policy: impl Policy) -> Self {
        self.with_shared_policy(Arc::new(policy))
    }

    /// Add an already-shared resilience policy to the pipeline.
    #[must_use]
    pub fn with_shared_policy(mut self, policy: Arc<dyn Policy>) -> Self {
        self.state.policies.push(policy);
        self
    }

    /// Add a collection of resilience policies, preserving order.
    ///
    /// # Errors
    ///
    /// Returns an error naming `policies` when the collection is empty.
    pub fn with_policies(mut self, policies: Vec<Arc<dyn Policy>>) -> Result<Self> {
        if policies.is_empty() {
            return Err(Error::invalid_config(
                "policies",
                "must contain at least one policy",
            ));
        }

        self.state.policies.extend(policies);
        Ok(self)
    }

    /// Set the timeout covering one whole logical request.
    ///
    /// Setting the timeout twice overwrites the previous value.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.state.request_timeout = Some(timeout);
        self
    }

    /// Set the preferred HTTP protocol version for outgoing requests.
    #[must_use]
    pub fn with_http_version(mut self, version: HttpVersion) -> Self {
        self.state.http_version = Some(version);
        self
    }

    /// Add a middleware handler to the pipeline.
    ///
    /// Handlers run in registration order: the first-registered handler
    /// sees the request first and the response last.
    #[must_use]
    pub fn with_handler<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedSender> + Send + Sync + 'static,
        L::Service: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request<Bytes>>>::Future: Send,
    {
        self.state.handlers.push(Handler::new(layer));
        self
    }

    /// Add a collection of middleware handlers, preserving order.
    ///
    /// # Errors
    ///
    /// Returns an error naming `handlers` when the collection is empty.
    pub fn with_handlers(mut self, handlers: Vec<Handler>) -> Result<Self> {
        if handlers.is_empty() {
            return Err(Error::invalid_config(
                "handlers",
                "must contain at least one message handler",
            ));
        }

        self.state.handlers.extend(handlers);
        Ok(self)
    }

    /// Register an exception-translation middleware.
    ///
    /// Equivalent to registering the layer with [`Self::with_handler`]; it
    /// takes its place in the middleware chain at the registration point.
    #[must_use]
    pub fn with_exception_translator(self, translator: ExceptionTranslatorLayer) -> Self {
        self.with_handler(translator)
    }

    /// Substitute the default transport with a caller-owned one.
    ///
    /// The transport's connection pool is shared with every client
    /// assembled from it, and the transport stays usable after those
    /// clients are dropped.
    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.state.transport = Some(transport);
        self
    }

    /// Register a callback to adjust the transport configuration just
    /// before each client is assembled.
    ///
    /// Only the most recently registered configurator is invoked.
    #[must_use]
    pub fn with_transport_configurator(
        mut self,
        configurator: impl Fn(&mut TransportConfig) + Send + Sync + 'static,
    ) -> Self {
        self.state.configurator = Some(Arc::new(configurator));
        self
    }

    /// Freeze the configuration into a client factory.
    #[must_use]
    pub fn build(self) -> ClientFactory {
        ClientFactory::new(self.state)
    }
}
