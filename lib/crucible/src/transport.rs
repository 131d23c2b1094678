//! Primary transport over hyper-util's pooled client.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::{TokioExecutor, TokioTimer},
};
use tower_service::Service;
use tracing::debug;

use crate::{
    Error, Request, Response, Result,
    config::TransportConfig,
    connector::https_connector,
};

type PooledClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

struct TransportState {
    config: TransportConfig,
    pooled: Option<PooledClient>,
}

/// The opaque component performing actual network I/O for requests.
///
/// A `Transport` owns one hyper-util connection pool. Clones share the same
/// pool, so every client assembled from the same transport handle reuses its
/// connections, and a caller-supplied transport stays usable after any
/// client built from it is dropped.
///
/// Pool bounds and TLS material are read from [`TransportConfig`] when the
/// first request is dispatched; configuration changes after that point do
/// not affect the live pool.
#[derive(Clone)]
pub struct Transport {
    state: Arc<Mutex<TransportState>>,
}

impl Transport {
    /// Create a transport with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    /// Create a transport with the given configuration.
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(TransportState {
                config,
                pooled: None,
            })),
        }
    }

    /// Snapshot of the current transport configuration.
    #[must_use]
    pub fn config(&self) -> TransportConfig {
        self.lock().config.clone()
    }

    /// Mutate the transport configuration.
    pub(crate) fn configure(&self, f: impl FnOnce(&mut TransportConfig)) {
        f(&mut self.lock().config);
    }

    /// Freeze the transport into a dispatchable sender, building the pooled
    /// hyper client on first use.
    pub(crate) fn sender(&self) -> Result<TransportSender> {
        let mut state = self.lock();
        if state.pooled.is_none() {
            let connector = https_connector(&state.config)?;
            // hyper's legacy pool has no max-lifetime knob; the shorter of
            // the two configured bounds caps how long a connection idles.
            let idle_timeout = state
                .config
                .pool_idle_timeout
                .min(state.config.pool_connection_lifetime);

            let pooled = Client::builder(TokioExecutor::new())
                .pool_timer(TokioTimer::new())
                .pool_idle_timeout(idle_timeout)
                .pool_max_idle_per_host(state.config.max_connections_per_host)
                .build(connector);
            state.pooled = Some(pooled);
        }

        let pooled = state
            .pooled
            .clone()
            .ok_or_else(|| Error::invalid_request("transport pool unavailable"))?;
        Ok(TransportSender { pooled })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TransportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Transport")
            .field("config", &state.config)
            .field("frozen", &state.pooled.is_some())
            .finish()
    }
}

impl crucible_core::HttpClient for Transport {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let sender = self.sender()?;
        sender.execute(request).await
    }
}

/// Frozen transport handle dispatching requests over the shared pool.
#[derive(Clone)]
pub(crate) struct TransportSender {
    pooled: PooledClient,
}

impl TransportSender {
    /// Build a hyper request from a crucible request.
    fn build_hyper_request(request: Request<Bytes>) -> Result<http::Request<Full<Bytes>>> {
        let version = request.version();
        let (method, url, headers, body, extensions) = request.into_parts();

        let mut builder = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str());

        if let Some(version) = version {
            builder = builder.version(version);
        }

        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = body.map_or_else(Full::default, Full::new);
        let mut http_request = builder
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))?;

        // Transfer request-scoped extensions (e.g. the execution context)
        *http_request.extensions_mut() = extensions;

        Ok(http_request)
    }

    /// Extract response headers as a `HashMap`.
    fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        debug!(method = %request.method(), url = %request.url(), "dispatching request");
        let hyper_request = Self::build_hyper_request(request)?;

        let response = self
            .pooled
            .request(hyper_request)
            .await
            .map_err(Self::map_hyper_error)?;

        let status = response.status().as_u16();
        let response_headers = Self::extract_headers(response.headers());

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::connection(e.to_string()))?
            .to_bytes();

        debug!(status, "transport response received");
        Ok(Response::new(status, response_headers, body))
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Service<Request<Bytes>> for TransportSender {
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send + 'static>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let sender = self.clone();
        Box::pin(async move { sender.execute(request).await })
    }
}
