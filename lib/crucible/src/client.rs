//! Pre-configured HTTP client issuing requests through the assembled
//! pipeline.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use url::Url;

use crate::{
    Error, Method, Request, RequestBuilder, Response, Result,
    builder::FactoryState,
    pipeline::SyncSender,
};

/// A ready-to-use HTTP client.
///
/// The pipeline behind a client is immutable; clones share it, and
/// concurrent requests are independent. Dropping a client never invalidates
/// a caller-supplied [`Transport`](crate::Transport) — only the pipeline
/// handle is released.
#[derive(Clone)]
pub struct Client {
    entry: SyncSender,
    base_url: Option<Url>,
    default_headers: Arc<[(String, String)]>,
    request_timeout: Option<Duration>,
    http_version: Option<http::Version>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers.len())
            .field("request_timeout", &self.request_timeout)
            .field("http_version", &self.http_version)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub(crate) fn from_state(entry: SyncSender, state: &FactoryState) -> Self {
        Self {
            entry,
            base_url: state.base_url.clone(),
            default_headers: state.default_headers.clone().into(),
            request_timeout: state.request_timeout,
            http_version: state.http_version.map(http::Version::from),
        }
    }

    /// Base URL relative request paths resolve against.
    #[must_use]
    pub const fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Configured per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Configured HTTP protocol version preference.
    #[must_use]
    pub const fn http_version(&self) -> Option<http::Version> {
        self.http_version
    }

    /// Start building a request for `target`, resolved against the base
    /// URL when relative.
    ///
    /// # Errors
    ///
    /// Returns an error when `target` is relative and no base URL is
    /// configured, or when the resolved URL is invalid.
    pub fn request(&self, method: Method, target: &str) -> Result<RequestBuilder<Bytes>> {
        Ok(Request::builder(method, self.resolve_url(target)?))
    }

    /// Send a fully built request through the pipeline.
    ///
    /// Default headers are added for names the request does not already
    /// carry; a header set on the request is never overwritten. The
    /// configured HTTP version is stamped on requests that do not set one,
    /// and the configured timeout bounds the whole pipeline traversal.
    /// Dropping the returned future cancels the request through every
    /// middleware and policy layer down to the transport I/O.
    pub async fn send(&self, mut request: Request<Bytes>) -> Result<Response<Bytes>> {
        for (name, value) in self.default_headers.iter() {
            if !request.headers().contains_key(name) {
                request.headers_mut().insert(name.clone(), value.clone());
            }
        }

        if request.version().is_none()
            && let Some(version) = self.http_version
        {
            request.set_version(version);
        }

        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, self.entry.call(request))
                .await
                .map_err(|_| Error::Timeout)?,
            None => self.entry.call(request).await,
        }
    }

    /// Send a GET request to `target`.
    pub async fn get(&self, target: &str) -> Result<Response<Bytes>> {
        self.send(self.request(Method::Get, target)?.build()).await
    }

    /// Send a HEAD request to `target`.
    pub async fn head(&self, target: &str) -> Result<Response<Bytes>> {
        self.send(self.request(Method::Head, target)?.build()).await
    }

    /// Send a DELETE request to `target`.
    pub async fn delete(&self, target: &str) -> Result<Response<Bytes>> {
        self.send(self.request(Method::Delete, target)?.build())
            .await
    }

    /// Send a POST request with the given body to `target`.
    pub async fn post(&self, target: &str, body: impl Into<Bytes>) -> Result<Response<Bytes>> {
        self.send(self.request(Method::Post, target)?.body(body.into()).build())
            .await
    }

    /// Send a PUT request with the given body to `target`.
    pub async fn put(&self, target: &str, body: impl Into<Bytes>) -> Result<Response<Bytes>> {
        self.send(self.request(Method::Put, target)?.body(body.into()).build())
            .await
    }

    /// Send a PATCH request with the given body to `target`.
    pub async fn patch(&self, target: &str, body: impl Into<Bytes>) -> Result<Response<Bytes>> {
        self.send(
            self.request(Method::Patch, target)?.body(body.into()).build(),
        )
        .await
    }

    fn resolve_url(&self, target: &str) -> Result<Url> {
        match &self.base_url {
            Some(base) => Ok(base.join(target)?),
            None => Ok(Url::parse(target)?),
        }
    }
}

impl crucible_core::HttpClient for Client {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        self.send(request).await
    }
}
