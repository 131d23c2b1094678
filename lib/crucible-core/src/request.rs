//! HTTP request building.
//!
//! Use [`Request::builder`] to construct requests with headers, query
//! parameters, and bodies.
//!
//! # Example
//!
//! ```
//! use crucible_core::{Request, Method};
//! use bytes::Bytes;
//!
//! let request = Request::<Bytes>::builder(Method::Get, "https://api.example.com".parse().unwrap())
//!     .header("Accept", "application/json")
//!     .query("page", "1")
//!     .build();
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use http::Extensions;

use crate::{ExecutionContext, Method};

/// An HTTP request with method, URL, headers, and optional body.
///
/// Requests also carry an [`Extensions`] slot used to thread request-scoped
/// values (such as the [`ExecutionContext`]) through the pipeline.
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<B>,
    version: Option<http::Version>,
    extensions: Extensions,
}

impl<B> Request<B> {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder<B> {
        RequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Preferred HTTP protocol version, if one was set.
    #[must_use]
    pub const fn version(&self) -> Option<http::Version> {
        self.version
    }

    /// Set the preferred HTTP protocol version.
    pub const fn set_version(&mut self, version: http::Version) {
        self.version = Some(version);
    }

    /// Request-scoped extensions.
    #[must_use]
    pub const fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mutable access to request-scoped extensions.
    #[must_use]
    pub const fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Retrieve the execution context previously attached to this request.
    ///
    /// Returns `None` when no context has been attached; absence is a
    /// normal state, not an error.
    #[must_use]
    pub fn execution_context(&self) -> Option<ExecutionContext> {
        self.extensions.get::<ExecutionContext>().cloned()
    }

    /// Attach an execution context to this request.
    ///
    /// The context travels with the request through every pipeline stage,
    /// so resilience policies share state across physical attempts. Do not
    /// reuse one context across two concurrent logical requests.
    pub fn set_execution_context(&mut self, context: ExecutionContext) {
        self.extensions.insert(context);
    }

    /// Consume into (method, url, headers, body, extensions).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, HashMap<String, String>, Option<B>, Extensions) {
        (
            self.method,
            self.url,
            self.headers,
            self.body,
            self.extensions,
        )
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<B>,
    version: Option<http::Version>,
}

impl<B> RequestBuilder<B> {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
            version: None,
        }
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets multiple headers.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Sets the preferred HTTP protocol version.
    #[must_use]
    pub const fn version(mut self, version: http::Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: B) -> Self {
        self.body = Some(body);
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request<B> {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            version: self.version,
            extensions: Extensions::new(),
        }
    }
}

impl RequestBuilder<Bytes> {
    /// Set a JSON body with the matching `Content-Type` header.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: serde::Serialize>(self, value: &T) -> crate::Result<Self> {
        let body = Bytes::from(serde_json::to_vec(value)?);
        Ok(self.header("Content-Type", "application/json").body(body))
    }
}
