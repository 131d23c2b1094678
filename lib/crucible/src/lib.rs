//! Fluent factory for pre-configured HTTP clients.
//!
//! Configure a base URL, default headers, client certificates, pool
//! bounds, timeout, protocol version, middleware handlers, and resilience
//! policies once; create ready-to-use clients from the frozen
//! configuration.
//!
//! # Example
//!
//! ```ignore
//! use crucible::FactoryBuilder;
//! use std::time::Duration;
//!
//! let factory = FactoryBuilder::new()
//!     .with_base_url("https://api.example.com")?
//!     .with_default_header("Accept", "application/json")?
//!     .with_request_timeout(Duration::from_secs(30))
//!     .build();
//!
//! let client = factory.create_client()?;
//! let response = client.get("/users/42").await?;
//! ```
//!
//! Middleware handlers registered on the builder see requests in
//! registration order (first registered = outermost); resilience policies
//! nest around the transport in the opposite direction (first registered =
//! innermost). Registering `[retry, timeout]` therefore bounds all retry
//! attempts by the timeout.

mod builder;
mod client;
mod config;
mod connector;
mod factory;
pub mod middleware;
mod pipeline;
mod policy;
mod transport;

// Re-export builder and client types
pub use builder::{FactoryBuilder, TransportConfigurator};
pub use client::Client;
pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_CONNECTION_LIFETIME, DEFAULT_MAX_CONNECTIONS_PER_HOST,
    HttpVersion, TransportConfig,
};
pub use connector::ClientCertificate;
pub use factory::ClientFactory;
pub use middleware::{ExceptionTranslator, ExceptionTranslatorLayer, Handler};
pub use pipeline::{BoxedSender, SenderFuture};
pub use policy::{BoxFuture, Operation, Policy};
pub use transport::Transport;

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use crucible_core::{
    Error, ExecutionContext, HttpClient, HttpClientExt, Method, Request, RequestBuilder, Response,
    Result,
};

// Re-export http types for status codes, headers, and versions
pub use crucible_core::{StatusCode, Version, header};
