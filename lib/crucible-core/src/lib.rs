//! Core types for the crucible pre-configured HTTP client factory.
//!
//! This crate provides the foundational types used by crucible:
//! - [`Method`] - HTTP method enum
//! - [`Request`] and [`RequestBuilder`] - HTTP request types
//! - [`Response`] - HTTP response type
//! - [`Error`] and [`Result`] - Error handling
//! - [`ExecutionContext`] - Per-request context shared across policy attempts
//! - [`HttpClient`] - Core client trait for HTTP execution
//! - [`StatusCode`] and [`Version`] - re-exported from the `http` crate

mod client;
mod context;
mod error;
mod method;
mod request;
mod response;

pub use client::{HttpClient, HttpClientExt};
pub use context::ExecutionContext;
pub use error::{Error, Result};
pub use method::Method;
pub use request::{Request, RequestBuilder};
pub use response::Response;

// Re-export http crate types for status codes, headers, and versions
pub use http::{StatusCode, Version, header};
