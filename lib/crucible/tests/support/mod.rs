//! Shared test fixtures: recording middleware and simple test policies.
#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use crucible::{
    BoxFuture, BoxedSender, Error, ExecutionContext, Operation, Policy, Request, Response, Result,
    SenderFuture,
};
use tower::Layer;
use tower_service::Service;

/// Shared visit log appended to by middleware and policies.
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn push(log: &Log, entry: impl Into<String>) {
    log.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(entry.into());
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Middleware recording when it sees the request and the response.
#[derive(Clone)]
pub struct RecordingLayer {
    name: &'static str,
    log: Log,
}

impl RecordingLayer {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
        }
    }
}

impl Layer<BoxedSender> for RecordingLayer {
    type Service = Recording;

    fn layer(&self, inner: BoxedSender) -> Self::Service {
        Recording {
            name: self.name,
            log: self.log.clone(),
            inner,
        }
    }
}

#[derive(Clone)]
pub struct Recording {
    name: &'static str,
    log: Log,
    inner: BoxedSender,
}

impl Service<Request<Bytes>> for Recording {
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = SenderFuture;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let name = self.name;
        let log = self.log.clone();
        let mut inner = self.inner.clone();
        Box::pin(async move {
            push(&log, format!("{name}>"));
            let result = inner.call(request).await;
            push(&log, format!("<{name}"));
            result
        })
    }
}

/// Middleware recording a request header value and the request version.
#[derive(Clone)]
pub struct ProbeLayer {
    header: &'static str,
    log: Log,
}

impl ProbeLayer {
    pub fn new(header: &'static str, log: &Log) -> Self {
        Self {
            header,
            log: log.clone(),
        }
    }
}

impl Layer<BoxedSender> for ProbeLayer {
    type Service = Probe;

    fn layer(&self, inner: BoxedSender) -> Self::Service {
        Probe {
            header: self.header,
            log: self.log.clone(),
            inner,
        }
    }
}

#[derive(Clone)]
pub struct Probe {
    header: &'static str,
    log: Log,
    inner: BoxedSender,
}

impl Service<Request<Bytes>> for Probe {
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = SenderFuture;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let value = request.header(self.header).unwrap_or("<missing>");
        push(&self.log, format!("{}={value}", self.header));
        push(&self.log, format!("version={:?}", request.version()));
        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(request).await })
    }
}

/// Policy recording when it wraps the inner operation.
pub struct RecordingPolicy {
    name: &'static str,
    log: Log,
}

impl RecordingPolicy {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
        }
    }
}

impl Policy for RecordingPolicy {
    fn execute(
        &self,
        _context: ExecutionContext,
        request: Request<Bytes>,
        operation: Operation,
    ) -> BoxFuture<Result<Response<Bytes>>> {
        let name = self.name;
        let log = self.log.clone();
        Box::pin(async move {
            push(&log, format!("{name}>"));
            let result = operation(request).await;
            push(&log, format!("<{name}"));
            result
        })
    }
}

/// Retries on 5xx, 408, connection errors, and timeouts, up to
/// `max_retries` extra attempts. Records the attempt count in the
/// execution context under `attempt`.
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    fn should_retry(result: &Result<Response<Bytes>>) -> bool {
        match result {
            Ok(response) => response.status() >= 500 || response.status() == 408,
            Err(err) => err.is_connection() || err.is_timeout(),
        }
    }
}

impl Policy for RetryPolicy {
    fn execute(
        &self,
        context: ExecutionContext,
        request: Request<Bytes>,
        operation: Operation,
    ) -> BoxFuture<Result<Response<Bytes>>> {
        let max_retries = self.max_retries;
        Box::pin(async move {
            let mut attempt: u32 = 0;
            loop {
                attempt += 1;
                context.insert("attempt", attempt.to_string());

                let result = operation(request.clone()).await;
                if !Self::should_retry(&result) || attempt > max_retries {
                    return result;
                }
            }
        })
    }
}

/// Bounds the wrapped operation by a deadline, producing a timeout error
/// on expiry. Cancels the inner operation by dropping its future.
pub struct DeadlinePolicy {
    limit: Duration,
}

impl DeadlinePolicy {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }
}

impl Policy for DeadlinePolicy {
    fn execute(
        &self,
        _context: ExecutionContext,
        request: Request<Bytes>,
        operation: Operation,
    ) -> BoxFuture<Result<Response<Bytes>>> {
        let limit = self.limit;
        Box::pin(async move {
            tokio::time::timeout(limit, operation(request))
                .await
                .map_err(|_| Error::Timeout)?
        })
    }
}

/// Policy reading a context value once the inner operation completes.
pub struct ContextObserverPolicy {
    key: &'static str,
    log: Log,
}

impl ContextObserverPolicy {
    pub fn new(key: &'static str, log: &Log) -> Self {
        Self {
            key,
            log: log.clone(),
        }
    }
}

impl Policy for ContextObserverPolicy {
    fn execute(
        &self,
        context: ExecutionContext,
        request: Request<Bytes>,
        operation: Operation,
    ) -> BoxFuture<Result<Response<Bytes>>> {
        let key = self.key;
        let log = self.log.clone();
        Box::pin(async move {
            let result = operation(request).await;
            let value = context.get(key).unwrap_or_else(|| "<missing>".to_string());
            push(&log, format!("{key}={value}"));
            result
        })
    }
}
