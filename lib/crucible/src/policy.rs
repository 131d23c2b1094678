//! Resilience policy abstraction.
//!
//! A [`Policy`] wraps the sending of one logical request and decides how
//! many physical attempts it takes, how long it may run, or whether it runs
//! at all. The policy engine itself (backoff math, breaker state) lives
//! with the caller; this crate only defines the execution seam and wires
//! policies into the pipeline in the configured nesting order.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tower_service::Service;

use crate::{
    ExecutionContext, Request, Response, Result,
    pipeline::{BoxedSender, SyncSender},
};

/// Boxed future used across the policy seam.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// The operation a policy drives: forwards one request to the inner
/// pipeline stage. A policy may invoke it once per physical attempt.
pub type Operation =
    Arc<dyn Fn(Request<Bytes>) -> BoxFuture<Result<Response<Bytes>>> + Send + Sync>;

/// A resilience policy wrapping an async send operation.
///
/// Policies registered on the builder nest around the transport in
/// configuration order: the first-configured policy sits closest to the
/// transport, the last-configured policy sees the request first.
pub trait Policy: Send + Sync + 'static {
    /// Execute `operation` for `request` under this policy.
    ///
    /// The `context` is shared by every policy layer of one logical
    /// request, across all physical attempts the layers may trigger.
    /// Implementations return whatever the operation (or their own
    /// failure handling) produces.
    fn execute(
        &self,
        context: ExecutionContext,
        request: Request<Bytes>,
        operation: Operation,
    ) -> BoxFuture<Result<Response<Bytes>>>;
}

/// Pipeline stage adapting a [`Policy`] to the tower service chain.
///
/// On each call it reads the execution context off the request, creating
/// and attaching a fresh one when absent, then hands the policy a callable
/// that forwards to the wrapped inner sender.
#[derive(Clone)]
pub(crate) struct PolicyStage {
    policy: Arc<dyn Policy>,
    inner: SyncSender,
}

impl PolicyStage {
    pub(crate) fn new(policy: Arc<dyn Policy>, inner: BoxedSender) -> Self {
        Self {
            policy,
            inner: SyncSender::new(inner),
        }
    }
}

impl Service<Request<Bytes>> for PolicyStage {
    type Response = Response<Bytes>;
    type Error = crate::Error;
    type Future = BoxFuture<Result<Self::Response>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut request: Request<Bytes>) -> Self::Future {
        let context = match request.execution_context() {
            Some(context) => context,
            None => {
                let context = ExecutionContext::new();
                request.set_execution_context(context.clone());
                context
            }
        };

        let inner = self.inner.clone();
        let operation: Operation = Arc::new(move |request| inner.call(request));

        self.policy.execute(context, request, operation)
    }
}
