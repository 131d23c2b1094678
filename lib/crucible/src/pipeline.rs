//! Request pipeline assembly.
//!
//! Splices two independently-ordered chains into one linear pipeline:
//!
//! - middleware handlers keep registration order, first-registered
//!   outermost (sees the request first, the response last);
//! - resilience policies nest around the transport innermost-first, so the
//!   last-registered policy is the outermost wrapper.
//!
//! When middleware exist, the innermost handler delegates to the
//! policy-wrapped transport (or the bare transport when no policies are
//! registered). With no middleware, the entry point is the policy-wrapped
//! transport itself; neither empty list adds a wrapping stage.
//!
//! Assembly is deterministic and leaves the configuration snapshot
//! untouched, so repeated client creation yields structurally equivalent,
//! independent pipelines.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tower::util::BoxCloneService;
use tower_service::Service;
use tracing::debug;

use crate::{
    Error, Request, Response, Result,
    builder::FactoryState,
    config::{DEFAULT_CONNECTION_LIFETIME, DEFAULT_MAX_CONNECTIONS_PER_HOST},
    middleware::Handler,
    policy::{Policy, PolicyStage},
    transport::Transport,
};

/// Type-erased pipeline stage: accepts a request, produces a response.
pub type BoxedSender = BoxCloneService<Request<Bytes>, Response<Bytes>, Error>;

/// Future returned by pipeline stages.
pub type SenderFuture = Pin<Box<dyn Future<Output = Result<Response<Bytes>>> + Send + 'static>>;

/// Thread-safe wrapper for [`BoxedSender`].
///
/// `BoxCloneService` is not `Sync`; guarding it with a mutex lets the
/// assembled pipeline be shared across threads. The lock is held only long
/// enough to clone the sender.
#[derive(Clone)]
pub(crate) struct SyncSender {
    inner: Arc<Mutex<BoxedSender>>,
}

impl SyncSender {
    pub(crate) fn new(sender: BoxedSender) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sender)),
        }
    }

    pub(crate) fn call(&self, request: Request<Bytes>) -> SenderFuture {
        // Lock, clone the sender, and release the lock immediately
        let mut sender = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Box::pin(async move { sender.call(request).await })
    }
}

/// Nest `policies` around `innermost` in registration order.
///
/// Left-to-right fold: the first-registered policy wraps the transport
/// directly, each later policy wraps the result, so the last-registered
/// policy is evaluated first. Registering `[retry, timeout]` therefore
/// makes the timeout an outer bound across all retry attempts. An empty
/// list returns `innermost` unchanged.
pub(crate) fn nest_policies(policies: &[Arc<dyn Policy>], innermost: BoxedSender) -> BoxedSender {
    policies.iter().fold(innermost, |sender, policy| {
        BoxCloneService::new(PolicyStage::new(Arc::clone(policy), sender))
    })
}

/// Link `handlers` into a chain ending at `inner`.
///
/// Folds in reverse registration order so the first-registered handler
/// wraps everything else. The chain is rebuilt from the ordered list on
/// every assembly; stages are never shared between pipelines. An empty
/// list returns `inner` unchanged.
pub(crate) fn link_handlers(handlers: &[Handler], inner: BoxedSender) -> BoxedSender {
    handlers
        .iter()
        .rev()
        .fold(inner, |sender, handler| handler.wrap(sender))
}

/// Assemble the full request pipeline from a configuration snapshot.
///
/// Chooses the transport (caller override or default), re-applies the
/// pool bounds and client certificates, runs the registered transport
/// configurator so it may override them, freezes the transport sender,
/// then splices policies and middleware around it.
pub(crate) fn assemble(state: &FactoryState) -> Result<(SyncSender, Transport)> {
    let transport = state.transport.clone().unwrap_or_default();

    transport.configure(|config| {
        config.max_connections_per_host = DEFAULT_MAX_CONNECTIONS_PER_HOST;
        config.pool_idle_timeout = DEFAULT_CONNECTION_LIFETIME;
        config.pool_connection_lifetime = DEFAULT_CONNECTION_LIFETIME;
        if !state.certificates.is_empty() {
            config.certificates = state.certificates.clone();
        }
    });

    if let Some(configurator) = &state.configurator {
        transport.configure(|config| configurator(config));
    }

    let sender = BoxCloneService::new(transport.sender()?);
    let sender = nest_policies(&state.policies, sender);
    let entry = link_handlers(&state.handlers, sender);

    debug!(
        handlers = state.handlers.len(),
        policies = state.policies.len(),
        "assembled request pipeline"
    );

    Ok((SyncSender::new(entry), transport))
}
