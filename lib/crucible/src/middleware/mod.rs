//! Middleware handlers for the request pipeline.
//!
//! Middleware are tower [`Layer`]s over the crate's request/response types,
//! registered on the builder in the order they should see outgoing
//! requests: the first-registered handler is outermost (sees the request
//! first and the response last), classic onion layering.
//!
//! [`Handler`] is the type-erased registration unit; any compatible layer
//! converts into one via [`Handler::new`]. The one middleware shipped with
//! the crate is the [`ExceptionTranslatorLayer`].

mod exception_translator;

pub use exception_translator::{ExceptionTranslator, ExceptionTranslatorLayer};

use std::sync::Arc;

use bytes::Bytes;
use tower::Layer;
use tower::util::BoxCloneService;
use tower_service::Service;

use crate::{
    Error, Request, Response,
    pipeline::BoxedSender,
};

/// A type-erased middleware handler.
///
/// Holds the wiring step that wraps an inner pipeline stage with the
/// handler's service; the pipeline assembler applies these steps in reverse
/// registration order so the first-registered handler ends up outermost.
#[derive(Clone)]
pub struct Handler {
    wrap: Arc<dyn Fn(BoxedSender) -> BoxedSender + Send + Sync>,
}

impl Handler {
    /// Erase a tower layer into a registrable handler.
    pub fn new<L>(layer: L) -> Self
    where
        L: Layer<BoxedSender> + Send + Sync + 'static,
        L::Service: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request<Bytes>>>::Future: Send,
    {
        Self {
            wrap: Arc::new(move |inner| BoxCloneService::new(layer.layer(inner))),
        }
    }

    /// Wrap `inner` with this handler's service.
    pub(crate) fn wrap(&self, inner: BoxedSender) -> BoxedSender {
        (self.wrap)(inner)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}
