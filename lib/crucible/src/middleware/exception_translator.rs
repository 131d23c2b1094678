//! Exception translation middleware.
//!
//! Surfaces non-success responses as errors and lets the caller replace
//! matching errors with their own error type, with optional notification
//! callbacks observing both the original and the translated error.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tower::Layer;
use tower_service::Service;

use crate::{Error, Request, Response, Result};

/// Decides whether a given error is subject to translation.
pub type ErrorPredicate = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Produces a replacement error, or `None` to keep the original.
pub type ErrorTransform =
    Arc<dyn Fn(&Error) -> Option<Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// Observer callback receiving an error reference.
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// Layer that installs an [`ExceptionTranslator`] stage.
///
/// # Example
///
/// ```ignore
/// let translator = ExceptionTranslatorLayer::new(
///     |err| err.status() == Some(429),
///     |err| Some(Box::new(RateLimited(err.to_string()))),
/// )
/// .on_error(|err| eprintln!("observed: {err}"));
/// ```
#[derive(Clone)]
pub struct ExceptionTranslatorLayer {
    predicate: ErrorPredicate,
    transform: ErrorTransform,
    on_error: Option<ErrorCallback>,
    on_translated: Option<ErrorCallback>,
}

impl ExceptionTranslatorLayer {
    /// Create a translator from a predicate and a transform.
    ///
    /// When the predicate matches a request error, the transform may
    /// produce a replacement; returning `None` keeps (and wraps) the
    /// original error instead of swallowing it.
    pub fn new(
        predicate: impl Fn(&Error) -> bool + Send + Sync + 'static,
        transform: impl Fn(&Error) -> Option<Box<dyn std::error::Error + Send + Sync>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            predicate: Arc::new(predicate),
            transform: Arc::new(transform),
            on_error: None,
            on_translated: None,
        }
    }

    /// Observe every predicate-matched error before translation runs.
    #[must_use]
    pub fn on_error(mut self, callback: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Observe successfully translated errors, fired once per replacement.
    #[must_use]
    pub fn on_translated(mut self, callback: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_translated = Some(Arc::new(callback));
        self
    }
}

impl std::fmt::Debug for ExceptionTranslatorLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionTranslatorLayer")
            .field("on_error", &self.on_error.is_some())
            .field("on_translated", &self.on_translated.is_some())
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for ExceptionTranslatorLayer {
    type Service = ExceptionTranslator<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExceptionTranslator {
            inner,
            predicate: Arc::clone(&self.predicate),
            transform: Arc::clone(&self.transform),
            on_error: self.on_error.clone(),
            on_translated: self.on_translated.clone(),
        }
    }
}

/// Middleware stage performing the translation.
#[derive(Clone)]
pub struct ExceptionTranslator<S> {
    inner: S,
    predicate: ErrorPredicate,
    transform: ErrorTransform,
    on_error: Option<ErrorCallback>,
    on_translated: Option<ErrorCallback>,
}

impl<S> Service<Request<Bytes>> for ExceptionTranslator<S>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let mut inner = self.inner.clone();
        let predicate = Arc::clone(&self.predicate);
        let transform = Arc::clone(&self.transform);
        let on_error = self.on_error.clone();
        let on_translated = self.on_translated.clone();

        Box::pin(async move {
            let result = inner
                .call(request)
                .await
                .and_then(Response::error_for_status);

            let err = match result {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if !(predicate)(&err) {
                return Err(err);
            }

            if let Some(callback) = &on_error {
                callback(&err);
            }

            match (transform)(&err) {
                Some(replacement) => {
                    let translated = Error::Translated(replacement);
                    if let Some(callback) = &on_translated {
                        callback(&translated);
                    }
                    Err(translated)
                }
                None => Err(Error::Untranslated {
                    source: Box::new(err),
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_is_debug() {
        let layer = ExceptionTranslatorLayer::new(|_| true, |_| None).on_error(|_| {});
        let debug = format!("{layer:?}");
        assert!(debug.contains("on_error: true"));
        assert!(debug.contains("on_translated: false"));
    }
}
