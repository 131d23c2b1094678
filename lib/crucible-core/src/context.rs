//! Per-request execution context shared across resilience-policy attempts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Opaque context attached to one logical request.
///
/// Resilience policies use the context to share state (attempt counters,
/// deadlines, correlation data) across the multiple physical attempts one
/// logical request may trigger. Clones are shallow: every clone reads and
/// writes the same underlying values.
///
/// A context must not be reused across two concurrent logical requests;
/// retry/timeout attribution becomes meaningless when two requests write
/// the same counters.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl ExecutionContext {
    /// Create an empty execution context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`, returning the previous value if any.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.lock().insert(key.into(), value.into())
    }

    /// Look up the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Returns `true` if a value is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no values are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
