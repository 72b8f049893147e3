use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use futures::future::{AbortHandle, Abortable};
use tracing::debug;

/// Lifetime of a consumer (a screen, a command) that issues requests.
///
/// Work started through [`ViewScope::run`] yields `None` instead of a result
/// once the scope is closed, so late responses are never applied to state
/// that has already been torn down. Dropping the scope closes it.
#[derive(Debug, Default)]
pub struct ViewScope {
    closed: AtomicBool,
    next_id: AtomicU64,
    in_flight: Mutex<HashMap<u64, AbortHandle>>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Drive `fut` to completion unless the scope closes first.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_closed() {
            return None;
        }

        let (handle, registration) = AbortHandle::new_pair();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handles().insert(id, handle);
        // Deregisters on completion and when the caller drops this future.
        let _entry = InFlight { scope: self, id };

        // Re-check after registering so a concurrent close cannot slip between.
        if self.is_closed() {
            return None;
        }

        match Abortable::new(fut, registration).await {
            Ok(output) if !self.is_closed() => Some(output),
            Ok(_) => {
                debug!("Discarding result that completed after scope closed");
                None
            }
            Err(_) => None,
        }
    }

    /// Abandon everything in flight and refuse new work.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let handles: Vec<AbortHandle> = self.handles().drain().map(|(_, h)| h).collect();
        if !handles.is_empty() {
            debug!(count = handles.len(), "Aborting in-flight work");
        }
        for handle in handles {
            handle.abort();
        }
    }

    fn handles(&self) -> std::sync::MutexGuard<'_, HashMap<u64, AbortHandle>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct InFlight<'a> {
    scope: &'a ViewScope,
    id: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.scope.handles().remove(&self.id);
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.close();
    }
}
