//! Bounded pool of outstanding model calls.
//!
//! Permits are tokens in a bounded channel. A caller waits at most `wait`
//! for one; running out of patience is reported as a timeout so the
//! question degrades instead of queueing forever.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use quarry_core::errors::ModelError;
use quarry_core::traits::{CompletionRequest, ILanguageModel};
use tracing::debug;

pub struct BoundedModel {
    inner: Arc<dyn ILanguageModel>,
    release: Sender<()>,
    acquire: Receiver<()>,
    capacity: usize,
    wait: Duration,
}

/// Returns its permit on drop, including when the inner call panics.
struct Permit<'a> {
    release: &'a Sender<()>,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let _ = self.release.try_send(());
    }
}

impl BoundedModel {
    pub fn new(inner: Arc<dyn ILanguageModel>, max_outstanding: usize, wait: Duration) -> Self {
        let capacity = max_outstanding.max(1);
        let (release, acquire) = bounded(capacity);
        for _ in 0..capacity {
            let _ = release.try_send(());
        }
        Self {
            inner,
            release,
            acquire,
            capacity,
            wait,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held by a call.
    pub fn idle_permits(&self) -> usize {
        self.acquire.len()
    }
}

impl ILanguageModel for BoundedModel {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError> {
        if self.acquire.recv_timeout(self.wait).is_err() {
            debug!(capacity = self.capacity, "no model permit within wait");
            return Err(ModelError::Timeout {
                timeout_ms: self.wait.as_millis() as u64,
            });
        }
        let _permit = Permit {
            release: &self.release,
        };
        self.inner.complete(request)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}
