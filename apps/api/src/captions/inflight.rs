//! In-flight batch registry keyed by workbench session.
//!
//! Starting a batch for a session cancels the batch that session still has running,
//! which is what the workbench "regenerate" button means. Entries are removed when
//! the owning guard drops; a superseded guard never removes its successor's entry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use crate::captions::cancel::CancelToken;

#[derive(Default)]
pub struct InFlightBatches {
    batches: Mutex<HashMap<String, (u64, CancelToken)>>,
    next_batch_id: AtomicU64,
}

impl InFlightBatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new batch for `session_id`, cancelling any batch it replaces.
    pub fn begin(self: &Arc<Self>, session_id: &str) -> BatchGuard {
        let token = CancelToken::new();
        let batch_id = self.next_batch_id.fetch_add(1, Ordering::Relaxed);

        let previous = self
            .lock()
            .insert(session_id.to_string(), (batch_id, token.clone()));

        if let Some((_, superseded)) = previous {
            superseded.cancel();
            info!(session_id, "Superseded in-flight variant batch");
        }

        BatchGuard {
            registry: Arc::clone(self),
            session_id: session_id.to_string(),
            batch_id,
            token,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, (u64, CancelToken)>> {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keeps a batch registered while alive.
pub struct BatchGuard {
    registry: Arc<InFlightBatches>,
    session_id: String,
    batch_id: u64,
    token: CancelToken,
}

impl BatchGuard {
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let mut batches = self.registry.lock();
        let owns_entry = batches
            .get(&self.session_id)
            .is_some_and(|(id, _)| *id == self.batch_id);
        if owns_entry {
            batches.remove(&self.session_id);
        }
    }
}
