//! Result Ledger
//!
//! Append-only, capacity-bounded list of finalized results, newest last.
//! The whole list is persisted as one JSON blob after every mutation. The
//! in-memory list is authoritative: a failed save is logged and otherwise
//! ignored.

use std::sync::Arc;

use crate::config::defaults::LEDGER_BLOB_KEY;
use crate::types::TaskResult;

use super::{BlobStore, InMemoryBlobStore};

pub struct ResultLedger {
    results: Vec<TaskResult>,
    capacity: usize,
    store: Arc<dyn BlobStore>,
}

impl ResultLedger {
    /// Restore from `store`.
    ///
    /// A missing blob yields an empty ledger. A malformed blob also yields an
    /// empty ledger, with a warning; it is overwritten on the next mutation.
    pub fn load(store: Arc<dyn BlobStore>, capacity: usize) -> Self {
        let mut results = match store.load(LEDGER_BLOB_KEY) {
            Ok(Some(blob)) => match serde_json::from_slice::<Vec<TaskResult>>(&blob) {
                Ok(results) => results,
                Err(e) => {
                    tracing::warn!(error = %e, "Persisted ledger is malformed, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(
                    backend = store.backend_name(),
                    error = %e,
                    "Failed to load ledger, starting empty"
                );
                Vec::new()
            }
        };

        truncate_front(&mut results, capacity);
        tracing::info!(
            backend = store.backend_name(),
            count = results.len(),
            capacity,
            "Result ledger loaded"
        );

        Self {
            results,
            capacity,
            store,
        }
    }

    /// Ephemeral ledger with no durable backing.
    pub fn in_memory(capacity: usize) -> Self {
        Self::load(Arc::new(InMemoryBlobStore::new()), capacity)
    }

    /// Push a result, evict the oldest beyond capacity, persist.
    pub fn append(&mut self, result: TaskResult) {
        tracing::info!(
            task = %result.task,
            value = result.value,
            status = result.status.as_str(),
            "Result recorded"
        );
        self.results.push(result);
        truncate_front(&mut self.results, self.capacity);
        self.persist();
    }

    /// Drop every result and persist the empty list.
    pub fn clear(&mut self) {
        tracing::info!(count = self.results.len(), "Result ledger cleared");
        self.results.clear();
        self.persist();
    }

    /// Ordered view, newest last.
    pub fn all(&self) -> &[TaskResult] {
        &self.results
    }

    pub fn latest(&self) -> Option<&TaskResult> {
        self.results.last()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn persist(&self) {
        let blob = match serde_json::to_vec(&self.results) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize ledger");
                return;
            }
        };
        if let Err(e) = self.store.save(LEDGER_BLOB_KEY, &blob) {
            tracing::warn!(
                backend = self.store.backend_name(),
                error = %e,
                "Failed to persist ledger, keeping in-memory copy"
            );
        }
    }
}

fn truncate_front(results: &mut Vec<TaskResult>, capacity: usize) {
    if results.len() > capacity {
        let excess = results.len() - capacity;
        results.drain(..excess);
    }
}
