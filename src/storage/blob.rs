//! BlobStore trait: pluggable single-blob persistence
//!
//! The ledger persists itself as one named blob. Backends:
//! - `SledBlobStore`: named sled tree, durable
//! - `InMemoryBlobStore`: tests and ephemeral runs, optional save failures
//! - `DeferredBlobStore`: wraps another store and performs saves on a
//!   background task so callers never wait on I/O

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::{mpsc, oneshot};

/// Trait for pluggable blob backends
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across async tasks.
pub trait BlobStore: Send + Sync {
    /// Fetch a blob; `Ok(None)` when the key has never been written.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the blob stored under `key`.
    fn save(&self, key: &str, blob: &[u8]) -> Result<(), StorageError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("background writer has shut down")]
    ChannelClosed,
}

// ============================================================================
// Sled
// ============================================================================

/// Durable backend: one sled tree, one key per blob.
#[derive(Clone)]
pub struct SledBlobStore {
    tree: sled::Tree,
}

impl SledBlobStore {
    /// Open (or create) the database at `path` and the named tree within it.
    pub fn open<P: AsRef<Path>>(path: P, tree: &str) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        tracing::info!(path = %path.display(), tree, "Ledger storage opened");
        Self::from_db(&db, tree)
    }

    /// Use a tree of an already-open database.
    pub fn from_db(db: &sled::Db, tree: &str) -> Result<Self, StorageError> {
        Ok(Self {
            tree: db.open_tree(tree)?,
        })
    }
}

impl BlobStore for SledBlobStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    fn save(&self, key: &str, blob: &[u8]) -> Result<(), StorageError> {
        self.tree.insert(key, blob.to_vec())?;
        self.tree.flush()?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// In-memory backend for testing and ephemeral runs
///
/// Thread-safe via `RwLock`. Not durable.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    fail_saves: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a blob, e.g. to simulate data left by a previous run.
    pub fn with_blob(self, key: &str, blob: impl Into<Vec<u8>>) -> Self {
        if let Ok(mut blobs) = self.blobs.write() {
            blobs.insert(key.to_string(), blob.into());
        }
        self
    }

    /// Make every subsequent `save` fail (fault injection for tests).
    pub fn set_failing(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::Relaxed);
    }
}

impl BlobStore for InMemoryBlobStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|e| StorageError::Storage(e.to_string()))?;
        Ok(blobs.get(key).cloned())
    }

    fn save(&self, key: &str, blob: &[u8]) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::Relaxed) {
            return Err(StorageError::Storage("injected save failure".to_string()));
        }
        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| StorageError::Storage(e.to_string()))?;
        blobs.insert(key.to_string(), blob.to_vec());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

// ============================================================================
// Deferred (fire-and-forget)
// ============================================================================

enum WriteOp {
    Save { key: String, blob: Vec<u8> },
    Flush(oneshot::Sender<()>),
}

/// Hands saves to a background tokio task.
///
/// `save` only enqueues; queued writes to the same key are coalesced so the
/// latest blob wins. Failures are logged by the writer. Loads read through to
/// the wrapped store.
///
/// Must be constructed inside a tokio runtime.
pub struct DeferredBlobStore {
    inner: Arc<dyn BlobStore>,
    tx: mpsc::UnboundedSender<WriteOp>,
}

impl DeferredBlobStore {
    pub fn spawn(inner: Arc<dyn BlobStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(Arc::clone(&inner), rx));
        Self { inner, tx }
    }

    /// Wait until every save enqueued before this call has been written.
    pub async fn flush(&self) -> Result<(), StorageError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(WriteOp::Flush(done_tx))
            .map_err(|_| StorageError::ChannelClosed)?;
        done_rx.await.map_err(|_| StorageError::ChannelClosed)
    }
}

impl BlobStore for DeferredBlobStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.load(key)
    }

    fn save(&self, key: &str, blob: &[u8]) -> Result<(), StorageError> {
        self.tx
            .send(WriteOp::Save {
                key: key.to_string(),
                blob: blob.to_vec(),
            })
            .map_err(|_| StorageError::ChannelClosed)
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

async fn run_writer(inner: Arc<dyn BlobStore>, mut rx: mpsc::UnboundedReceiver<WriteOp>) {
    while let Some(first) = rx.recv().await {
        let mut pending: HashMap<String, Vec<u8>> = HashMap::new();
        let mut waiters = Vec::new();

        let mut next = Some(first);
        while let Some(op) = next {
            match op {
                WriteOp::Save { key, blob } => {
                    pending.insert(key, blob);
                }
                WriteOp::Flush(done) => waiters.push(done),
            }
            next = rx.try_recv().ok();
        }

        for (key, blob) in pending {
            if let Err(e) = inner.save(&key, &blob) {
                tracing::warn!(
                    backend = inner.backend_name(),
                    key = %key,
                    error = %e,
                    "Deferred save failed"
                );
            }
        }
        for done in waiters {
            let _ = done.send(());
        }
    }
    tracing::debug!("Deferred blob writer stopped");
}
