//! Result persistence
//!
//! The ledger serializes itself as one JSON blob into a [`BlobStore`]. The
//! production backend is a named sled tree guarded by a [`ProcessLock`].

mod blob;
mod export;
mod ledger;
pub mod lockfile;

pub use blob::{BlobStore, DeferredBlobStore, InMemoryBlobStore, SledBlobStore, StorageError};
pub use export::{export_file_name, sanitize_note, to_csv, to_json, ExportFormat, CSV_HEADER};
pub use ledger::ResultLedger;
pub use lockfile::ProcessLock;
