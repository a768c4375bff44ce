//! Storage collaborator seams: object store and key-value store.
//!
//! The pipeline never talks to a concrete backend; it drives these two
//! narrow traits and nothing else. Each key-value write is expected to be
//! all-or-nothing (per-key atomicity), but no cross-key transaction is ever
//! required — the pipeline's two writes go to the same key.
//!
//! Two implementations ship with the crate: a directory-backed pair in
//! [`fs`] for CLI and local use, and a HashMap-backed pair in [`memory`]
//! for tests and embedding.

use async_trait::async_trait;
use thiserror::Error;

pub mod fs;
pub mod memory;

/// A failed storage operation, with a human-readable cause.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or could not complete the operation.
    #[error("storage operation failed: {0}")]
    Backend(String),

    /// No object exists at the requested path.
    #[error("object not found: {0}")]
    NotFound(String),
}

/// Locator returned by a successful upload.
///
/// Paths are opaque strings scoped to the store that issued them; the
/// pipeline persists them verbatim and never interprets their shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
}

/// Blob storage for uploaded documents and raster images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under a fresh path derived from `file_name`.
    async fn upload(&self, bytes: &[u8], file_name: &str) -> Result<StoredObject, StoreError>;

    /// Read back the bytes at a previously issued path.
    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError>;
}

/// String key-value storage for serialised Job Records.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value at `key`, or `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any existing value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
