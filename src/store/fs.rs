//! Directory-backed store implementations for CLI and local use.
//!
//! Layout under the chosen root:
//!
//! ```text
//! <root>/objects/<uuid>-<file_name>   uploaded blobs
//! <root>/kv/<sanitised key>.json      serialised Job Records
//! ```
//!
//! Every write goes through a temp file in the destination directory
//! followed by a rename, so a crash mid-write leaves either the old value
//! or none — matching the per-key atomicity the pipeline expects.

use super::{KeyValueStore, ObjectStore, StoreError, StoredObject};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Blob store rooted at `<root>/objects/`.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn upload(&self, bytes: &[u8], file_name: &str) -> Result<StoredObject, StoreError> {
        let dir = self.objects_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        // uuid prefix keeps repeated uploads of the same file name distinct
        let name = format!("{}-{}", Uuid::new_v4(), sanitize(file_name));
        let dest = dir.join(&name);
        write_atomic(&dest, bytes).await?;

        debug!("stored {} bytes at {}", bytes.len(), dest.display());
        Ok(StoredObject {
            path: format!("objects/{name}"),
        })
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let full = self.root.join(path);
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.to_string()))
            }
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }
}

/// Key-value store rooted at `<root>/kv/`.
pub struct FsKeyValueStore {
    root: PathBuf,
}

impl FsKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join("kv").join(format!("{}.json", sanitize(key)))
    }
}

#[async_trait]
impl KeyValueStore for FsKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.key_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        write_atomic(&path, value.as_bytes()).await
    }
}

/// Replace characters that are path separators or unsafe in file names.
///
/// Record keys contain `:` (`resume:<id>`), which is not portable as a
/// file-name character.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

/// Atomic write: temp file in the same directory, then rename.
async fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = dest.with_extension("tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    tokio::fs::rename(&tmp, dest)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn object_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        let stored = store.upload(b"pdf bytes", "resume.pdf").await.unwrap();
        assert!(stored.path.starts_with("objects/"));
        assert!(stored.path.ends_with("-resume.pdf"));

        let back = store.read(&stored.path).await.unwrap();
        assert_eq!(back, b"pdf bytes");
    }

    #[tokio::test]
    async fn repeated_uploads_of_same_name_get_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        let a = store.upload(b"a", "resume.pdf").await.unwrap();
        let b = store.upload(b"b", "resume.pdf").await.unwrap();
        assert_ne!(a.path, b.path);
    }

    #[tokio::test]
    async fn read_of_missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let err = store.read("objects/nope.png").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn kv_get_absent_is_none_and_set_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FsKeyValueStore::new(dir.path());

        assert_eq!(kv.get("resume:1").await.unwrap(), None);

        kv.set("resume:1", "{\"pending\":true}").await.unwrap();
        assert_eq!(
            kv.get("resume:1").await.unwrap().as_deref(),
            Some("{\"pending\":true}")
        );

        kv.set("resume:1", "{\"pending\":false}").await.unwrap();
        assert_eq!(
            kv.get("resume:1").await.unwrap().as_deref(),
            Some("{\"pending\":false}")
        );
    }

    #[test]
    fn sanitize_replaces_separator_chars() {
        assert_eq!(sanitize("resume:abc/def"), "resume_abc_def");
        assert_eq!(sanitize("plain-name.json"), "plain-name.json");
    }
}
