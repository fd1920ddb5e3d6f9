//! Flat-file persistence: every collection is one pretty-printed JSON document.
//!
//! [`FlatFileStore`] owns the load/save policy (missing, blank and corrupt documents) and
//! delegates raw byte I/O to a [`Backend`], so the same policy runs against the data
//! directory in production and against memory in tests.

use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::error::{DbError, Result};

/// Raw document I/O. Names are collection names such as `"games"`.
pub trait Backend: Send + Sync {
    /// Read a document. `Ok(None)` when it does not exist.
    fn read(&self, name: &'static str) -> BoxFuture<'static, io::Result<Option<Vec<u8>>>>;
    /// Replace a document with `contents`.
    fn write(&self, name: &'static str, contents: Vec<u8>) -> BoxFuture<'static, io::Result<()>>;
    /// Move a document aside so it can be inspected later. Returns where it went.
    fn quarantine(&self, name: &'static str) -> BoxFuture<'static, io::Result<String>>;
}

/// Documents stored as `<dir>/<name>.json`.
#[derive(Clone)]
pub struct DiskBackend {
    dir: Arc<PathBuf>,
}

impl DiskBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Arc::new(dir.into()),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl Backend for DiskBackend {
    fn read(&self, name: &'static str) -> BoxFuture<'static, io::Result<Option<Vec<u8>>>> {
        let path = self.path(name);
        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(contents) => Ok(Some(contents)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err),
            }
        })
    }

    fn write(&self, name: &'static str, contents: Vec<u8>) -> BoxFuture<'static, io::Result<()>> {
        let dir = self.dir.clone();
        let path = self.path(name);
        let staging = dir.join(format!("{name}.json.tmp"));
        Box::pin(async move {
            tokio::fs::create_dir_all(dir.as_path()).await?;

            // Write the full document next to the target, then swap it in with a rename.
            let mut file = tokio::fs::File::create(&staging).await?;
            file.write_all(&contents).await?;
            file.sync_all().await?;
            drop(file);

            tokio::fs::rename(&staging, &path).await
        })
    }

    fn quarantine(&self, name: &'static str) -> BoxFuture<'static, io::Result<String>> {
        let path = self.path(name);
        let target = self
            .dir
            .join(format!("{name}.json.corrupt-{}", unix_seconds()));
        Box::pin(async move {
            tokio::fs::rename(&path, &target).await?;
            Ok(target.display().to_string())
        })
    }
}

/// Documents kept in process memory. Cloning shares the same documents.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    documents: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes of a document, if present.
    pub fn document(&self, name: &str) -> Option<Vec<u8>> {
        self.documents.get(name).map(|doc| doc.value().clone())
    }

    /// Names of every stored document, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.documents.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl Backend for MemoryBackend {
    fn read(&self, name: &'static str) -> BoxFuture<'static, io::Result<Option<Vec<u8>>>> {
        let document = self.document(name);
        Box::pin(async move { Ok(document) })
    }

    fn write(&self, name: &'static str, contents: Vec<u8>) -> BoxFuture<'static, io::Result<()>> {
        self.documents.insert(name.to_string(), contents);
        Box::pin(async { Ok(()) })
    }

    fn quarantine(&self, name: &'static str) -> BoxFuture<'static, io::Result<String>> {
        let result = match self.documents.remove(name) {
            Some((_, contents)) => {
                let target = format!("{name}.corrupt");
                self.documents.insert(target.clone(), contents);
                Ok(target)
            }
            None => Err(io::Error::from(ErrorKind::NotFound)),
        };
        Box::pin(async move { result })
    }
}

/// Load/save policy for whole-collection documents.
#[derive(Clone)]
pub struct FlatFileStore {
    backend: Arc<dyn Backend>,
}

impl FlatFileStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Load a document.
    ///
    /// - missing: an empty document is written and returned
    /// - empty or whitespace only: empty is returned, nothing is written
    /// - unparseable: the document is quarantined, replaced by an empty one, and empty is
    ///   returned
    ///
    /// Read failures other than "not found" are returned and nothing is overwritten.
    pub async fn load<T>(&self, name: &'static str) -> Result<T>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        let Some(bytes) = self
            .backend
            .read(name)
            .await
            .map_err(|source| DbError::io(name, source))?
        else {
            info!(document = name, "document missing; creating an empty one");
            let empty = T::default();
            self.save(name, &empty).await?;
            return Ok(empty);
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }

        match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(document = name, error = %err, "document is corrupt; resetting to empty");
                match self.backend.quarantine(name).await {
                    Ok(copy) => warn!(document = name, %copy, "corrupt document preserved"),
                    Err(err) => {
                        error!(document = name, error = %err, "failed to preserve corrupt document")
                    }
                }
                let empty = T::default();
                self.save(name, &empty).await?;
                Ok(empty)
            }
        }
    }

    /// Serialize and replace a whole document.
    pub async fn save<T>(&self, name: &'static str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| DbError::Serialize {
            document: name,
            source,
        })?;
        bytes.push(b'\n');

        let len = bytes.len();
        self.backend
            .write(name, bytes)
            .await
            .map_err(|source| DbError::io(name, source))?;

        debug!(document = name, bytes = len, "saved document");
        Ok(())
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        id: u64,
        name: String,
    }

    fn memory_store() -> (MemoryBackend, FlatFileStore) {
        let backend = MemoryBackend::new();
        let store = FlatFileStore::new(Arc::new(backend.clone()));
        (backend, store)
    }

    #[tokio::test]
    async fn test_missing_document_is_created_empty() {
        let (backend, store) = memory_store();

        let entries: Vec<Entry> = store.load("entries").await.unwrap();

        assert!(entries.is_empty());
        assert_eq!(backend.document("entries").unwrap(), b"[]\n");
    }

    #[tokio::test]
    async fn test_blank_document_is_empty_and_untouched() {
        let (backend, store) = memory_store();
        backend.write("entries", b"  \n\t ".to_vec()).await.unwrap();

        let entries: Vec<Entry> = store.load("entries").await.unwrap();

        assert!(entries.is_empty());
        assert_eq!(backend.document("entries").unwrap(), b"  \n\t ");
    }

    #[tokio::test]
    async fn test_zero_length_document_is_empty() {
        let (backend, store) = memory_store();
        backend.write("entries", Vec::new()).await.unwrap();

        let entries: Vec<Entry> = store.load("entries").await.unwrap();

        assert!(entries.is_empty());
        assert_eq!(backend.document("entries").unwrap(), b"");
    }

    #[tokio::test]
    async fn test_corrupt_document_is_quarantined_and_reset() {
        let (backend, store) = memory_store();
        backend
            .write("entries", b"{ not json at all".to_vec())
            .await
            .unwrap();

        let entries: Vec<Entry> = store.load("entries").await.unwrap();

        assert!(entries.is_empty());
        assert_eq!(backend.document("entries").unwrap(), b"[]\n");
        assert_eq!(
            backend.document("entries.corrupt").unwrap(),
            b"{ not json at all"
        );

        // The reset document loads cleanly afterwards.
        let again: Vec<Entry> = store.load("entries").await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_shape_counts_as_corrupt() {
        let (backend, store) = memory_store();
        backend
            .write("entries", br#"{"id": 1}"#.to_vec())
            .await
            .unwrap();

        let entries: Vec<Entry> = store.load("entries").await.unwrap();

        assert!(entries.is_empty());
        assert_eq!(backend.document("entries").unwrap(), b"[]\n");
    }

    #[tokio::test]
    async fn test_save_keeps_non_ascii_and_indents() {
        let (backend, store) = memory_store();
        let entries = vec![Entry {
            id: 1,
            name: "Головоломки".to_string(),
        }];

        store.save("entries", &entries).await.unwrap();

        let text = String::from_utf8(backend.document("entries").unwrap()).unwrap();
        assert!(text.contains("Головоломки"));
        assert!(text.contains("\n  {"));
        let loaded: Vec<Entry> = store.load("entries").await.unwrap();
        assert_eq!(loaded, entries);
    }

    #[tokio::test]
    async fn test_disk_backend_round_trip_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let store = FlatFileStore::new(Arc::new(DiskBackend::new(&data_dir)));
        let entries = vec![Entry {
            id: 7,
            name: "snake".to_string(),
        }];

        store.save("entries", &entries).await.unwrap();

        assert!(data_dir.join("entries.json").exists());
        assert!(!data_dir.join("entries.json.tmp").exists());
        let loaded: Vec<Entry> = store.load("entries").await.unwrap();
        assert_eq!(loaded, entries);
    }

    #[tokio::test]
    async fn test_disk_backend_quarantines_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("entries.json"), [0xff, 0xfe, 0x00]).unwrap();
        let store = FlatFileStore::new(Arc::new(DiskBackend::new(dir.path())));

        let entries: Vec<Entry> = store.load("entries").await.unwrap();

        assert!(entries.is_empty());
        let reset = std::fs::read_to_string(dir.path().join("entries.json")).unwrap();
        assert_eq!(reset.trim(), "[]");
        let quarantined = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("entries.json.corrupt-")
            });
        assert!(quarantined);
    }

    #[tokio::test]
    async fn test_disk_backend_creates_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(Arc::new(DiskBackend::new(dir.path())));

        let entries: Vec<Entry> = store.load("entries").await.unwrap();

        assert!(entries.is_empty());
        let created = std::fs::read_to_string(dir.path().join("entries.json")).unwrap();
        assert_eq!(created.trim(), "[]");
    }
}
