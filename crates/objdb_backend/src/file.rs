//! JSON directory backend for persistent storage.

use crate::backend::{matches_filters, Document, DocumentBackend, FetchRequest};
use crate::error::{BackendError, BackendResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    key: String,
    document: Document,
}

/// A backend storing each collection as `<dir>/<collection>.json`.
///
/// A collection file holds a JSON array of `{"key": .., "document": ..}`
/// records in insertion order. Collections must be created explicitly,
/// like on a remote store.
///
/// # Durability
///
/// Every write rewrites the collection through a temporary file followed by
/// a rename, so a crash leaves either the old or the new contents.
///
/// # Thread Safety
///
/// A single lock serializes read-modify-write cycles across collections.
///
/// # Example
///
/// ```no_run
/// use objdb_backend::{DocumentBackend, JsonDirBackend};
/// use std::path::Path;
///
/// let backend = JsonDirBackend::open(Path::new("data")).unwrap();
/// backend.create_collection("books").unwrap();
/// ```
#[derive(Debug)]
pub struct JsonDirBackend {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonDirBackend {
    /// Opens a backend rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: &Path) -> BackendResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn collection_path(&self, collection: &str) -> BackendResult<PathBuf> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(BackendError::InvalidCollectionName {
                name: collection.to_string(),
            });
        }
        Ok(self.dir.join(format!("{collection}.json")))
    }

    fn load(&self, collection: &str) -> BackendResult<Vec<StoredDocument>> {
        let path = self.collection_path(collection)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(BackendError::collection_not_found(collection))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn store(&self, collection: &str, records: &[StoredDocument]) -> BackendResult<()> {
        let path = self.collection_path(collection)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer(&mut file, records)?;
            file.flush()?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn modify<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Vec<StoredDocument>) -> T,
    ) -> BackendResult<T> {
        let _guard = self.lock.lock();
        let mut records = self.load(collection)?;
        let result = f(&mut records);
        self.store(collection, &records)?;
        Ok(result)
    }
}

impl DocumentBackend for JsonDirBackend {
    fn name(&self) -> &str {
        "json-dir"
    }

    fn fetch(&self, collection: &str, request: &FetchRequest) -> BackendResult<Vec<Document>> {
        let records = {
            let _guard = self.lock.lock();
            self.load(collection)?
        };
        let matching = records
            .into_iter()
            .filter(|record| matches_filters(request, &record.key, &record.document))
            .map(|record| {
                let mut document = record.document;
                document.insert(request.key_field.clone(), record.key.into());
                document
            });
        Ok(request.paginate(matching))
    }

    fn insert(&self, collection: &str, document: Document) -> BackendResult<String> {
        let key = Uuid::new_v4().to_string();
        self.modify(collection, |records| {
            records.push(StoredDocument {
                key: key.clone(),
                document,
            });
        })?;
        Ok(key)
    }

    fn update(&self, collection: &str, pkey: &str, document: Document) -> BackendResult<bool> {
        self.modify(collection, |records| {
            match records.iter_mut().find(|record| record.key == pkey) {
                Some(record) => {
                    record.document = document;
                    true
                }
                None => false,
            }
        })
    }

    fn delete(&self, collection: &str, pkey: &str) -> BackendResult<bool> {
        self.modify(collection, |records| {
            let before = records.len();
            records.retain(|record| record.key != pkey);
            records.len() != before
        })
    }

    fn create_collection(&self, collection: &str) -> BackendResult<bool> {
        let _guard = self.lock.lock();
        if self.collection_path(collection)?.exists() {
            return Ok(false);
        }
        tracing::debug!(collection, dir = %self.dir.display(), "creating collection file");
        self.store(collection, &[])?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn file_create_collection() {
        let dir = tempdir().unwrap();
        let backend = JsonDirBackend::open(dir.path()).unwrap();

        assert!(backend.create_collection("books").unwrap());
        assert!(!backend.create_collection("books").unwrap());
        assert!(dir.path().join("books.json").exists());
    }

    #[test]
    fn file_missing_collection_is_reported() {
        let dir = tempdir().unwrap();
        let backend = JsonDirBackend::open(dir.path()).unwrap();

        let err = backend.fetch("books", &FetchRequest::new()).unwrap_err();
        assert!(err.is_collection_not_found());
        let err = backend.insert("books", Document::new()).unwrap_err();
        assert!(err.is_collection_not_found());
    }

    #[test]
    fn file_rejects_path_like_names() {
        let dir = tempdir().unwrap();
        let backend = JsonDirBackend::open(dir.path()).unwrap();

        let err = backend.create_collection("../escape").unwrap_err();
        assert!(matches!(err, BackendError::InvalidCollectionName { .. }));
    }

    #[test]
    fn file_insert_update_delete() {
        let dir = tempdir().unwrap();
        let backend = JsonDirBackend::open(dir.path()).unwrap();
        backend.create_collection("books").unwrap();

        let key = backend
            .insert("books", doc(json!({"title": "Dune"})))
            .unwrap();
        assert!(backend
            .update("books", &key, doc(json!({"title": "Emma"})))
            .unwrap());

        let found = backend.fetch("books", &FetchRequest::new()).unwrap();
        assert_eq!(found[0]["title"], json!("Emma"));
        assert_eq!(found[0]["pkey"], json!(key));

        assert!(backend.delete("books", &key).unwrap());
        assert!(!backend.delete("books", &key).unwrap());
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let key = {
            let backend = JsonDirBackend::open(dir.path()).unwrap();
            backend.create_collection("books").unwrap();
            backend
                .insert("books", doc(json!({"title": "Dune"})))
                .unwrap()
        };

        let backend = JsonDirBackend::open(dir.path()).unwrap();
        let request = FetchRequest::new().filter("title", json!("Dune"));
        let found = backend.fetch("books", &request).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["pkey"], json!(key));
    }
}
