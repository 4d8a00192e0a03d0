//! In-memory document backend for testing.

use crate::backend::{matches_filters, Document, DocumentBackend, FetchRequest};
use crate::error::{BackendError, BackendResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use uuid::Uuid;

type Collection = Vec<(String, Document)>;

/// An in-memory document backend.
///
/// Documents keep their insertion order inside a collection. Keys are
/// random UUIDs.
///
/// By default collections spring into existence on first write. A
/// [`strict`](Self::strict) backend instead reports missing collections,
/// which is how remote stores behave.
///
/// # Example
///
/// ```rust
/// use objdb_backend::{DocumentBackend, FetchRequest, InMemoryBackend};
///
/// let backend = InMemoryBackend::strict();
/// assert!(backend.fetch("books", &FetchRequest::new()).is_err());
/// backend.create_collection("books").unwrap();
/// assert!(backend.fetch("books", &FetchRequest::new()).unwrap().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    collections: RwLock<BTreeMap<String, Collection>>,
    strict: bool,
}

impl InMemoryBackend {
    /// Creates an empty backend that creates collections on demand.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty backend that rejects unknown collections.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Returns the names of all collections.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }

    /// Returns a copy of the documents stored in `collection`, with keys.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<(String, Document)> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of documents in `collection`.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, Vec::len)
    }

    /// Returns `true` if no collection holds a document.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.read().values().all(Vec::is_empty)
    }

    /// Drops every collection.
    pub fn clear(&self) {
        self.collections.write().clear();
    }

    fn with_collection<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Collection) -> T,
    ) -> BackendResult<T> {
        let mut collections = self.collections.write();
        if self.strict && !collections.contains_key(collection) {
            return Err(BackendError::collection_not_found(collection));
        }
        Ok(f(collections.entry(collection.to_string()).or_default()))
    }
}

impl DocumentBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(&self, collection: &str, request: &FetchRequest) -> BackendResult<Vec<Document>> {
        let collections = self.collections.read();
        let Some(stored) = collections.get(collection) else {
            if self.strict {
                return Err(BackendError::collection_not_found(collection));
            }
            return Ok(Vec::new());
        };

        let matching = stored
            .iter()
            .filter(|(pkey, document)| matches_filters(request, pkey, document))
            .map(|(pkey, document)| {
                let mut document = document.clone();
                document.insert(request.key_field.clone(), pkey.clone().into());
                document
            });
        Ok(request.paginate(matching))
    }

    fn insert(&self, collection: &str, document: Document) -> BackendResult<String> {
        let pkey = Uuid::new_v4().to_string();
        self.with_collection(collection, |stored| {
            stored.push((pkey.clone(), document));
        })?;
        Ok(pkey)
    }

    fn update(&self, collection: &str, pkey: &str, document: Document) -> BackendResult<bool> {
        self.with_collection(collection, |stored| {
            match stored.iter_mut().find(|(key, _)| key == pkey) {
                Some(slot) => {
                    slot.1 = document;
                    true
                }
                None => false,
            }
        })
    }

    fn delete(&self, collection: &str, pkey: &str) -> BackendResult<bool> {
        self.with_collection(collection, |stored| {
            let before = stored.len();
            stored.retain(|(key, _)| key != pkey);
            stored.len() != before
        })
    }

    fn create_collection(&self, collection: &str) -> BackendResult<bool> {
        let mut collections = self.collections.write();
        if collections.contains_key(collection) {
            return Ok(false);
        }
        collections.insert(collection.to_string(), Vec::new());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn memory_new_is_empty() {
        let backend = InMemoryBackend::new();
        assert!(backend.is_empty());
        assert!(backend.collection_names().is_empty());
    }

    #[test]
    fn memory_insert_assigns_distinct_keys() {
        let backend = InMemoryBackend::new();
        let a = backend.insert("people", doc(json!({"name": "a"}))).unwrap();
        let b = backend.insert("people", doc(json!({"name": "b"}))).unwrap();

        assert_ne!(a, b);
        assert_eq!(backend.len("people"), 2);
    }

    #[test]
    fn memory_fetch_stamps_key_field() {
        let backend = InMemoryBackend::new();
        let pkey = backend.insert("people", doc(json!({"name": "a"}))).unwrap();

        let found = backend
            .fetch("people", &FetchRequest::new().key_field("_id"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["_id"], json!(pkey));
        assert_eq!(found[0]["name"], json!("a"));
    }

    #[test]
    fn memory_fetch_filters_and_paginates() {
        let backend = InMemoryBackend::new();
        for n in 0..6 {
            let parity = if n % 2 == 0 { "even" } else { "odd" };
            backend
                .insert("numbers", doc(json!({"n": n, "parity": parity})))
                .unwrap();
        }

        let request = FetchRequest::new()
            .filter("parity", json!("even"))
            .offset(1)
            .limit(1);
        let found = backend.fetch("numbers", &request).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["n"], json!(2));
    }

    #[test]
    fn memory_fetch_missing_collection_is_empty_when_lenient() {
        let backend = InMemoryBackend::new();
        assert!(backend.fetch("nothing", &FetchRequest::new()).unwrap().is_empty());
    }

    #[test]
    fn memory_strict_rejects_missing_collection() {
        let backend = InMemoryBackend::strict();
        let err = backend.insert("people", Document::new()).unwrap_err();
        assert!(err.is_collection_not_found());

        assert!(backend.create_collection("people").unwrap());
        assert!(!backend.create_collection("people").unwrap());
        backend.insert("people", Document::new()).unwrap();
    }

    #[test]
    fn memory_update_replaces_document() {
        let backend = InMemoryBackend::new();
        let pkey = backend.insert("people", doc(json!({"name": "a"}))).unwrap();

        assert!(backend
            .update("people", &pkey, doc(json!({"name": "b"})))
            .unwrap());
        assert!(!backend
            .update("people", "missing", doc(json!({"name": "c"})))
            .unwrap());
        assert_eq!(backend.documents("people")[0].1["name"], json!("b"));
    }

    #[test]
    fn memory_delete_removes_document() {
        let backend = InMemoryBackend::new();
        let pkey = backend.insert("people", Document::new()).unwrap();

        assert!(backend.delete("people", &pkey).unwrap());
        assert!(!backend.delete("people", &pkey).unwrap());
        assert_eq!(backend.len("people"), 0);
    }

    #[test]
    fn memory_clear() {
        let backend = InMemoryBackend::new();
        backend.insert("people", Document::new()).unwrap();
        backend.clear();
        assert!(backend.collection_names().is_empty());
    }
}
