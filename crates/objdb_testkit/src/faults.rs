//! Fault injection for backend failure paths.

use objdb_backend::{
    BackendError, BackendResult, Document, DocumentBackend, FetchRequest, InMemoryBackend,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A backend operation a fault can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// [`DocumentBackend::fetch`].
    Fetch,
    /// [`DocumentBackend::insert`].
    Insert,
    /// [`DocumentBackend::update`].
    Update,
    /// [`DocumentBackend::delete`].
    Delete,
}

struct Fault {
    operation: Operation,
    field: Option<(String, serde_json::Value)>,
}

/// Wraps an [`InMemoryBackend`] and fails selected calls with
/// [`BackendError::Unavailable`].
///
/// Every call is counted, including failed ones.
#[derive(Default)]
pub struct FaultyBackend {
    inner: InMemoryBackend,
    faults: Mutex<Vec<Fault>>,
    calls: [AtomicUsize; 4],
}

impl FaultyBackend {
    /// Creates a backend that does not fail yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every call of `operation`.
    pub fn fail(&self, operation: Operation) {
        self.faults.lock().push(Fault {
            operation,
            field: None,
        });
    }

    /// Fails inserts and updates of documents whose `field` equals `value`.
    pub fn fail_writes_where(&self, field: &str, value: impl Into<serde_json::Value>) {
        let value = value.into();
        let mut faults = self.faults.lock();
        for operation in [Operation::Insert, Operation::Update] {
            faults.push(Fault {
                operation,
                field: Some((field.to_string(), value.clone())),
            });
        }
    }

    /// Removes every fault.
    pub fn heal(&self) {
        self.faults.lock().clear();
    }

    /// Returns how many times `operation` was called.
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls[operation as usize].load(Ordering::SeqCst)
    }

    /// Returns the wrapped backend.
    pub fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }

    fn check(&self, operation: Operation, document: Option<&Document>) -> BackendResult<()> {
        self.calls[operation as usize].fetch_add(1, Ordering::SeqCst);
        let failing = self.faults.lock().iter().any(|fault| {
            fault.operation == operation
                && match (&fault.field, document) {
                    (None, _) => true,
                    (Some((field, value)), Some(document)) => document.get(field) == Some(value),
                    (Some(_), None) => false,
                }
        });
        if failing {
            Err(BackendError::unavailable(format!("injected {operation:?} failure")))
        } else {
            Ok(())
        }
    }
}

impl DocumentBackend for FaultyBackend {
    fn name(&self) -> &str {
        "faulty"
    }

    fn fetch(&self, collection: &str, request: &FetchRequest) -> BackendResult<Vec<Document>> {
        self.check(Operation::Fetch, None)?;
        self.inner.fetch(collection, request)
    }

    fn insert(&self, collection: &str, document: Document) -> BackendResult<String> {
        self.check(Operation::Insert, Some(&document))?;
        self.inner.insert(collection, document)
    }

    fn update(&self, collection: &str, pkey: &str, document: Document) -> BackendResult<bool> {
        self.check(Operation::Update, Some(&document))?;
        self.inner.update(collection, pkey, document)
    }

    fn delete(&self, collection: &str, pkey: &str) -> BackendResult<bool> {
        self.check(Operation::Delete, None)?;
        self.inner.delete(collection, pkey)
    }

    fn create_collection(&self, collection: &str) -> BackendResult<bool> {
        self.inner.create_collection(collection)
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
    fn faults_target_matching_documents() {
        let backend = FaultyBackend::new();
        backend.fail_writes_where("title", "bad");
        assert!(backend.insert("books", doc(json!({"title": "bad"}))).is_err());
        let pkey = backend.insert("books", doc(json!({"title": "good"}))).unwrap();
        assert!(backend.update("books", &pkey, doc(json!({"title": "bad"}))).is_err());
        assert_eq!(backend.calls(Operation::Insert), 2);
        assert_eq!(backend.inner().len("books"), 1);
    }

    #[test]
    fn heal_removes_faults() {
        let backend = FaultyBackend::new();
        backend.fail(Operation::Fetch);
        assert!(backend.fetch("books", &FetchRequest::new()).is_err());
        backend.heal();
        assert!(backend.fetch("books", &FetchRequest::new()).unwrap().is_empty());
    }
}
