//! Document backend trait definition.

use crate::error::BackendResult;

/// A stored document: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Field name under which fetched documents carry their primary key unless
/// a request says otherwise.
pub const DEFAULT_KEY_FIELD: &str = "pkey";

/// Parameters of a [`DocumentBackend::fetch`] call.
///
/// Filters are equality matches on top-level document fields.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Field/value pairs every returned document must match.
    pub filters: Document,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of matching documents to skip.
    pub offset: Option<usize>,
    /// Field the primary key is written to in returned documents.
    pub key_field: String,
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self {
            filters: Document::new(),
            limit: None,
            offset: None,
            key_field: DEFAULT_KEY_FIELD.to_string(),
        }
    }
}

impl FetchRequest {
    /// Creates an unfiltered, unbounded request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality filter.
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.filters.insert(field.into(), value);
        self
    }

    /// Sets the maximum number of documents.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip.
    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the primary-key field of returned documents.
    #[must_use]
    pub fn key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = field.into();
        self
    }

    /// Applies offset then limit to an already filtered sequence.
    pub fn paginate<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let skipped = items.into_iter().skip(self.offset.unwrap_or(0));
        match self.limit {
            Some(limit) => skipped.take(limit).collect(),
            None => skipped.collect(),
        }
    }
}

/// Returns `true` if `document` matches every filter of `request`.
///
/// A filter on the request's key field is compared against `pkey`.
#[must_use]
pub fn matches_filters(request: &FetchRequest, pkey: &str, document: &Document) -> bool {
    request.filters.iter().all(|(field, expected)| {
        if *field == request.key_field {
            expected.as_str() == Some(pkey)
        } else {
            document.get(field) == Some(expected)
        }
    })
}

/// A document store that objdb persists entities into.
///
/// Implementations are **synchronous**; callers that need concurrency run
/// calls on blocking worker threads.
///
/// # Invariants
///
/// - `insert` returns a key that is unique within the collection
/// - `fetch` returns documents with their key under `request.key_field`
/// - Operations on a collection that does not exist fail with
///   [`crate::BackendError::CollectionNotFound`], unless the backend creates
///   collections implicitly
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::JsonDirBackend`] - For persistent storage
pub trait DocumentBackend: Send + Sync {
    /// Returns a short name for logging.
    fn name(&self) -> &str;

    /// Fetches the documents of `collection` matching `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or the backend
    /// fails.
    fn fetch(&self, collection: &str, request: &FetchRequest) -> BackendResult<Vec<Document>>;

    /// Stores a new document and returns its generated primary key.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or the backend
    /// rejects the document.
    fn insert(&self, collection: &str, document: Document) -> BackendResult<String>;

    /// Replaces the document stored under `pkey`.
    ///
    /// Returns `false` if no document has that key.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or the backend
    /// fails.
    fn update(&self, collection: &str, pkey: &str, document: Document) -> BackendResult<bool>;

    /// Deletes the document stored under `pkey`.
    ///
    /// Returns `false` if no document has that key.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or the backend
    /// fails.
    fn delete(&self, collection: &str, pkey: &str) -> BackendResult<bool>;

    /// Creates an empty collection.
    ///
    /// Returns `false` if it already existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be created.
    fn create_collection(&self, collection: &str) -> BackendResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn request_builder_sets_fields() {
        let request = FetchRequest::new()
            .filter("status", json!("open"))
            .limit(10)
            .offset(5)
            .key_field("_id");

        assert_eq!(request.filters["status"], json!("open"));
        assert_eq!(request.limit, Some(10));
        assert_eq!(request.offset, Some(5));
        assert_eq!(request.key_field, "_id");
    }

    #[test]
    fn paginate_applies_offset_then_limit() {
        let request = FetchRequest::new().offset(1).limit(2);
        assert_eq!(request.paginate(0..10), vec![1, 2]);
        assert_eq!(FetchRequest::new().paginate(0..3), vec![0, 1, 2]);
    }

    #[test]
    fn filters_compare_fields_and_key() {
        let document = doc(json!({"status": "open", "n": 3}));
        let by_field = FetchRequest::new().filter("n", json!(3));
        let by_key = FetchRequest::new().filter("pkey", json!("k1"));
        let miss = FetchRequest::new().filter("status", json!("closed"));

        assert!(matches_filters(&by_field, "k1", &document));
        assert!(matches_filters(&by_key, "k1", &document));
        assert!(!matches_filters(&by_key, "k2", &document));
        assert!(!matches_filters(&miss, "k1", &document));
    }
}
