//! Persistence adapter behavior across backends.

use chrono::Utc;
use objdb_backend::{DocumentBackend, InMemoryBackend};
use objdb_core::{
    default_collection_name, partitioned, AdapterConfig, Configuration, CoreError, DatabaseError,
    EntityType, FetchOptions, PersistenceAdapter, Registry, StorageOptions, Value, ValueType,
};
use objdb_testkit::prelude::*;
use std::sync::Arc;

#[test]
fn json_dir_survives_a_new_adapter() {
    init_tracing();
    let library = Library::new();
    let store = TestStore::json_dir(&library.registry);
    let mut author = library.author("Octavia");
    store.adapter.save(&mut author).unwrap();
    let mut book = library.book("Kindred", 264);
    book.set("author", author.clone()).unwrap();
    book.set("tags", vec!["time", "history"]).unwrap();
    store.adapter.save(&mut book).unwrap();

    let reopened = PersistenceAdapter::new(Arc::clone(&library.registry), Arc::clone(&store.backend));
    let stored = reopened.fetch(&library.book, &FetchOptions::new()).unwrap();
    assert_eq!(stored, vec![book.clone()]);
    assert_eq!(stored[0].values(), book.values());
}

#[test]
fn custom_key_field_is_used_on_the_wire() {
    let library = Library::new();
    let backend = Arc::new(InMemoryBackend::new());
    let store = TestStore::over(
        &library.registry,
        backend.clone(),
        AdapterConfig::new().primary_key_field("_id"),
    );
    let mut author = library.author("Ted");
    store.adapter.save(&mut author).unwrap();

    let stored = backend.documents("authors");
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].1.contains_key("_id"));
    assert_eq!(stored[0].1["__type__"], "Author");

    let authors = store.manager(&library.author);
    assert!(authors.exists_pkey(author.pkey().unwrap()).unwrap());
    assert_eq!(authors.get([("pkey", author.pkey().unwrap())]).unwrap(), author);
}

#[test]
fn fetch_failures_are_wrapped() {
    let library = Library::new();
    let backend = Arc::new(FaultyBackend::new());
    backend.fail(Operation::Fetch);
    let store = TestStore::over(&library.registry, backend, AdapterConfig::default());

    let err = store.manager(&library.book).all().unwrap_err();
    match &err {
        CoreError::Database(DatabaseError::Fetch { collection, .. }) => assert_eq!(collection, "books"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn flush_reports_delete_failures_after_all_complete() {
    let library = Library::new();
    let backend = Arc::new(FaultyBackend::new());
    let store = TestStore::over(&library.registry, backend.clone(), AdapterConfig::default().default_limit(2));
    let books = store.manager(&library.book);
    scenarios::populated_books(&library, &store, 4);
    assert_eq!(books.count().unwrap(), 2);

    backend.fail(Operation::Delete);
    let err = books.flush().await.unwrap_err();
    assert!(matches!(err, CoreError::Database(DatabaseError::Delete { .. })));
    assert_eq!(backend.calls(Operation::Delete), 4);

    backend.heal();
    assert_eq!(books.flush().await.unwrap(), 4);
    assert!(backend.inner().is_empty());
}

#[tokio::test]
async fn delete_all_needs_an_attached_adapter() {
    let library = Library::new();
    let store = TestStore::memory(&library.registry);
    let books = store.manager(&library.book);
    let saved = scenarios::populated_books(&library, &store, 3);

    let collection = books.all().unwrap();
    assert!(collection.is_detached());
    assert!(matches!(
        collection.delete_all().await.unwrap_err(),
        CoreError::Database(DatabaseError::NoBackend { .. })
    ));

    books.collection().delete_all().await.unwrap();
    assert_eq!(books.count().unwrap(), 0);
    let err = books.delete(&saved[0]).unwrap_err();
    assert!(matches!(err, CoreError::Database(DatabaseError::Delete { source: None, .. })));
}

#[test]
fn daily_partitions_use_todays_date() {
    let registry = Arc::new(Registry::new());
    let event = registry
        .register(
            EntityType::persistent("AuditEvent").config(
                Configuration::persistent()
                    .with_attribute("kind", [ValueType::Text])
                    .with_storage(StorageOptions::new().daily_partition(true)),
            ),
        )
        .unwrap();
    let backend = Arc::new(InMemoryBackend::new());
    let adapter = PersistenceAdapter::new(registry, backend.clone());

    let expected = partitioned(&default_collection_name("AuditEvent"), Utc::now().date_naive());
    assert!(expected.starts_with("audit_events_for_"));
    assert_eq!(adapter.collection_name(&event), expected);

    adapter.save(&mut event.create([("kind", "login")]).unwrap()).unwrap();
    assert_eq!(backend.collection_names(), [expected]);
}

#[test]
fn stored_values_are_coerced_to_declared_types() {
    let library = Library::new();
    let backend = Arc::new(InMemoryBackend::new());
    let store = TestStore::over(&library.registry, backend.clone(), AdapterConfig::default());
    let document = serde_json::json!({
        "title": "Legacy",
        "pages": "120",
        "genre": "science",
        "updated_at": "2024-01-02T03:04:05Z",
        "tags": ["a", 1],
        "__type__": "Book"
    });
    backend
        .insert("books", document.as_object().cloned().unwrap())
        .unwrap();

    let book = store.manager(&library.book).get([("title", "Legacy")]).unwrap();
    assert_eq!(book.get("pages"), Some(&Value::Int(120)));
    assert_eq!(
        book.get("updated_at").map(ToString::to_string).as_deref(),
        Some("2024-01-02T03:04:05Z")
    );
    assert_eq!(book.get("tags"), Some(&Value::List(vec!["a".into(), 1.into()])));
}
