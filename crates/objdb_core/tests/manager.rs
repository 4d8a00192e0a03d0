//! Manager behavior against the library fixtures.

use objdb_core::{
    Aggregate, CacheError, CachePolicy, CoreError, DatabaseError, Entity, FetchOptions, Signal,
    Value,
};
use objdb_testkit::prelude::*;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn bulk_save_assigns_distinct_keys() {
    init_tracing();
    let library = Library::new();
    let store = TestStore::memory(&library.registry);
    let books = store.manager(&library.book);

    let mut batch: Vec<Entity> = (0..5).map(|i| library.book(&format!("Vol {i}"), 10 + i)).collect();
    books.bulk_save(&mut batch).await.unwrap();

    let keys: HashSet<_> = batch.iter().map(|book| book.pkey().unwrap().to_string()).collect();
    assert_eq!(keys.len(), 5);
    assert_eq!(books.count().unwrap(), 5);
    assert!(batch.iter().all(|book| book.get("updated_at").is_some_and(|v| !v.is_null())));
}

#[tokio::test]
async fn bulk_save_reports_failure_after_all_complete() {
    let library = Library::new();
    let backend = Arc::new(FaultyBackend::new());
    backend.fail_writes_where("title", "Cursed");
    let store = TestStore::over(&library.registry, backend.clone(), Default::default());
    let books = store.manager(&library.book);

    let mut batch = vec![
        library.book("First", 1),
        library.book("Cursed", 2),
        library.book("Third", 3),
    ];
    let err = books.bulk_save(&mut batch).await.unwrap_err();
    match err {
        CoreError::Database(DatabaseError::Insert { source, .. }) => {
            assert!(source.to_string().contains("injected"));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(backend.calls(Operation::Insert), 3);
    assert!(batch[0].saved() && batch[2].saved());
    assert!(!batch[1].saved());
    assert_eq!(books.count().unwrap(), 2);
}

#[tokio::test]
async fn update_rewrites_every_stored_book() {
    let library = Library::new();
    let store = TestStore::memory(&library.registry);
    let books = store.manager(&library.book);
    scenarios::populated_books(&library, &store, 4);

    assert_eq!(books.update([("genre", "history")]).await.unwrap(), 4);
    assert_eq!(books.filter([("genre", "history")]).unwrap().len(), 4);

    let err = books.update([("genre", "poetry")]).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidChoice { .. }));
    assert_eq!(books.exclude([("genre", "history")]).unwrap().len(), 0);
}

#[test]
fn nested_authors_come_back_as_entities() {
    with_library(|library, store| {
        let authors = store.manager(&library.author);
        let books = store.manager(&library.book);

        let ursula = authors.create([("name", "Ursula")], true).unwrap();
        let mut book = library.book("The Dispossessed", 387);
        book.set("author", ursula.clone()).unwrap();
        books.save(&mut book).unwrap();

        let stored = books.get([("author__name", "Ursula")]).unwrap();
        assert_eq!(stored, book);
        let nested = stored.get("author").and_then(Value::as_entity).unwrap();
        assert_eq!(nested, &ursula);
        assert!(Arc::ptr_eq(nested.entity_type(), &library.author));

        let none = books.filter([("author__name__startswith", "Q")]).unwrap();
        assert!(none.is_empty());
    });
}

#[test]
fn get_or_create_is_idempotent() {
    with_library(|library, store| {
        let authors = store.manager(&library.author);
        let (first, created) = authors.get_or_create([("name", "Iain")]).unwrap();
        assert!(created);
        let (second, created) = authors.get_or_create([("name", "Iain")]).unwrap();
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(authors.count().unwrap(), 1);

        authors.create([("name", "Iain")], true).unwrap();
        let err = authors.get_or_create([("name", "Iain")]).unwrap_err();
        assert!(matches!(err, CoreError::MultipleObjectsReturned { count: 2, .. }));
    });
}

#[test]
fn fetch_options_reach_the_backend() {
    with_library(|library, store| {
        let books = store.manager(&library.book);
        scenarios::populated_books(library, store, 6);

        let page = books.fetch(&FetchOptions::new().offset(2).limit(3)).unwrap();
        assert_eq!(page.len(), 3);
        let one = books.fetch(&FetchOptions::new().filter("pages", 103)).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].get("title"), Some(&Value::from("Book 003")));
    });
}

#[test]
fn aggregates_over_stored_books() {
    with_library(|library, store| {
        let books = store.manager(&library.book);
        scenarios::populated_books(library, store, 3);

        let stats = books
            .aggregate(
                Aggregate::new()
                    .count("n")
                    .sum("pages_total", "pages")
                    .avg("pages_avg", "pages")
                    .max("longest", "pages"),
            )
            .unwrap();
        assert_eq!(stats["n"], Value::Int(3));
        assert_eq!(stats["pages_total"], Value::Int(303));
        assert_eq!(stats["pages_avg"], Value::Float(101.0));
        assert_eq!(stats["longest"], Value::Int(102));
    });
}

#[test]
fn save_and_delete_emit_signals() {
    with_library(|library, store| {
        let books = store.manager(&library.book);
        let created = Arc::new(Mutex::new(Vec::new()));
        {
            let created = Arc::clone(&created);
            library.book.signals().connect(Signal::PostSave, move |event| {
                if let objdb_core::SignalEvent::PostSave { created: flag, .. } = event {
                    created.lock().push(*flag);
                }
            });
        }

        let mut book = library.book("Signals", 5);
        books.save(&mut book).unwrap();
        books.save(&mut book).unwrap();
        books.delete(&book).unwrap();
        assert_eq!(*created.lock(), [true, false]);
        assert!(!books.exists_pkey(book.pkey().unwrap()).unwrap());
    });
}

#[test]
fn in_memory_types_query_their_cache() {
    let library = Library::with_person_cache(CachePolicy::new().max_size(3));
    let store = TestStore::memory(&library.registry);
    let people = store.manager(&library.person);

    for (name, age) in [("Ada", 36), ("Bo", 20), ("Cy", 25)] {
        library.person(name, age);
    }
    assert_eq!(people.count().unwrap(), 3);
    assert_eq!(people.filter([("age__lt", 30)]).unwrap().len(), 2);
    assert_eq!(
        people.first().unwrap().unwrap().get("name"),
        Some(&Value::from("Ada"))
    );

    let err = library.person.create([("name", "Dee")]).unwrap_err();
    assert_eq!(err.to_string(), "Cache is full");
}

#[tokio::test]
async fn in_memory_update_writes_back_to_the_cache() {
    let library = Library::new();
    let store = TestStore::memory(&library.registry);
    let people = store.manager(&library.person);
    library.person("Ada", 36);
    library.person("Bo", 20);

    assert_eq!(people.update([("age", 50)]).await.unwrap(), 2);
    assert_eq!(people.filter([("age", 50)]).unwrap().len(), 2);

    let mut ada = people.get([("name", "Ada")]).unwrap();
    let err = store.adapter.save(&mut ada).unwrap_err();
    assert!(matches!(err, CoreError::Database(DatabaseError::NotPersistent { .. })));
}

#[test]
fn saving_an_in_memory_entity_refreshes_its_cached_record() {
    let library = Library::new();
    let store = TestStore::memory(&library.registry);
    let people = store.manager(&library.person);
    let mut ada = library.person("Ada", 30);
    library.person("Bo", 20);

    ada.set("age", 99).unwrap();
    assert!(!people.save(&mut ada).unwrap());
    assert_eq!(people.filter([("age", 99)]).unwrap().len(), 1);
    assert_eq!(people.get([("name", "Ada")]).unwrap().get("age"), Some(&Value::Int(99)));

    library.person.cache().unwrap().lock().remove(&ada).unwrap();
    let err = people.save(&mut ada).unwrap_err();
    assert!(matches!(err, CoreError::Cache(CacheError::NotFound { .. })));
}

#[test]
fn cache_clears_when_configured() {
    let library = Library::with_person_cache(CachePolicy::new().max_size(2).clear_when_full(true));
    let store = TestStore::memory(&library.registry);
    let people = store.manager(&library.person);

    library.person("Ada", 1);
    library.person("Bo", 2);
    let third = library.person("Cy", 3);
    let remaining = people.all().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0], third);
}
