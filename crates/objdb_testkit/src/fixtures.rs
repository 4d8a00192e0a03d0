//! Test fixtures: a sample schema and backend-backed stores.
//!
//! The library schema has two persistent types, `Author` and `Book` (a
//! book nests its author), and the in-memory type `Person`.

use objdb_backend::{DocumentBackend, InMemoryBackend, JsonDirBackend};
use objdb_core::{
    validators, AdapterConfig, CachePolicy, Configuration, Entity, EntityManager, EntityType,
    PersistenceAdapter, Registry, StorageOptions, Value, ValueType,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Genres a [`Library`] book may have.
pub const GENRES: [&str; 3] = ["fiction", "science", "history"];

/// A registry holding the library schema.
pub struct Library {
    /// The registry all three types live in.
    pub registry: Arc<Registry>,
    /// Persistent `Author { name, born }`.
    pub author: Arc<EntityType>,
    /// Persistent `Book { title, pages, genre, author, tags, updated_at }`.
    pub book: Arc<EntityType>,
    /// In-memory `Person { name, age }`.
    pub person: Arc<EntityType>,
}

impl Library {
    /// Registers the library schema with an unbounded person cache.
    pub fn new() -> Self {
        Self::with_person_cache(CachePolicy::new())
    }

    /// Registers the library schema with the given person cache policy.
    pub fn with_person_cache(policy: CachePolicy) -> Self {
        let registry = Arc::new(Registry::new());
        let author = registry
            .register(
                EntityType::persistent("Author").config(
                    Configuration::persistent()
                        .with_attribute("name", [ValueType::Text])
                        .with_attribute("born", [ValueType::Date, ValueType::Null])
                        .with_required(["name"])
                        .with_validator("name", validators::not_blank())
                        .with_ordering(["name"])
                        .with_storage(StorageOptions::new().auto_create_collection(true)),
                ),
            )
            .expect("Failed to register Author");
        let book = registry
            .register(
                EntityType::persistent("Book").config(
                    Configuration::persistent()
                        .with_attribute("title", [ValueType::Text])
                        .with_attribute("pages", [ValueType::Int, ValueType::Null])
                        .with_attribute("genre", [ValueType::Text])
                        .with_attribute("author", [ValueType::entity("Author"), ValueType::Null])
                        .with_attribute("tags", [ValueType::List])
                        .with_attribute("updated_at", [ValueType::DateTime])
                        .with_required(["title"])
                        .with_choices("genre", GENRES)
                        .with_default("genre", "fiction")
                        .with_default_factory("tags", || Value::List(Vec::new()))
                        .with_validator("title", validators::not_blank())
                        .with_validator("pages", validators::int_between(1, 10_000))
                        .with_ordering(["title"])
                        .with_timestamp_refresh(["updated_at"])
                        .with_storage(StorageOptions::new().auto_create_collection(true)),
                ),
            )
            .expect("Failed to register Book");
        let person = registry
            .register(
                EntityType::in_memory("Person")
                    .config(
                        Configuration::new()
                            .with_attribute("name", [ValueType::Text])
                            .with_attribute("age", [ValueType::Int, ValueType::Null])
                            .with_required(["name"])
                            .with_ordering(["name"]),
                    )
                    .cache_policy(policy),
            )
            .expect("Failed to register Person");

        Self {
            registry,
            author,
            book,
            person,
        }
    }

    /// Builds an unsaved author.
    pub fn author(&self, name: &str) -> Entity {
        self.author
            .create([("name", name)])
            .expect("Failed to build author")
    }

    /// Builds an unsaved book.
    pub fn book(&self, title: &str, pages: i64) -> Entity {
        self.book
            .create([("title", Value::from(title)), ("pages", Value::from(pages))])
            .expect("Failed to build book")
    }

    /// Builds an in-memory person; it enters the person cache.
    pub fn person(&self, name: &str, age: i64) -> Entity {
        self.person
            .create([("name", Value::from(name)), ("age", Value::from(age))])
            .expect("Failed to build person")
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

/// A persistence adapter over a throwaway backend.
pub struct TestStore {
    /// The adapter under test.
    pub adapter: Arc<PersistenceAdapter>,
    /// The backend behind the adapter.
    pub backend: Arc<dyn DocumentBackend>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a store over a lenient in-memory backend.
    pub fn memory(registry: &Arc<Registry>) -> Self {
        Self::over(registry, Arc::new(InMemoryBackend::new()), AdapterConfig::default())
    }

    /// Creates a store over a JSON directory in a temporary directory.
    pub fn json_dir(registry: &Arc<Registry>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let backend =
            JsonDirBackend::open(temp_dir.path()).expect("Failed to open JSON directory backend");
        let mut store = Self::over(registry, Arc::new(backend), AdapterConfig::default());
        store._temp_dir = Some(temp_dir);
        store
    }

    /// Creates a store over any backend.
    pub fn over(
        registry: &Arc<Registry>,
        backend: Arc<dyn DocumentBackend>,
        config: AdapterConfig,
    ) -> Self {
        let adapter = PersistenceAdapter::with_config(Arc::clone(registry), Arc::clone(&backend), config);
        Self {
            adapter: Arc::new(adapter),
            backend,
            _temp_dir: None,
        }
    }

    /// Returns a manager for `entity_type` on this store.
    pub fn manager(&self, entity_type: &Arc<EntityType>) -> EntityManager {
        EntityManager::new(Arc::clone(entity_type), Arc::clone(&self.adapter))
    }
}

/// Runs a test against a fresh library on an in-memory backend.
pub fn with_library<F, R>(f: F) -> R
where
    F: FnOnce(&Library, &TestStore) -> R,
{
    let library = Library::new();
    let store = TestStore::memory(&library.registry);
    f(&library, &store)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Saves `count` books titled `Book 000`, `Book 001`... with
    /// `100 + i` pages and returns them.
    pub fn populated_books(library: &Library, store: &TestStore, count: usize) -> Vec<Entity> {
        (0..count)
            .map(|i| {
                let mut book = library.book(&format!("Book {i:03}"), 100 + i as i64);
                store.adapter.save(&mut book).expect("Failed to save book");
                book
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_registers_three_types() {
        let library = Library::new();
        assert_eq!(library.registry.locators(), ["Author", "Book", "Person"]);
        assert!(library.book.is_persistent());
        assert!(!library.person.is_persistent());
    }

    #[test]
    fn with_library_saves_books() {
        with_library(|library, store| {
            let books = scenarios::populated_books(library, store, 3);
            assert!(books.iter().all(Entity::saved));
            assert_eq!(store.manager(&library.book).count().unwrap(), 3);
        });
    }

    #[test]
    fn json_dir_store_creates_collections_on_demand() {
        let library = Library::new();
        let store = TestStore::json_dir(&library.registry);
        let mut author = library.author("Ursula");
        assert!(store.adapter.save(&mut author).unwrap());
        assert_eq!(store.manager(&library.author).count().unwrap(), 1);
    }
}
