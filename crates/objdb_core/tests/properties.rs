//! Property tests for collections and the wire mapping.

use objdb_core::{EntityCollection, Value};
use objdb_testkit::prelude::*;
use proptest::prelude::*;

fn people(library: &Library, rows: &[(String, i64)]) -> EntityCollection {
    let mut collection = EntityCollection::new(library.person.clone());
    for (name, age) in rows {
        collection.push(library.person(name, *age)).unwrap();
    }
    collection
}

fn ages(collection: &EntityCollection) -> Vec<i64> {
    collection
        .iter()
        .map(|entity| entity.get("age").and_then(Value::as_int).unwrap())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn filter_and_exclude_partition(
        rows in people_strategy(20),
        operator in int_operator_strategy(),
        bound in age_strategy(),
    ) {
        let library = Library::new();
        let all = people(&library, &rows);
        let key = format!("age__{operator}");
        let kept = all.filter([(key.as_str(), bound)]).unwrap();
        let dropped = all.exclude([(key.as_str(), bound)]).unwrap();

        prop_assert_eq!(kept.len() + dropped.len(), all.len());
        prop_assert!(kept.intersect(&dropped).unwrap().is_empty());
        prop_assert_eq!(kept.union(&dropped).unwrap().len(), all.distinct().len());
    }

    #[test]
    fn order_by_sorts_and_is_stable(rows in people_strategy(20)) {
        let library = Library::new();
        let all = people(&library, &rows);

        let ascending = ages(&all.order_by(["age"]).unwrap());
        let mut expected: Vec<i64> = rows.iter().map(|(_, age)| *age).collect();
        expected.sort_unstable();
        prop_assert_eq!(&ascending, &expected);

        let descending = ages(&all.order_by(["-age"]).unwrap());
        expected.reverse();
        prop_assert_eq!(descending, expected);

        let by_age_then_name = all.order_by(["name", "age"]).unwrap();
        let pairs: Vec<(i64, String)> = by_age_then_name
            .iter()
            .map(|e| {
                (
                    e.get("age").and_then(Value::as_int).unwrap(),
                    e.get("name").and_then(Value::as_text).unwrap().to_string(),
                )
            })
            .collect();
        let mut sorted = pairs.clone();
        sorted.sort();
        prop_assert_eq!(pairs, sorted);
    }

    #[test]
    fn get_is_exact_on_unique_keys(rows in people_strategy(10)) {
        let library = Library::new();
        let all = people(&library, &rows);
        for entity in all.iter() {
            let found = all.get([("pkey", entity.pkey().unwrap())]).unwrap();
            prop_assert_eq!(&found, entity);
        }
    }

    #[test]
    fn wire_round_trip_preserves_books(
        title in title_strategy(),
        pages in pages_strategy(),
        tags in tags_strategy(),
        key in "[a-f0-9]{8}",
    ) {
        let library = Library::new();
        let store = TestStore::memory(&library.registry);
        let mut author = library.author("Ann");
        author.set_pkey("author-1").unwrap();
        let mut book = library
            .book
            .create([
                ("title", Value::from(title)),
                ("pages", Value::from(pages)),
                ("tags", Value::from(tags)),
                ("author", Value::from(author)),
            ])
            .unwrap();
        book.set_pkey(key).unwrap();

        let wire = store.adapter.wire();
        let decoded = wire.decode(&library.book, &wire.encode(&book).unwrap()).unwrap();
        prop_assert_eq!(decoded.pkey(), book.pkey());
        prop_assert_eq!(decoded.values(), book.values());
    }

    #[test]
    fn scalars_survive_any_attributes(value in scalar_value_strategy()) {
        let library = Library::new();
        let store = TestStore::memory(&library.registry);
        let wire = store.adapter.wire();
        let encoded = wire.encode_value(&Value::List(vec![value.clone()])).unwrap();
        let mut document = serde_json::Map::new();
        document.insert("title".into(), "T".into());
        document.insert("tags".into(), encoded);
        let book = wire.decode(&library.book, &document).unwrap();
        prop_assert_eq!(book.get("tags"), Some(&Value::List(vec![value])));
    }
}

#[test]
fn order_by_examples() {
    let library = Library::new();
    let rows: Vec<(String, i64)> = [("A", 30), ("B", 20), ("C", 25)]
        .into_iter()
        .map(|(name, age)| (name.to_string(), age))
        .collect();
    let all = people(&library, &rows);
    assert_eq!(ages(&all.order_by(["age"]).unwrap()), [20, 25, 30]);
    assert_eq!(ages(&all.order_by(["-age"]).unwrap()), [30, 25, 20]);
    assert_eq!(ages(&all.filter([("age__gte", 25)]).unwrap()), [30, 25]);
}
