use nitrite_engine::collection::{order_by, Document, NitriteCollection};
use nitrite_engine::common::{SortOrder, Value};
use nitrite_engine::doc;
use nitrite_engine::errors::NitriteResult;
use nitrite_engine::filter::{and, field, not, or, Filter};
use nitrite_engine::index::{non_unique_index, unique_index};
use nitrite_engine::nitrite_config::NitriteConfig;
use proptest::prelude::*;
use std::collections::BTreeSet;

const CITIES: [&str; 4] = ["oslo", "rome", "lima", "kyiv"];
const TAGS: [&str; 3] = ["red", "blue", "green"];

/// age, city, tags. `None` leaves the field out of the document.
type Row = (i64, Option<usize>, Option<Vec<usize>>);

#[derive(Debug, Clone)]
enum Leaf {
    AgeEq(i64),
    AgeNe(i64),
    AgeGt(i64),
    AgeLte(i64),
    CityEq(usize),
    CityIn(Vec<usize>),
    CityNotIn(Vec<usize>),
    CityIsNull,
    CityStartsWith(usize),
    TagEq(usize),
    TagNe(usize),
    TagIn(Vec<usize>),
    TagIsNull,
}

#[derive(Debug, Clone)]
enum Query {
    Leaf(Leaf),
    And(Vec<Query>),
    Or(Vec<Query>),
    Not(Box<Query>),
}

fn cities(picks: &[usize]) -> Vec<&'static str> {
    picks.iter().map(|c| CITIES[*c]).collect()
}

fn tags(picks: &[usize]) -> Vec<&'static str> {
    picks.iter().map(|t| TAGS[*t]).collect()
}

impl Leaf {
    fn filter(&self) -> Filter {
        match self {
            Leaf::AgeEq(age) => field("age").eq(*age),
            Leaf::AgeNe(age) => field("age").ne(*age),
            Leaf::AgeGt(age) => field("age").gt(*age),
            Leaf::AgeLte(age) => field("age").lte(*age),
            Leaf::CityEq(city) => field("city").eq(CITIES[*city]),
            Leaf::CityIn(picks) => field("city").in_array(cities(picks)),
            Leaf::CityNotIn(picks) => field("city").not_in_array(cities(picks)),
            Leaf::CityIsNull => field("city").eq(Value::Null),
            Leaf::CityStartsWith(city) => field("city").regex(&format!("^{}", &CITIES[*city][..1])),
            Leaf::TagEq(tag) => field("tags").eq(TAGS[*tag]),
            Leaf::TagNe(tag) => field("tags").ne(TAGS[*tag]),
            Leaf::TagIn(picks) => field("tags").in_array(tags(picks)),
            Leaf::TagIsNull => field("tags").eq(Value::Null),
        }
    }
}

impl Query {
    fn filter(&self) -> Filter {
        match self {
            Query::Leaf(leaf) => leaf.filter(),
            Query::And(queries) => and(queries.iter().map(Query::filter).collect()),
            Query::Or(queries) => or(queries.iter().map(Query::filter).collect()),
            Query::Not(query) => not(query.filter()),
        }
    }
}

fn leaf() -> impl Strategy<Value = Leaf> {
    prop_oneof![
        (0i64..20).prop_map(Leaf::AgeEq),
        (0i64..20).prop_map(Leaf::AgeNe),
        (0i64..20).prop_map(Leaf::AgeGt),
        (0i64..20).prop_map(Leaf::AgeLte),
        (0usize..4).prop_map(Leaf::CityEq),
        prop::collection::vec(0usize..4, 1..3).prop_map(Leaf::CityIn),
        prop::collection::vec(0usize..4, 1..3).prop_map(Leaf::CityNotIn),
        Just(Leaf::CityIsNull),
        (0usize..4).prop_map(Leaf::CityStartsWith),
        (0usize..3).prop_map(Leaf::TagEq),
        (0usize..3).prop_map(Leaf::TagNe),
        prop::collection::vec(0usize..3, 1..3).prop_map(Leaf::TagIn),
        Just(Leaf::TagIsNull),
    ]
}

fn query() -> impl Strategy<Value = Query> {
    leaf().prop_map(Query::Leaf).prop_recursive(3, 12, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..3).prop_map(Query::And),
            prop::collection::vec(inner.clone(), 1..3).prop_map(Query::Or),
            inner.prop_map(|query| Query::Not(Box::new(query))),
        ]
    })
}

/// Rows with missing fields and empty, single and repeated tag arrays.
fn people() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(
        (
            0i64..20,
            prop::option::of(0usize..4),
            prop::option::of(prop::collection::vec(0usize..3, 0..3)),
        ),
        0..40,
    )
}

fn person(seq: usize, row: &Row) -> NitriteResult<Document> {
    let (age, city, picks) = row;
    let mut document = doc! { seq: seq, age: (*age) };
    if let Some(city) = city {
        document.put("city", CITIES[*city])?;
    }
    if let Some(picks) = picks {
        document.put("tags", tags(picks))?;
    }
    Ok(document)
}

fn seqs(coll: &NitriteCollection, filter: Filter) -> NitriteResult<BTreeSet<Value>> {
    coll.find(filter)?
        .map(|document| document.and_then(|d| d.get("seq")))
        .collect()
}

fn load(coll: &NitriteCollection, rows: &[Row]) -> NitriteResult<()> {
    for (seq, row) in rows.iter().enumerate() {
        coll.insert(person(seq, row)?)?;
    }
    Ok(())
}

fn direction(descending: bool) -> SortOrder {
    if descending {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn indexed_and_scanned_results_agree(rows in people(), query in query()) {
        let config = NitriteConfig::new();
        let scanned = NitriteCollection::open("scanned", &config).unwrap();
        load(&scanned, &rows).unwrap();

        let indexed = NitriteCollection::open("indexed", &config).unwrap();
        indexed.create_index(vec!["age"], &non_unique_index()).unwrap();
        indexed.create_index(vec!["city", "tags"], &non_unique_index()).unwrap();
        indexed.create_index(vec!["tags"], &non_unique_index()).unwrap();
        load(&indexed, &rows).unwrap();

        let expected = seqs(&scanned, query.filter()).unwrap();
        let actual = seqs(&indexed, query.filter()).unwrap();
        prop_assert_eq!(expected, actual);
        config.close().unwrap();
    }

    #[test]
    fn indexed_and_scanned_order_agree(
        rows in people(),
        age_descending in any::<bool>(),
        city_descending in any::<bool>(),
        full_key in any::<bool>(),
    ) {
        let config = NitriteConfig::new();
        let scanned = NitriteCollection::open("scanned", &config).unwrap();
        load(&scanned, &rows).unwrap();

        let indexed = NitriteCollection::open("indexed", &config).unwrap();
        indexed.create_index(vec!["age", "city"], &non_unique_index()).unwrap();
        load(&indexed, &rows).unwrap();

        let mut options = order_by("age", direction(age_descending));
        if full_key {
            options = options.sort_by("city", direction(city_descending));
        }
        let ordered = |coll: &NitriteCollection| -> NitriteResult<Vec<Value>> {
            coll.find_with_options(field("age").gte(0), &options)?
                .map(|document| document.and_then(|d| d.get("seq")))
                .collect()
        };

        let mut from_index = indexed.find_with_options(field("age").gte(0), &options).unwrap();
        prop_assert!(from_index.find_plan().uses_index());
        prop_assert_eq!(from_index.find_plan().blocking_sort_order().is_empty(), full_key);
        prop_assert_eq!(ordered(&indexed).unwrap(), ordered(&scanned).unwrap());
        config.close().unwrap();
    }

    #[test]
    fn index_entries_follow_updates_and_removes(rows in people(), shift in 1i64..5, cutoff in 0i64..20) {
        let config = NitriteConfig::new();
        let coll = NitriteCollection::open("people", &config).unwrap();
        coll.create_index(vec!["seq"], &unique_index()).unwrap();
        coll.create_index(vec!["age"], &non_unique_index()).unwrap();
        coll.create_index(vec!["tags"], &non_unique_index()).unwrap();
        load(&coll, &rows).unwrap();

        let update = doc! { moved: true };
        coll.update(field("age").lt(cutoff), &update).unwrap();
        for (seq, (age, _, _)) in rows.iter().enumerate() {
            if age % 2 == 0 {
                let bumped = age + shift;
                let change = doc! { age: bumped, tags: [] };
                coll.update(field("seq").eq(seq), &change).unwrap();
            }
        }
        coll.remove(field("age").gte(cutoff + shift), false).unwrap();

        let mut model = BTreeSet::new();
        let mut kept = Vec::new();
        for (seq, (age, _, picks)) in rows.iter().enumerate() {
            let (age, picks) = if age % 2 == 0 {
                (age + shift, Some(Vec::new()))
            } else {
                (*age, picks.clone())
            };
            if age < cutoff + shift {
                model.insert(Value::from(seq));
                kept.push((age, picks));
            }
        }

        prop_assert_eq!(coll.size().unwrap(), model.len() as u64);
        for age in 0i64..25 {
            let from_index = seqs(&coll, field("age").eq(age)).unwrap();
            let expected = kept.iter().filter(|(kept_age, _)| *kept_age == age).count();
            prop_assert_eq!(from_index.len(), expected);
            prop_assert!(from_index.is_subset(&model));
        }
        for (tag, name) in TAGS.iter().enumerate() {
            let from_index = seqs(&coll, field("tags").eq(*name)).unwrap();
            let expected = kept
                .iter()
                .filter(|(_, picks)| picks.as_ref().is_some_and(|p| p.contains(&tag)))
                .count();
            prop_assert_eq!(from_index.len(), expected);
        }
        let untagged = seqs(&coll, field("tags").eq(Value::Null)).unwrap();
        let expected = kept
            .iter()
            .filter(|(_, picks)| picks.as_ref().map_or(true, Vec::is_empty))
            .count();
        prop_assert_eq!(untagged.len(), expected);
        config.close().unwrap();
    }
}
