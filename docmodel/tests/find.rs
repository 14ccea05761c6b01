use bson::{Bson, doc, oid::ObjectId};
use chrono::{DateTime, TimeZone, Utc};
use docmodel::{
    materialize::Materializer,
    memory::InMemoryDriver,
    prelude::*,
};
use futures::TryStreamExt;
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Schema)]
struct Nested {
    integer: i64,
    optional: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Schema)]
#[docmodel(collection = "samples")]
struct Sample {
    #[serde(rename = "_id")]
    id: ObjectId,
    string: String,
    integer: i64,
    increment: i64,
    #[docmodel(nested)]
    nested: Nested,
}

#[derive(Debug, PartialEq, Deserialize, Schema)]
struct SampleProjection {
    string: String,
    integer: i64,
}

#[derive(Debug, PartialEq, Deserialize)]
struct RenamedProjection {
    string: String,
    i: i64,
}

impl docmodel::schema::Schema for RenamedProjection {
    fn fields() -> &'static [FieldDef] {
        const FIELDS: &[FieldDef] = &[
            FieldDef::new("string", FieldType::String),
            FieldDef::new("i", FieldType::Integer),
        ];
        FIELDS
    }

    fn projection() -> Option<bson::Document> {
        Some(doc! { "string": 1, "i": "$nested.integer" })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Schema)]
#[docmodel(collection = "painted")]
struct Painted {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[docmodel(codec = "color")]
    color: Color,
    #[docmodel(codec = "timestamp")]
    timestamp: DateTime<Utc>,
}

/// `(integer, string, nested.integer, nested.optional)` indexed by `increment`.
///
/// `integer > 1 && nested.optional == null` matches increments 2 and 3.
/// `increment > 2 && nested.optional == null` matches increments 3, 6, 7 and 8.
const PRESET: [(i64, &str, i64, Option<&str>); 10] = [
    (0, "test_0", 0, Some("a")),
    (1, "test_1", 1, None),
    (2, "test_2", 3, None),
    (2, "test_2", 4, None),
    (4, "test_4", 4, Some("b")),
    (5, "test_5", 5, Some("c")),
    (1, "test_6", 6, None),
    (1, "test_7", 7, None),
    (0, "test_8", 8, None),
    (9, "test_9", 9, Some("d")),
];

fn preset_documents() -> Vec<Sample> {
    PRESET
        .iter()
        .enumerate()
        .map(|(increment, (integer, string, nested_integer, optional))| Sample {
            id: ObjectId::new(),
            string: string.to_string(),
            integer: *integer,
            increment: increment as i64,
            nested: Nested {
                integer: *nested_integer,
                optional: optional.map(str::to_string),
            },
        })
        .collect()
}

async fn preset_store() -> DocumentStore<InMemoryDriver> {
    let materializer = Materializer::default();
    let documents = preset_documents()
        .iter()
        .map(|sample| materializer.encode(sample).unwrap())
        .collect::<Vec<_>>();

    let driver = InMemoryDriver::builder()
        .collection(Sample::collection_name(), documents)
        .build()
        .await
        .unwrap();

    DocumentStore::new(driver)
}

fn unset() -> Predicate {
    Sample::nested().child("optional").is_null()
}

#[tokio::test]
async fn test_find_query() {
    let store = preset_store().await;
    let samples = store.collection::<Sample>();

    let q = samples.find_many([Sample::integer().eq(1)]).get_filter_query().unwrap();
    assert_eq!(q, doc! { "integer": 1 });

    let q = samples
        .find_many([Sample::integer().eq(1), Sample::nested().child("integer").gte(2)])
        .get_filter_query()
        .unwrap();
    assert_eq!(q, doc! { "$and": [{ "integer": 1 }, { "nested.integer": { "$gte": 2 } }] });

    let q = samples
        .find_many([Sample::integer().eq(1)])
        .find_many([Sample::nested().child("integer").gte(2)])
        .get_filter_query()
        .unwrap();
    assert_eq!(q, doc! { "$and": [{ "integer": 1 }, { "nested.integer": { "$gte": 2 } }] });

    let q = samples.find_all().get_filter_query().unwrap();
    assert_eq!(q, doc! {});
}

#[tokio::test]
async fn test_find_many() {
    let store = preset_store().await;
    let query = store
        .collection::<Sample>()
        .find_many([Sample::integer().gt(1)])
        .find_many([unset()]);

    let result = query.to_list().await.unwrap();
    assert_eq!(result.len(), 2);
    for sample in &result {
        assert!(sample.integer > 1);
        assert_eq!(sample.nested.optional, None);
    }

    let mut stream = query.stream().await.unwrap();
    let mut len_result = 0;
    while let Some(sample) = stream.try_next().await.unwrap() {
        assert!(result.contains(&sample));
        len_result += 1;
    }
    assert_eq!(len_result, result.len());
}

#[tokio::test]
async fn test_find_many_skip() {
    let store = preset_store().await;
    let samples = store.collection::<Sample>();

    let q = samples
        .find_many_with([Sample::integer().gt(1)], FindArgs::new().skip(2))
        .unwrap();
    assert_eq!(q.skip_number(), Some(2));

    let q = samples.find_many([Sample::integer().gt(1)]).skip(2).unwrap();
    assert_eq!(q.skip_number(), Some(2));

    let q = samples
        .find_many_with([Sample::integer().gt(1)], FindArgs::new().skip(2))
        .unwrap()
        .skip(5)
        .unwrap();
    assert_eq!(q.skip_number(), Some(5));

    let query = samples
        .find_many([Sample::increment().gt(2)])
        .find_many([unset()])
        .skip(1)
        .unwrap();

    let result = query.to_list().await.unwrap();
    assert_eq!(result.len(), 3);
    for sample in &result {
        assert!(sample.increment > 2);
        assert_eq!(sample.nested.optional, None);
    }

    let streamed: Vec<Sample> = query.stream().await.unwrap().try_collect().await.unwrap();
    assert_eq!(streamed.len(), result.len());
    assert!(streamed.iter().all(|sample| result.contains(sample)));
}

#[tokio::test]
async fn test_find_many_limit() {
    let store = preset_store().await;
    let samples = store.collection::<Sample>();

    let q = samples
        .find_many_with([Sample::integer().gt(1)], FindArgs::new().limit(2))
        .unwrap();
    assert_eq!(q.limit_number(), Some(2));

    let q = samples.find_many([Sample::integer().gt(1)]).limit(2).unwrap();
    assert_eq!(q.limit_number(), Some(2));

    let result = samples
        .find_many([Sample::increment().gt(2)])
        .find([unset()])
        .sort(Sample::increment())
        .unwrap()
        .limit(2)
        .unwrap()
        .to_list()
        .await
        .unwrap();

    let increments: Vec<i64> = result.iter().map(|s| s.increment).collect();
    assert_eq!(increments, vec![3, 6]);
}

#[tokio::test]
async fn test_negative_skip_and_limit() {
    let store = preset_store().await;
    let samples = store.collection::<Sample>();

    assert!(matches!(samples.find_all().skip(-1), Err(OdmError::InvalidArgument(_))));
    assert!(matches!(samples.find_all().limit(-1), Err(OdmError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_find_all() {
    let store = preset_store().await;
    let query = store.collection::<Sample>().find_all();

    let result = query.to_list().await.unwrap();
    assert_eq!(result.len(), 10);

    let streamed: Vec<Sample> = query.stream().await.unwrap().try_collect().await.unwrap();
    assert_eq!(streamed, result);
}

#[tokio::test]
async fn test_find_one() {
    let store = preset_store().await;
    let samples = store.collection::<Sample>();

    let found = samples
        .find_one([Sample::integer().gt(1)])
        .find_one([unset()])
        .await
        .unwrap()
        .unwrap();
    assert!(found.integer > 1);
    assert_eq!(found.nested.optional, None);

    let missing = samples
        .find_one([Sample::integer().gt(100)])
        .find_one([unset()])
        .await
        .unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn test_find_one_with_sort_and_skip() {
    let store = preset_store().await;
    let found = store
        .collection::<Sample>()
        .find_one_with([unset()], FindArgs::new().sort("-increment").skip(1))
        .unwrap()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(found.increment, 7);
}

#[tokio::test]
async fn test_get() {
    let store = preset_store().await;
    let samples = store.collection::<Sample>();

    let a = samples
        .find_one([Sample::integer().gt(1)])
        .find_one([unset()])
        .await
        .unwrap()
        .unwrap();

    let by_id = samples.get(a.id).await.unwrap();
    assert_eq!(by_id.as_ref(), Some(&a));

    let by_hex = samples.get(a.id.to_hex()).await.unwrap();
    assert_eq!(by_hex, by_id);

    assert_eq!(samples.get(ObjectId::new()).await.unwrap(), None);
    assert!(matches!(samples.get("not-an-object-id").await, Err(OdmError::TypeMismatch(_))));
    assert!(matches!(samples.get(1).await, Err(OdmError::TypeMismatch(_))));
}

fn assert_descending(samples: &[Sample]) {
    assert!(samples.windows(2).all(|w| w[0].integer >= w[1].integer));
}

fn assert_ascending(samples: &[Sample]) {
    assert!(samples.windows(2).all(|w| w[0].integer <= w[1].integer));
}

#[tokio::test]
async fn test_sort() {
    let store = preset_store().await;
    let samples = store.collection::<Sample>();
    let descending = [SortKey::new("integer", SortDirection::Descending)];
    let ascending = [SortKey::new("integer", SortDirection::Ascending)];

    let q = samples
        .find_many_with([Sample::integer().gt(1)], FindArgs::new().sort("-integer"))
        .unwrap();
    assert_eq!(q.sort_expressions(), &descending);

    let q = samples
        .find_many_with([Sample::integer().gt(1)], FindArgs::new().sort("integer"))
        .unwrap();
    assert_eq!(q.sort_expressions(), &ascending);

    let q = samples
        .find_many([Sample::integer().gt(1)])
        .find_many([Sample::integer().lt(100)])
        .sort("-integer")
        .unwrap();
    assert_eq!(q.sort_expressions(), &descending);

    for (spec, descending) in [
        (SortArg::from("-integer"), true),
        (SortArg::from("+integer"), false),
        (SortArg::from("integer"), false),
        (SortArg::from(-Sample::integer()), true),
        (SortArg::from(Sample::integer()), false),
    ] {
        let result = samples
            .find_many_with([Sample::integer().gt(1)], FindArgs::new().sort(spec))
            .unwrap()
            .to_list()
            .await
            .unwrap();

        assert_eq!(result.len(), 5);
        if descending {
            assert_descending(&result);
        } else {
            assert_ascending(&result);
        }
    }

    assert!(matches!(
        samples.find_many_with([Sample::integer().gt(1)], FindArgs::new().sort(Bson::Int32(1))),
        Err(OdmError::TypeMismatch(_))
    ));
    assert!(matches!(
        samples.find_all().sort("-"),
        Err(OdmError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_multi_key_sort() {
    let store = preset_store().await;
    let result = store
        .collection::<Sample>()
        .find_all()
        .sort(vec![SortArg::from(-Sample::integer()), SortArg::from("increment")])
        .unwrap()
        .to_list()
        .await
        .unwrap();

    let keys: Vec<(i64, i64)> = result.iter().map(|s| (s.integer, s.increment)).collect();
    assert_eq!(
        keys,
        vec![(9, 9), (5, 5), (4, 4), (2, 2), (2, 3), (1, 1), (1, 6), (1, 7), (0, 0), (0, 8)]
    );
}

#[tokio::test]
async fn test_find_many_with_projection() {
    let store = preset_store().await;
    let samples = store.collection::<Sample>();
    let expected = vec![
        SampleProjection { string: "test_2".into(), integer: 2 },
        SampleProjection { string: "test_2".into(), integer: 2 },
    ];

    let query = samples
        .find_many([Sample::integer().gt(1)])
        .find_many([unset()])
        .project::<SampleProjection>();
    assert_eq!(query.get_projection(), Some(doc! { "string": 1, "integer": 1 }));
    assert_eq!(query.to_list().await.unwrap(), expected);

    let query = samples
        .find_many([Sample::integer().gt(1)])
        .project::<SampleProjection>()
        .find_many([unset()]);
    assert_eq!(query.to_list().await.unwrap(), expected);

    assert_eq!(samples.find_all().get_projection(), None);
}

#[tokio::test]
async fn test_find_many_with_custom_projection() {
    let store = preset_store().await;
    let result = store
        .collection::<Sample>()
        .find_many([Sample::integer().gt(1)])
        .find_many([unset()])
        .project::<RenamedProjection>()
        .sort(Sample::nested().child("integer"))
        .unwrap()
        .to_list()
        .await
        .unwrap();

    assert_eq!(
        result,
        vec![
            RenamedProjection { string: "test_2".into(), i: 3 },
            RenamedProjection { string: "test_2".into(), i: 4 },
        ]
    );
}

#[tokio::test]
async fn test_find_many_with_session() {
    let store = preset_store().await;
    let samples = store.collection::<Sample>();
    let session = Session::new(());

    let q_1 = samples
        .find_many([Sample::integer().gt(1)])
        .find_many([unset()])
        .set_session(session.clone());
    assert_eq!(q_1.session(), Some(&session));

    let q_2 = samples
        .find_many([Sample::integer().gt(1)])
        .find_many_with([unset()], FindArgs::new().session(session.clone()))
        .unwrap();
    assert_eq!(q_2.session(), Some(&session));

    let result = q_2.to_list().await.unwrap();
    assert_eq!(result.len(), 2);
    for sample in &result {
        assert!(sample.integer > 1);
        assert_eq!(sample.nested.optional, None);
    }

    let streamed: Vec<Sample> = samples
        .find_many([Sample::integer().gt(1)])
        .find_many([unset()])
        .stream()
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(streamed, result);
}

#[tokio::test]
async fn test_codec_fields() {
    let codecs = CodecRegistry::with_defaults();
    let painted = Painted {
        id: ObjectId::new(),
        color: "7fffd4".parse().unwrap(),
        timestamp: Utc.timestamp_millis_opt(1_714_566_645_123).unwrap(),
    };

    let stored = Materializer::new(Arc::new(codecs.clone()))
        .encode(&painted)
        .unwrap();
    assert_eq!(stored.get_str("color").unwrap(), "#7fffd4");

    let driver = InMemoryDriver::new();
    driver.insert(Painted::collection_name(), [stored]).await;
    let store = DocumentStore::builder(driver).codecs(codecs).build();
    let collection = store.collection::<Painted>();

    let query = collection.find_one([Painted::color().eq(Color::new(0x7f, 0xff, 0xd4))]);
    assert_eq!(query.get_filter_query().unwrap(), doc! { "color": "#7fffd4" });

    let found = query.await.unwrap().unwrap();
    assert_eq!(found.color.as_hex(), painted.color.as_hex());
    assert_eq!(found, painted);

    let missing = collection
        .find_one([Painted::color().eq(Color::new(0, 0, 0))])
        .await
        .unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn test_decode_error_names_field() {
    let driver = InMemoryDriver::new();
    driver
        .insert(
            Sample::collection_name(),
            [doc! {
                "_id": ObjectId::new(),
                "string": "broken",
                "integer": 1,
                "increment": 0,
                "nested": { "integer": "one" },
            }],
        )
        .await;
    let store = DocumentStore::new(driver);

    let err = store.collection::<Sample>().find_all().to_list().await.unwrap_err();
    assert_eq!(err.path(), Some("nested.integer"));
}

#[test]
fn test_derived_schema() {
    let names: Vec<&str> = Sample::field_names();
    assert_eq!(names, vec!["_id", "string", "integer", "increment", "nested"]);
    assert_eq!(Sample::collection_name(), "samples");
    assert_eq!(Sample::id().path(), "_id");
    assert_eq!(Sample::nested().child("optional").path(), "nested.optional");
    assert_eq!(Painted::color().codec(), Some("color"));

    let optional = Nested::fields()
        .iter()
        .find(|def| def.name == "optional")
        .unwrap();
    assert!(optional.optional);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Schema)]
#[docmodel(collection = "big", key = i64)]
struct Big {
    #[serde(rename = "_id")]
    id: i64,
    name: String,
}

#[tokio::test]
async fn test_get_distinguishes_large_integer_keys() {
    let driver = InMemoryDriver::new();
    driver
        .insert(
            Big::collection_name(),
            [
                doc! { "_id": 9_007_199_254_740_992_i64, "name": "first" },
                doc! { "_id": 9_007_199_254_740_993_i64, "name": "second" },
            ],
        )
        .await;
    let store = DocumentStore::new(driver);
    let big = store.collection::<Big>();

    let second = big.get(9_007_199_254_740_993_i64).await.unwrap().unwrap();
    assert_eq!(second.name, "second");

    let first = big.get("9007199254740992").await.unwrap().unwrap();
    assert_eq!(first.name, "first");
}

#[tokio::test]
async fn test_zero_limit_is_unbounded() {
    let store = preset_store().await;
    let samples = store.collection::<Sample>();

    let query = samples.find_all().limit(0).unwrap();
    assert_eq!(query.limit_number(), Some(0));
    assert_eq!(query.to_list().await.unwrap().len(), 10);
}
