#![allow(unused_crate_dependencies)]
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use doc_serdes::key::Camel2SnakeCase;
use doc_serdes::tag::SchemaTag;
use doc_serdes::{Codec, Document, SerDes, Signal, Value};
use doc_serdes_types::{Blob, Duration, collection_codecs, table_codecs};
use serde_json::json;
use uuid::Uuid;

fn document<const N: usize>(fields: [(&str, Value); N]) -> Value {
    Value::from(fields.into_iter().collect::<Document>())
}

#[test]
fn name_codec_for_durations() {
    let when = Codec::for_name("when")
        .serialize(|_, value, _| match value.downcast_ref::<Duration>() {
            Some(duration) => Ok(Signal::done_with(duration.to_string())),
            None => Ok(Signal::next()),
        })
        .deserialize(|_, value, _| {
            let text = value.as_str().unwrap_or_default();
            Ok(Signal::done_with(Value::typed(text.parse::<Duration>()?)))
        });

    let serdes = SerDes::builder().codec(when).build().expect("valid codec");
    let duration = Duration::new(1, 2, 0).expect("valid duration");
    let doc = document([("when", Value::typed(duration))]);

    let (wire, big_numbers) = serdes.serialize_record(&doc).expect("serializes");
    assert_eq!(wire, document([("when", Value::from("1mo2d"))]), "short string form");
    assert!(!big_numbers, "no big numbers");

    let back = serdes.deserialize_record(&wire, None).expect("deserializes");
    let back = back.get("when").and_then(Value::downcast_ref::<Duration>);
    assert_eq!(back, Some(&duration), "same duration");
}

#[test]
fn collection_body_round_trip() {
    let serdes = SerDes::builder()
        .builtins(collection_codecs())
        .key_transformer(Camel2SnakeCase::new())
        .build()
        .expect("valid codecs");

    let oid = ObjectId::parse_str("65f1c0ffee0000000000beef").expect("valid object id");
    let created = DateTime::from_timestamp_millis(1_000).expect("in range");
    let tag = Uuid::parse_str("6f2a1b3c-0000-4000-8000-000000000001").expect("valid uuid");

    let doc = document([
        ("_id", Value::typed(oid)),
        ("createdAt", Value::typed(created)),
        ("tagIds", Value::from(vec![Value::typed(tag)])),
        ("avatar", Value::typed(Blob(b"png".to_vec()))),
    ]);

    let body = serdes.serialize_body(&doc).expect("serializes");
    let body = serde_json::from_str::<serde_json::Value>(&body).expect("valid json");
    let expected = json!({
        "_id": { "$objectId": "65f1c0ffee0000000000beef" },
        "created_at": { "$date": 1000 },
        "tag_ids": [{ "$uuid": "6f2a1b3c-0000-4000-8000-000000000001" }],
        "avatar": { "$binary": "cG5n" },
    });
    assert_eq!(body, expected, "wire body");

    let back = serdes.deserialize_body(&body, None).expect("deserializes");
    assert_eq!(back, doc, "round trip");
}

#[test]
fn table_row_from_response() {
    let serdes = SerDes::builder()
        .builtins(table_codecs())
        .tag_resolver(SchemaTag)
        .build()
        .expect("valid codecs");

    // the varint does not fit any primitive number
    let response = r#"{
        "data": {
            "document": {
                "name": "lamp",
                "warranty": "1y6mo",
                "owners": [
                    "0b8e8a52-7a0e-4b59-9f44-2b1a3b3c4d5e",
                    "4c7ab0a1-3f36-4a5c-8ad8-75ad3cc0e2a4"
                ],
                "price": 123456789012345678901234567890
            }
        },
        "status": {
            "projectionSchema": {
                "name": { "type": "text" },
                "warranty": { "type": "duration" },
                "owners": { "type": "set", "valueType": "uuid" },
                "price": { "type": "varint" }
            }
        }
    }"#;
    let response = serde_json::from_str::<serde_json::Value>(response).expect("valid json");

    let row = &response["data"]["document"];
    let row = serdes.deserialize_body(row, Some(&response)).expect("deserializes");

    assert_eq!(row.get("name"), Some(&Value::from("lamp")), "text untouched");
    assert_eq!(
        row.get("warranty").and_then(Value::downcast_ref::<Duration>),
        Some(&Duration::new(18, 0, 0).expect("valid duration")),
        "duration column"
    );

    let owners = row
        .get("owners")
        .and_then(Value::as_array)
        .expect("owners stay an array");
    assert!(
        owners.iter().all(|o| o.downcast_ref::<Uuid>().is_some()),
        "set elements by value type: {owners:?}"
    );

    let price = row.get("price").expect("price present");
    assert!(matches!(price, Value::BigNumber(_)), "varint is exact: {price:?}");

    let (wire, big_numbers) = serdes.serialize_record(&row).expect("serializes");
    assert!(big_numbers, "varint flags big numbers");

    let body = doc_serdes::wire::encode(&wire, big_numbers).expect("encodes");
    assert_eq!(body, response["data"]["document"], "serializes back to the response row");
}

#[test]
fn caller_codecs_override_builtins() {
    let serdes = SerDes::builder()
        .builtins(collection_codecs())
        .codec(Codec::for_name("createdAt").deserialize(|_, _, _| Ok(Signal::done_with("mine"))))
        .build()
        .expect("valid codecs");

    let wire = Value::from(json!({ "createdAt": { "$date": 0 }, "other": { "$date": 0 } }));
    let doc = serdes.deserialize_record(&wire, None).expect("deserializes");

    assert_eq!(doc.get("createdAt"), Some(&Value::from("mine")), "caller name codec first");
    assert!(
        doc.get("other").and_then(Value::downcast_ref::<DateTime<Utc>>).is_some(),
        "builtin still applies elsewhere"
    );
}
