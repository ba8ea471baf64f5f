//! Built-in codec sets for the two document flavors.
//!
//! Collections tag values with a single `$`-key object, like `{"$date": 0}`.
//! Tables instead describe their columns in the response's projection schema
//! and expect plain scalars for most column types.

use anyhow::Context as _;
use bigdecimal::BigDecimal;
use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use doc_serdes::{Codec, Document, PathSegment, SerDesCtx, Signal, Value};
use uuid::Uuid;

use crate::{Blob, Duration};

const TIME_FORMAT: &str = "%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Wraps a payload in a single-key tagged object.
fn sigil(tag: &str, payload: impl Into<Value>) -> Value {
    Value::from([(tag, payload.into())].into_iter().collect::<Document>())
}

/// Gets the payload of a tagged object.
fn payload<'v>(value: &'v Value, tag: &str) -> anyhow::Result<&'v Value> {
    value
        .get(tag)
        .with_context(|| format!("expected a `{tag}` object, got {}", value.kind()))
}

fn string<'v>(value: &'v Value, what: &str) -> anyhow::Result<&'v str> {
    value
        .as_str()
        .with_context(|| format!("expected a {what} string, got {}", value.kind()))
}

/// Codecs for collection documents.
///
/// | Tag         | Application type  | Payload                   |
/// |-------------|-------------------|---------------------------|
/// | `$date`     | [`DateTime<Utc>`] | milliseconds since epoch  |
/// | `$uuid`     | [`Uuid`]          | hyphenated string         |
/// | `$objectId` | [`ObjectId`]      | hex string                |
/// | `$binary`   | [`Blob`]          | base64 string             |
pub fn collection_codecs() -> Vec<Codec> {
    vec![
        Codec::for_class::<DateTime<Utc>>("$date")
            .serialize_as(|date: &DateTime<Utc>, _| {
                Ok(Signal::done_with(sigil("$date", date.timestamp_millis())))
            })
            .deserialize(|_, value, _| {
                let millis = payload(value, "$date")?
                    .as_i64()
                    .context("`$date` must hold epoch milliseconds")?;
                let date = DateTime::from_timestamp_millis(millis)
                    .with_context(|| format!("`$date` {millis} is out of range"))?;
                Ok(Signal::done_with(Value::typed(date)))
            }),
        Codec::for_class::<Uuid>("$uuid")
            .serialize_as(|uuid: &Uuid, _| {
                Ok(Signal::done_with(sigil("$uuid", uuid.to_string())))
            })
            .deserialize(|_, value, _| {
                let uuid = Uuid::parse_str(string(payload(value, "$uuid")?, "uuid")?)?;
                Ok(Signal::done_with(Value::typed(uuid)))
            }),
        Codec::for_class::<ObjectId>("$objectId")
            .serialize_as(|oid: &ObjectId, _| {
                Ok(Signal::done_with(sigil("$objectId", oid.to_hex())))
            })
            .deserialize(|_, value, _| {
                let hex = string(payload(value, "$objectId")?, "object id")?;
                let oid = ObjectId::parse_str(hex)?;
                Ok(Signal::done_with(Value::typed(oid)))
            }),
        Codec::for_class::<Blob>("$binary")
            .serialize_as(|blob: &Blob, _| {
                Ok(Signal::done_with(sigil("$binary", blob.to_base64())))
            })
            .deserialize(blob_from_binary),
    ]
}

/// Codecs for table rows, keyed by column type.
///
/// These expect the projection schema tagging, see
/// [`SchemaTag`](doc_serdes::tag::SchemaTag).
pub fn table_codecs() -> Vec<Codec> {
    vec![
        Codec::for_class::<Duration>("duration")
            .serialize_as(|duration: &Duration, _| Ok(Signal::done_with(duration.to_string())))
            .deserialize(|_, value, _| {
                let duration = string(value, "duration")?.parse::<Duration>()?;
                Ok(Signal::done_with(Value::typed(duration)))
            }),
        Codec::for_class::<NaiveTime>("time")
            .serialize_as(|time: &NaiveTime, _| {
                Ok(Signal::done_with(time.format(TIME_FORMAT).to_string()))
            })
            .deserialize(|_, value, _| {
                let time = NaiveTime::parse_from_str(string(value, "time")?, TIME_FORMAT)?;
                Ok(Signal::done_with(Value::typed(time)))
            }),
        Codec::for_class::<NaiveDate>("date")
            .serialize_as(|date: &NaiveDate, _| {
                Ok(Signal::done_with(date.format(DATE_FORMAT).to_string()))
            })
            .deserialize(|_, value, _| {
                let date = NaiveDate::parse_from_str(string(value, "date")?, DATE_FORMAT)?;
                Ok(Signal::done_with(Value::typed(date)))
            }),
        Codec::for_class::<DateTime<Utc>>("timestamp")
            .serialize_as(|ts: &DateTime<Utc>, _| {
                Ok(Signal::done_with(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            })
            .deserialize(|_, value, _| {
                let ts = DateTime::parse_from_rfc3339(string(value, "timestamp")?)?;
                Ok(Signal::done_with(Value::typed(ts.with_timezone(&Utc))))
            }),
        Codec::for_class::<Uuid>("uuid")
            .serialize_as(|uuid: &Uuid, _| Ok(Signal::done_with(uuid.to_string())))
            .deserialize(uuid_from_string),
        Codec::for_type("timeuuid").deserialize(uuid_from_string),
        Codec::for_class::<Blob>("blob")
            .serialize_as(|blob: &Blob, _| {
                Ok(Signal::done_with(sigil("$binary", blob.to_base64())))
            })
            .deserialize(blob_from_binary),
        Codec::for_type("varint").deserialize(big_number),
        Codec::for_type("decimal").deserialize(big_number),
        Codec::for_type("bigint").deserialize(|_, value, _| match value {
            Value::Int(_) | Value::BigNumber(_) => Ok(Signal::done()),
            Value::String(s) => match s.parse::<i64>() {
                Ok(int) => Ok(Signal::done_with(int)),
                Err(_) => Ok(Signal::done_with(s.parse::<BigDecimal>()?)),
            },
            _ => anyhow::bail!("expected a bigint, got {}", value.kind()),
        }),
    ]
}

fn uuid_from_string(
    _: &PathSegment,
    value: &Value,
    _: &mut SerDesCtx<'_>,
) -> anyhow::Result<Signal> {
    let uuid = Uuid::parse_str(string(value, "uuid")?)?;
    Ok(Signal::done_with(Value::typed(uuid)))
}

fn blob_from_binary(
    _: &PathSegment,
    value: &Value,
    _: &mut SerDesCtx<'_>,
) -> anyhow::Result<Signal> {
    let blob = Blob::from_base64(string(payload(value, "$binary")?, "base64")?)?;
    Ok(Signal::done_with(Value::typed(blob)))
}

/// Reads `varint` and `decimal` columns, which may arrive as plain numbers or
/// as strings, into exact big numbers.
fn big_number(_: &PathSegment, value: &Value, _: &mut SerDesCtx<'_>) -> anyhow::Result<Signal> {
    let number = match value {
        Value::BigNumber(_) => return Ok(Signal::done()),
        Value::Int(int) => BigDecimal::from(*int),
        // shortest round-trip digits, never in exponent form
        Value::Float(float) => float.to_string().parse()?,
        Value::String(s) => s.parse()?,
        _ => anyhow::bail!("expected a number, got {}", value.kind()),
    };

    Ok(Signal::done_with(number))
}

#[cfg(test)]
mod tests {
    use doc_serdes::SerDes;
    use doc_serdes::tag::SchemaTag;
    use serde_json::json;

    use super::*;

    fn collections() -> SerDes {
        SerDes::builder()
            .builtins(collection_codecs())
            .build()
            .expect("collection codecs are valid")
    }

    fn tables() -> SerDes {
        SerDes::builder()
            .builtins(table_codecs())
            .tag_resolver(SchemaTag)
            .build()
            .expect("table codecs are valid")
    }

    #[test]
    fn collection_dates_as_millis() {
        let date = DateTime::from_timestamp_millis(1_700_000_000_123).expect("in range");
        let doc = Value::from([("at", Value::typed(date))].into_iter().collect::<Document>());

        let (wire, big) = collections().serialize_record(&doc).expect("serializes");
        assert_eq!(wire.get("at"), Some(&sigil("$date", 1_700_000_000_123_i64)), "wire form");
        assert!(!big, "no big numbers");

        let back = collections().deserialize_record(&wire, None).expect("deserializes");
        assert_eq!(back, doc, "round trip");
    }

    #[test]
    fn collection_bad_payload_fails() {
        let wire = Value::from(json!({ "id": { "$uuid": "not-a-uuid" } }));
        let err = collections()
            .deserialize_record(&wire, None)
            .expect_err("invalid uuid");
        assert_eq!(err.path().map(ToString::to_string).as_deref(), Some("id"), "error path");
    }

    #[test]
    fn table_columns_by_schema() {
        let raw = json!({
            "status": {
                "projectionSchema": {
                    "id": { "type": "timeuuid" },
                    "at": { "type": "timestamp" },
                    "amount": { "type": "decimal" },
                    "count": { "type": "varint" },
                }
            }
        });
        let row = json!({
            "id": "c1a9e7a2-5f0e-11ee-8c99-0242ac120002",
            "at": "2024-05-01T12:30:00Z",
            "amount": "12.50",
            "count": 3,
        });

        let row = tables().deserialize_body(&row, Some(&raw)).expect("deserializes");

        let id = row.get("id").and_then(Value::downcast_ref::<Uuid>);
        assert!(id.is_some(), "timeuuid read as uuid");

        let at = row.get("at").and_then(Value::downcast_ref::<DateTime<Utc>>);
        assert_eq!(at.map(DateTime::timestamp), Some(1_714_566_600), "timestamp");

        let amount = "12.50".parse::<BigDecimal>().expect("valid decimal");
        assert_eq!(row.get("amount"), Some(&Value::BigNumber(amount)), "decimal");
        assert_eq!(
            row.get("count"),
            Some(&Value::BigNumber(BigDecimal::from(3))),
            "varint"
        );
    }

    #[test]
    fn table_scalars_serialize() {
        let time = NaiveTime::from_hms_milli_opt(8, 5, 3, 250).expect("valid time");
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid date");
        let doc = [
            ("time", Value::typed(time)),
            ("date", Value::typed(date)),
            ("data", Value::typed(Blob(vec![1, 2, 3]))),
        ];
        let doc = Value::from(doc.into_iter().collect::<Document>());

        let (wire, _) = tables().serialize_record(&doc).expect("serializes");
        assert_eq!(wire.get("time"), Some(&Value::from("08:05:03.250")), "time");
        assert_eq!(wire.get("date"), Some(&Value::from("2024-02-29")), "date");
        assert_eq!(wire.get("data"), Some(&sigil("$binary", "AQID")), "blob");
    }
}
