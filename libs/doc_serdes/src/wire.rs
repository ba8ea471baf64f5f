//! Bridges between [`Value`] trees and wire JSON.
//!
//! Decoding keeps numbers exact: integers that overflow `i64` and decimals
//! with more significant digits than an `f64` holds become
//! [`Value::BigNumber`]. Encoding only writes big numbers with their exact
//! digits when asked to, since not every endpoint accepts them.

use bigdecimal::BigDecimal;
use serde_json::{Number, Value as Json};

use crate::error::{Error, Result};
use crate::path::{KeyPath, PathSegment};
use crate::value::{Array, Document, Value};

/// Decimal digits an `f64` represents without loss.
const FLOAT_DIGITS: usize = 15;

/// Converts wire JSON into a value tree.
pub fn decode(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => decode_number(n),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::Array(items.iter().map(decode).collect::<Array>()),
        Json::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.as_str(), decode(v)))
                .collect::<Document>(),
        ),
    }
}

fn decode_number(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        return Value::Int(i);
    }

    let text = n.to_string();
    let is_integer = !text.contains(['.', 'e', 'E']);

    let big = || text.parse::<BigDecimal>().ok().map(Value::BigNumber);
    let float = || n.as_f64().map(Value::Float);

    let value = if is_integer || significant_digits(&text) > FLOAT_DIGITS {
        big().or_else(float)
    } else {
        float().or_else(big)
    };

    value.unwrap_or(Value::Null)
}

/// Counts the significant digits of a JSON number literal.
fn significant_digits(text: &str) -> usize {
    let mantissa = text.split(['e', 'E']).next().unwrap_or(text);
    let digits = mantissa
        .bytes()
        .filter(u8::is_ascii_digit)
        .collect::<Vec<u8>>();

    let start = digits.iter().position(|&d| d != b'0');
    let end = digits.iter().rposition(|&d| d != b'0');
    match (start, end) {
        (Some(start), Some(end)) => end - start + 1,
        _ => 0,
    }
}

/// Converts a value tree into wire JSON.
///
/// With `big_numbers` set, [`Value::BigNumber`]s are written with their exact
/// digits. Otherwise they are rounded to the nearest `f64`.
///
/// # Errors
///
/// Returns [`Error::Unconverted`] if the tree still holds an application value
/// and [`Error::NonFiniteFloat`] for NaN and infinite floats.
pub fn encode(value: &Value, big_numbers: bool) -> Result<Json> {
    let mut path = Vec::new();
    encode_at(value, big_numbers, &mut path)
}

fn encode_at(value: &Value, big_numbers: bool, path: &mut Vec<PathSegment>) -> Result<Json> {
    let json = match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => Json::Number(finite(*f, path)?),
        Value::BigNumber(n) if big_numbers => Json::Number(n.to_string().parse::<Number>()?),
        Value::BigNumber(n) => {
            let f = n.to_string().parse::<f64>().unwrap_or(f64::NAN);
            Json::Number(finite(f, path)?)
        },
        Value::String(s) => Json::String(s.clone()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                out.push(encode_at(item, big_numbers, path)?);
                path.pop();
            }
            Json::Array(out)
        },
        Value::Object(doc) => {
            let mut out = serde_json::Map::with_capacity(doc.len());
            for (key, item) in doc {
                path.push(PathSegment::Key(key.clone()));
                out.insert(key.clone(), encode_at(item, big_numbers, path)?);
                path.pop();
            }
            Json::Object(out)
        },
        Value::Typed(typed) => {
            return Err(Error::Unconverted {
                path: KeyPath::from(path.as_slice()),
                type_name: typed.type_name(),
            });
        },
    };

    Ok(json)
}

fn finite(f: f64, path: &[PathSegment]) -> Result<Number> {
    Number::from_f64(f).ok_or_else(|| Error::NonFiniteFloat {
        path: KeyPath::from(path),
    })
}

/// Encodes a value tree as JSON text.
///
/// # Errors
///
/// See [`encode`].
pub fn encode_body(value: &Value, big_numbers: bool) -> Result<String> {
    let json = encode(value, big_numbers)?;
    Ok(serde_json::to_string(&json)?)
}

/// Decodes JSON text into a value tree.
///
/// # Errors
///
/// Returns [`Error::Json`] if the text isn't valid JSON.
pub fn decode_body(text: &str) -> Result<Value> {
    let json = serde_json::from_str::<Json>(text)?;
    Ok(decode(&json))
}

impl From<Json> for Value {
    fn from(value: Json) -> Self {
        decode(&value)
    }
}

impl From<&Json> for Value {
    fn from(value: &Json) -> Self {
        decode(value)
    }
}
