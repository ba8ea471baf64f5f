//! Discovery of type tags on wire values, which select the type codecs tried
//! when deserializing.

use std::borrow::Cow;

use crate::ctx::SerDesCtx;
use crate::path::PathSegment;
use crate::value::Value;

/// Finds the type tag a wire value carries.
pub trait TagResolver: Send + Sync {
    /// Gets the tag for the value at the current key, if it has one.
    ///
    /// The current key is the last segment of [`SerDesCtx::path`].
    fn resolve<'v>(&self, value: &'v Value, ctx: &SerDesCtx<'_>) -> Option<Cow<'v, str>>;
}

/// Tags wire values shaped like `{"$date": 0}`: an object with exactly one key
/// that starts with `$`. That key is the tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct SigilTag;

impl SigilTag {
    fn tag_of(value: &Value) -> Option<&str> {
        let doc = value.as_document()?;
        if doc.len() != 1 {
            return None;
        }

        let (key, _) = doc.first()?;
        key.starts_with('$').then_some(key.as_str())
    }
}

impl TagResolver for SigilTag {
    fn resolve<'v>(&self, value: &'v Value, _ctx: &SerDesCtx<'_>) -> Option<Cow<'v, str>> {
        Self::tag_of(value).map(Cow::Borrowed)
    }
}

/// Tags table rows by the column types the response describes in its
/// `status.projectionSchema`, like:
///
/// ```json
/// { "name": { "type": "text" }, "tags": { "type": "set", "valueType": "uuid" } }
/// ```
///
/// Top-level fields take the column `type`. Elements of `list`, `set`, and
/// `map` columns take the column `valueType`. Everything else falls back to
/// [`SigilTag`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaTag;

const SCHEMA_POINTER: &str = "/status/projectionSchema";

impl SchemaTag {
    fn column<'a>(ctx: &SerDesCtx<'a>, name: &str) -> Option<&'a serde_json::Value> {
        ctx.raw()?.pointer(SCHEMA_POINTER)?.get(name)
    }

    fn column_tag<'a>(ctx: &SerDesCtx<'a>) -> Option<&'a str> {
        match ctx.path() {
            [PathSegment::Key(name)] => Self::column(ctx, name)?.get("type")?.as_str(),
            [PathSegment::Key(name), _] => {
                let column = Self::column(ctx, name)?;
                match column.get("type")?.as_str()? {
                    "list" | "set" | "map" => column.get("valueType")?.as_str(),
                    _ => None,
                }
            },
            _ => None,
        }
    }
}

impl TagResolver for SchemaTag {
    fn resolve<'v>(&self, value: &'v Value, ctx: &SerDesCtx<'_>) -> Option<Cow<'v, str>> {
        match Self::column_tag(ctx) {
            Some(tag) => Some(Cow::Owned(tag.to_owned())),
            None => SigilTag::tag_of(value).map(Cow::Borrowed),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ctx::Direction;

    #[test]
    fn sigil_single_key_only() {
        let ctx = SerDesCtx::new(Direction::Deserialize, false, None);
        let tagged = Value::from(json!({ "$date": 5 }));
        let two_keys = Value::from(json!({ "$date": 5, "x": 1 }));
        let plain = Value::from(json!({ "date": 5 }));

        assert_eq!(SigilTag.resolve(&tagged, &ctx).as_deref(), Some("$date"), "tagged");
        assert_eq!(SigilTag.resolve(&two_keys, &ctx), None, "two keys");
        assert_eq!(SigilTag.resolve(&plain, &ctx), None, "no sigil");
    }

    #[test]
    fn schema_columns_and_elements() {
        let raw = json!({
            "status": {
                "projectionSchema": {
                    "when": { "type": "duration" },
                    "ids": { "type": "list", "valueType": "uuid" },
                }
            }
        });

        let mut ctx = SerDesCtx::new(Direction::Deserialize, false, None).with_raw(Some(&raw));
        let value = Value::from("1d");

        ctx.push("when".into());
        assert_eq!(SchemaTag.resolve(&value, &ctx).as_deref(), Some("duration"), "column");
        ctx.pop();

        ctx.push("ids".into());
        ctx.push(0.into());
        assert_eq!(SchemaTag.resolve(&value, &ctx).as_deref(), Some("uuid"), "element");
        ctx.pop();
        ctx.pop();

        ctx.push("other".into());
        let blob = Value::from(json!({ "$binary": "AA==" }));
        assert_eq!(SchemaTag.resolve(&blob, &ctx).as_deref(), Some("$binary"), "fallback");
    }
}
