//! The recursive tree walker.
//!
//! For every key of every container visited, the walker runs the handler
//! chains in precedence order until one handler settles the value, renames the
//! key if a transformer wants it, and descends into containers that weren't
//! finalized.

use std::borrow::Cow;
use std::mem;

use crate::ctx::{Direction, SerDesCtx};
use crate::error::{Error, Result};
use crate::key::KeyTransformer;
use crate::path::{KeyPath, PathSegment};
use crate::signal::{PostMap, Signal};
use crate::table::{ChainKind, CodecTable};
use crate::tag::TagResolver;
use crate::value::{Array, Document, Map, Value};

/// The deepest level at which containers are still descended into.
///
/// Values nested deeper than this are left as they are.
pub const MAX_DEPTH: usize = 250;

/// How the handler chains settled a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Done,
    Recurse,
    Pass,
}

pub(crate) struct Walker<'t> {
    pub table: &'t CodecTable,
    pub tags: &'t dyn TagResolver,
}

impl Walker<'_> {
    /// Converts the document as the value of a synthetic root key `""` with
    /// an empty path.
    ///
    /// Values stay in their slot while handlers run, so a failed walk leaves
    /// the document partially converted but never loses a value.
    pub fn walk(&self, root: &mut Value, ctx: &mut SerDesCtx<'_>) -> Result<()> {
        let key = PathSegment::Key(String::new());
        let mut post = Vec::new();

        let verdict = self.run_chains(&key, root, &mut post, ctx)?;
        self.finish(verdict, root, post, ctx)
    }

    fn run_chains(
        &self,
        key: &PathSegment,
        slot: &mut Value,
        post: &mut Vec<PostMap>,
        ctx: &mut SerDesCtx<'_>,
    ) -> Result<Verdict> {
        let direction = ctx.direction();
        let chains = self.table.chains(direction);

        for kind in self.table.precedence().iter() {
            // resolved per chain since earlier handlers may have replaced the value
            let tag = match (kind, direction) {
                (ChainKind::Type, Direction::Deserialize) => {
                    self.tags.resolve(slot, ctx).map(Cow::into_owned)
                },
                _ => None,
            };

            for handler in chains.chain(kind, key, ctx.path(), tag.as_deref()) {
                let signal =
                    handler(key, slot, ctx).map_err(|e| Error::conversion(ctx.path(), e))?;

                match signal {
                    Signal::Done(replace) => {
                        replace_with(slot, replace);
                        return Ok(Verdict::Done);
                    },
                    Signal::Recurse(replace) => {
                        replace_with(slot, replace);
                        return Ok(Verdict::Recurse);
                    },
                    Signal::Continue(replace) => replace_with(slot, replace),
                    Signal::MapAfter(map) => post.push(map),
                }
            }
        }

        Ok(Verdict::Pass)
    }

    fn finish(
        &self,
        verdict: Verdict,
        slot: &mut Value,
        post: Vec<PostMap>,
        ctx: &mut SerDesCtx<'_>,
    ) -> Result<()> {
        let descend = verdict != Verdict::Done && ctx.depth() < MAX_DEPTH;

        if ctx.direction() == Direction::Serialize && !ctx.big_numbers_present() {
            // values that won't be visited key by key are searched as a whole
            let found = if descend {
                matches!(slot, Value::BigNumber(_))
            } else {
                contains_big_number(slot)
            };

            if found {
                ctx.mark_big_numbers();
            }
        }

        if descend {
            match slot {
                Value::Object(doc) => self.walk_document(doc, ctx)?,
                Value::Array(arr) => self.walk_array(arr, ctx)?,
                _ => {},
            }
        } else if verdict != Verdict::Done && slot.is_container() {
            log::trace!(
                "Depth bound reached at `{}`, leaving the value untransformed.",
                KeyPath::from(ctx.path())
            );
        }

        for map in post.into_iter().rev() {
            *slot = map(slot.clone()).map_err(|e| Error::conversion(ctx.path(), e))?;
        }

        Ok(())
    }

    fn walk_document(&self, doc: &mut Document, ctx: &mut SerDesCtx<'_>) -> Result<()> {
        ctx.descend();

        let transformer = ctx
            .key_transformer()
            .filter(|t| t.should_descend_into(ctx));

        let map = doc.make_mut();
        let mut renames = Vec::new();

        // last to first, so a key is never visited twice or skipped
        for (index, (key, slot)) in map.iter_mut().enumerate().rev() {
            let segment = PathSegment::Key(key.clone());
            ctx.push(segment.clone());

            let mut post = Vec::new();
            let verdict = self.run_chains(&segment, slot, &mut post, ctx)?;

            if let Some(transformer) = transformer
                && let Cow::Owned(new_key) = rename(transformer, key, ctx)
                && new_key != *key
            {
                renames.push((index, new_key));
            }

            self.finish(verdict, slot, post, ctx)?;
            ctx.pop();
        }

        if !renames.is_empty() {
            apply_renames(map, renames);
        }

        ctx.ascend();
        Ok(())
    }

    fn walk_array(&self, arr: &mut Array, ctx: &mut SerDesCtx<'_>) -> Result<()> {
        ctx.descend();

        for (index, slot) in arr.make_mut().iter_mut().enumerate().rev() {
            let segment = PathSegment::Index(index);
            ctx.push(segment.clone());

            let mut post = Vec::new();
            let verdict = self.run_chains(&segment, slot, &mut post, ctx)?;
            self.finish(verdict, slot, post, ctx)?;

            ctx.pop();
        }

        ctx.ascend();
        Ok(())
    }
}

fn replace_with(slot: &mut Value, replace: Option<Value>) {
    if let Some(value) = replace {
        *slot = value;
    }
}

/// Searches a value and everything nested in it for a big number.
fn contains_big_number(value: &Value) -> bool {
    let mut stack = vec![value];
    while let Some(value) = stack.pop() {
        match value {
            Value::BigNumber(_) => return true,
            Value::Object(doc) => stack.extend(doc.values()),
            Value::Array(arr) => stack.extend(arr.iter()),
            _ => {},
        }
    }

    false
}

fn rename<'k>(
    transformer: &dyn KeyTransformer,
    key: &'k str,
    ctx: &SerDesCtx<'_>,
) -> Cow<'k, str> {
    match ctx.direction() {
        Direction::Serialize => transformer.serialize_key(key, ctx),
        Direction::Deserialize => transformer.deserialize_key(key, ctx),
    }
}

/// Replaces keys by position, keeping the order of the map.
///
/// `renames` is in descending index order, as collected by the walk.
fn apply_renames(map: &mut Map, mut renames: Vec<(usize, String)>) {
    renames.reverse();
    let mut renames = renames.into_iter().peekable();

    let old = mem::take(map);
    map.reserve(old.len());

    for (index, (key, value)) in old.into_iter().enumerate() {
        let key = match renames.next_if(|(i, _)| *i == index) {
            Some((_, new_key)) => new_key,
            None => key,
        };

        map.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renames_keep_order() {
        let mut map = [("a", 1), ("bC", 2), ("d", 3), ("eF", 4)]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), Value::Int(v)))
            .collect::<Map>();

        apply_renames(&mut map, vec![(3, "e_f".to_owned()), (1, "b_c".to_owned())]);

        let keys = map.keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(keys, ["a", "b_c", "d", "e_f"], "renamed in place");
        assert_eq!(map.get("e_f"), Some(&Value::Int(4)), "value moved along");
    }

    #[test]
    fn big_numbers_found_when_nested() {
        let big = Value::BigNumber(bigdecimal::BigDecimal::from(7));
        let inner = [("deep", big)].into_iter().collect::<Document>();
        let nested = Value::from(vec![Value::Int(1), Value::from(inner)]);

        assert!(contains_big_number(&nested), "inside array and object");
        assert!(!contains_big_number(&Value::from(vec![Value::Float(1.5)])), "floats only");
    }
}
