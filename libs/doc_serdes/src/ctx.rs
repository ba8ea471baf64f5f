use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use smallvec::SmallVec;

use crate::key::KeyTransformer;
use crate::path::PathSegment;
use crate::value::Value;

/// Which way a walk converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Application document to wire document.
    Serialize,
    /// Wire document to application document.
    Deserialize,
}

/// Per-call state threaded through a walk.
///
/// A new context is created for every top-level call and dropped when it
/// returns. Codec handlers and key transformers receive it to inspect where in
/// the document they are and to keep call-scoped caches in
/// [`custom state`](Self::state_or_insert_with).
pub struct SerDesCtx<'a> {
    direction: Direction,
    root: Option<&'a Value>,
    raw: Option<&'a serde_json::Value>,
    key_transformer: Option<&'a dyn KeyTransformer>,
    path: SmallVec<[PathSegment; 8]>,
    depth: usize,
    mutating_in_place: bool,
    big_numbers_present: bool,
    custom_state: HashMap<String, Box<dyn Any>>,
}

impl<'a> SerDesCtx<'a> {
    pub(crate) fn new(
        direction: Direction,
        mutating_in_place: bool,
        key_transformer: Option<&'a dyn KeyTransformer>,
    ) -> Self {
        Self {
            direction,
            root: None,
            raw: None,
            key_transformer,
            path: SmallVec::new(),
            depth: 0,
            mutating_in_place,
            big_numbers_present: false,
            custom_state: HashMap::new(),
        }
    }

    #[must_use]
    pub(crate) fn with_root(mut self, root: &'a Value) -> Self {
        self.root = Some(root);
        self
    }

    #[must_use]
    pub(crate) fn with_raw(mut self, raw: Option<&'a serde_json::Value>) -> Self {
        self.raw = raw;
        self
    }

    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// The document as it was passed to the call.
    ///
    /// This is [`None`] when the walk mutates in place, since the root is
    /// then being mutated.
    pub const fn root(&self) -> Option<&'a Value> {
        self.root
    }

    /// The raw wire envelope passed to a deserialize call, if any.
    ///
    /// This allows inspecting response metadata that isn't part of the
    /// document itself.
    pub const fn raw(&self) -> Option<&'a serde_json::Value> {
        self.raw
    }

    pub fn key_transformer(&self) -> Option<&'a dyn KeyTransformer> {
        self.key_transformer
    }

    /// The path to the key currently being converted.
    ///
    /// The last segment is the current key. It is empty for the document
    /// itself.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// How many containers deep the current key is. The document's own
    /// fields are at depth 1.
    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub const fn mutating_in_place(&self) -> bool {
        self.mutating_in_place
    }

    /// Whether an arbitrary-precision number was seen so far.
    pub const fn big_numbers_present(&self) -> bool {
        self.big_numbers_present
    }

    /// Records that the output contains an arbitrary-precision number.
    pub fn mark_big_numbers(&mut self) {
        self.big_numbers_present = true;
    }

    /// Gets a custom state value, if one of type `T` is stored for the key.
    pub fn state<T: Any>(&self, key: &str) -> Option<&T> {
        self.custom_state.get(key)?.downcast_ref()
    }

    /// Gets a mutable custom state value, if one of type `T` is stored for the
    /// key.
    pub fn state_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.custom_state.get_mut(key)?.downcast_mut()
    }

    /// Gets the custom state value for the key, first replacing it with
    /// `init()` if it is missing or holds another type.
    ///
    /// Like [`state_mut`](Self::state_mut), the value is only reachable as
    /// `dyn Any`, so the typed access is an [`Option`]. It is [`Some`] for every
    /// `T` since the slot was just made to hold a `T`.
    pub fn state_or_insert_with<T: Any>(
        &mut self,
        key: &str,
        init: impl FnOnce() -> T,
    ) -> Option<&mut T> {
        let slot = match self.custom_state.entry(key.to_owned()) {
            Entry::Occupied(entry) => {
                let slot = entry.into_mut();
                if !slot.is::<T>() {
                    *slot = Box::new(init());
                }
                slot
            },
            Entry::Vacant(entry) => entry.insert(Box::new(init())),
        };

        slot.downcast_mut()
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.path.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.path.pop();
    }

    pub(crate) fn descend(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn ascend(&mut self) {
        self.depth -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_state_replaces_mismatched_type() {
        let mut ctx = SerDesCtx::new(Direction::Serialize, false, None);

        *ctx.state_or_insert_with("count", || 0u32).expect("u32 slot") += 2;
        assert_eq!(ctx.state::<u32>("count"), Some(&2), "same type keeps value");

        let s = ctx
            .state_or_insert_with("count", String::new)
            .expect("replaced with a string slot");
        s.push('x');
        assert_eq!(ctx.state::<u32>("count"), None, "old type is gone");
        assert_eq!(ctx.state::<String>("count").map(String::as_str), Some("x"), "new type stored");
    }
}
