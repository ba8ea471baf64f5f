//! Key renaming applied while walking a document.

use std::borrow::Cow;

use dashmap::DashMap;

use crate::ctx::SerDesCtx;

/// Renames document keys during a walk, e.g. to translate between field naming
/// conventions.
///
/// When this is called, the last segment of [`SerDesCtx::path`] is the key
/// being renamed.
pub trait KeyTransformer: Send + Sync {
    /// Maps an application key to its wire form.
    fn serialize_key<'k>(&self, key: &'k str, ctx: &SerDesCtx<'_>) -> Cow<'k, str>;

    /// Maps a wire key to its application form.
    fn deserialize_key<'k>(&self, key: &'k str, ctx: &SerDesCtx<'_>) -> Cow<'k, str>;

    /// Whether keys of the container at the current depth should be renamed.
    ///
    /// By default, only the document's own fields are renamed.
    fn should_descend_into(&self, ctx: &SerDesCtx<'_>) -> bool {
        ctx.depth() <= 1
    }
}

// the mapping only depends on the key, so it is memoized. field names are a
// small set in practice, but the caches stop growing past this size anyways.
const CACHE_LIMIT: usize = 0x1000;

/// Translates `camelCase` application keys to `snake_case` wire keys and back.
///
/// The id field (`_id` by default) and keys starting with `$` are passed
/// through unchanged.
///
/// # Examples
///
/// ```
/// use doc_serdes::key::Camel2SnakeCase;
///
/// let keys = Camel2SnakeCase::new();
/// assert_eq!(keys.to_snake("createdAt"), "created_at");
/// assert_eq!(keys.to_camel("created_at"), "createdAt");
/// ```
#[derive(Debug)]
pub struct Camel2SnakeCase {
    id_field: Option<String>,
    transform_nested: bool,
    to_snake: DashMap<String, String>,
    to_camel: DashMap<String, String>,
}

impl Default for Camel2SnakeCase {
    fn default() -> Self {
        Self::new()
    }
}

impl Camel2SnakeCase {
    /// Creates a transformer that excepts `_id` and only renames top-level
    /// fields.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id_field: Some("_id".to_owned()),
            transform_nested: false,
            to_snake: DashMap::new(),
            to_camel: DashMap::new(),
        }
    }

    /// Sets the id field passed through unchanged, or none at all.
    #[must_use]
    pub fn id_field(mut self, id_field: Option<String>) -> Self {
        self.id_field = id_field;
        self
    }

    /// Sets whether keys of nested objects are renamed too.
    #[must_use]
    pub fn transform_nested(mut self, transform_nested: bool) -> Self {
        self.transform_nested = transform_nested;
        self
    }

    fn is_excepted(&self, key: &str) -> bool {
        key.starts_with('$') || self.id_field.as_deref() == Some(key)
    }

    /// Converts a key to `snake_case`, unless it is excepted.
    pub fn to_snake<'k>(&self, key: &'k str) -> Cow<'k, str> {
        if self.is_excepted(key) || !key.bytes().any(|c| c.is_ascii_uppercase()) {
            return Cow::Borrowed(key);
        }

        Cow::Owned(cached(&self.to_snake, key, camel_to_snake))
    }

    /// Converts a key to `camelCase`, unless it is excepted.
    pub fn to_camel<'k>(&self, key: &'k str) -> Cow<'k, str> {
        if self.is_excepted(key) || !key.contains('_') {
            return Cow::Borrowed(key);
        }

        Cow::Owned(cached(&self.to_camel, key, snake_to_camel))
    }
}

impl KeyTransformer for Camel2SnakeCase {
    fn serialize_key<'k>(&self, key: &'k str, _ctx: &SerDesCtx<'_>) -> Cow<'k, str> {
        self.to_snake(key)
    }

    fn deserialize_key<'k>(&self, key: &'k str, _ctx: &SerDesCtx<'_>) -> Cow<'k, str> {
        self.to_camel(key)
    }

    fn should_descend_into(&self, ctx: &SerDesCtx<'_>) -> bool {
        self.transform_nested || ctx.depth() <= 1
    }
}

fn cached(cache: &DashMap<String, String>, key: &str, map: fn(&str) -> String) -> String {
    if let Some(hit) = cache.get(key) {
        return hit.value().clone();
    }

    let value = map(key);
    if cache.len() < CACHE_LIMIT {
        cache.insert(key.to_owned(), value.clone());
    } else {
        log::trace!("Key cache is full, not caching `{key}`.");
    }

    value
}

/// Inserts `_` before every ASCII uppercase letter and lowercases it.
fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Removes every `_` that precedes an ASCII lowercase letter and uppercases
/// that letter.
fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(next) if c == '_' && next.is_ascii_lowercase() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            },
            _ => out.push(c),
        }
    }
    out
}
