use std::fmt;

use crate::codec::Codec;
use crate::config::SerDesConfig;
use crate::ctx::{Direction, SerDesCtx};
use crate::error::{RegistrationError, Result};
use crate::key::KeyTransformer;
use crate::table::{CodecTable, Precedence};
use crate::tag::{SigilTag, TagResolver};
use crate::value::Value;
use crate::walk::Walker;
use crate::wire;

/// Converts documents between their application and wire forms.
///
/// Built once with a [`SerDesBuilder`] and then shared. Every call gets its
/// own [`SerDesCtx`], so a `SerDes` may be used from many threads at once.
///
/// # Examples
///
/// ```
/// use doc_serdes::{Codec, Document, SerDes, Signal, Value};
///
/// let serdes = SerDes::builder()
///     .codec(Codec::for_name("count").serialize(|_, value, _| {
///         Ok(Signal::done_with(value.as_i64().unwrap_or_default() * 2))
///     }))
///     .build()?;
///
/// let doc = Value::from(Document::from_iter([("count", 21)]));
/// let (wire, big_numbers) = serdes.serialize_record(&doc)?;
/// assert_eq!(wire.get("count"), Some(&Value::Int(42)));
/// assert!(!big_numbers);
/// # Ok::<(), doc_serdes::Error>(())
/// ```
pub struct SerDes {
    table: CodecTable,
    key_transformer: Option<Box<dyn KeyTransformer>>,
    tag_resolver: Box<dyn TagResolver>,
}

impl SerDes {
    pub fn builder() -> SerDesBuilder {
        SerDesBuilder::new()
    }

    fn walker(&self) -> Walker<'_> {
        Walker {
            table: &self.table,
            tags: &*self.tag_resolver,
        }
    }

    fn ctx(&self, direction: Direction, mutating_in_place: bool) -> SerDesCtx<'_> {
        SerDesCtx::new(direction, mutating_in_place, self.key_transformer.as_deref())
    }

    /// Serializes a copy of the document.
    ///
    /// Returns the wire document and whether it contains arbitrary-precision
    /// numbers. Only the levels the walk visits are copied. The rest stays
    /// shared with `doc`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`](crate::Error::Conversion) if a codec
    /// fails.
    pub fn serialize_record(&self, doc: &Value) -> Result<(Value, bool)> {
        if doc.is_null() {
            return Ok((Value::Null, false));
        }

        let mut out = doc.clone();
        let mut ctx = self.ctx(Direction::Serialize, false).with_root(doc);
        self.walker().walk(&mut out, &mut ctx)?;
        Ok((out, ctx.big_numbers_present()))
    }

    /// Serializes the document in place.
    ///
    /// Returns whether it now contains arbitrary-precision numbers. On error,
    /// the document is left partially converted, but no value is removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`](crate::Error::Conversion) if a codec
    /// fails.
    pub fn serialize_record_mut(&self, doc: &mut Value) -> Result<bool> {
        if doc.is_null() {
            return Ok(false);
        }

        let mut ctx = self.ctx(Direction::Serialize, true);
        self.walker().walk(doc, &mut ctx)?;
        Ok(ctx.big_numbers_present())
    }

    /// Deserializes a copy of the wire document.
    ///
    /// `raw` is the wire response the document was taken from, which codecs
    /// and tag resolvers may inspect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`](crate::Error::Conversion) if a codec
    /// fails.
    pub fn deserialize_record(
        &self,
        doc: &Value,
        raw: Option<&serde_json::Value>,
    ) -> Result<Value> {
        if doc.is_null() {
            return Ok(Value::Null);
        }

        let mut out = doc.clone();
        let mut ctx = self
            .ctx(Direction::Deserialize, false)
            .with_root(doc)
            .with_raw(raw);
        self.walker().walk(&mut out, &mut ctx)?;
        Ok(out)
    }

    /// Deserializes the wire document in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`](crate::Error::Conversion) if a codec
    /// fails.
    pub fn deserialize_record_mut(
        &self,
        doc: &mut Value,
        raw: Option<&serde_json::Value>,
    ) -> Result<()> {
        if doc.is_null() {
            return Ok(());
        }

        let mut ctx = self.ctx(Direction::Deserialize, true).with_raw(raw);
        self.walker().walk(doc, &mut ctx)
    }

    /// Serializes the document into a JSON request body.
    ///
    /// Big numbers are written with their exact digits if any were present.
    ///
    /// # Errors
    ///
    /// Returns an error if a codec fails or the result has no JSON form, see
    /// [`wire::encode`].
    pub fn serialize_body(&self, doc: &Value) -> Result<String> {
        let (out, big_numbers) = self.serialize_record(doc)?;
        wire::encode_body(&out, big_numbers)
    }

    /// Deserializes a document taken from a JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`](crate::Error::Conversion) if a codec
    /// fails.
    pub fn deserialize_body(
        &self,
        doc: &serde_json::Value,
        raw: Option<&serde_json::Value>,
    ) -> Result<Value> {
        let mut out = wire::decode(doc);
        self.deserialize_record_mut(&mut out, raw)?;
        Ok(out)
    }
}

impl fmt::Debug for SerDes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerDes")
            .field("table", &self.table)
            .field("key_transformer", &self.key_transformer.is_some())
            .finish_non_exhaustive()
    }
}

/// Builds a [`SerDes`].
///
/// Caller codecs are tried before built-in codecs that apply to the same key.
#[must_use]
pub struct SerDesBuilder {
    codecs: Vec<Codec>,
    builtins: Vec<Codec>,
    key_transformer: Option<Box<dyn KeyTransformer>>,
    tag_resolver: Option<Box<dyn TagResolver>>,
    precedence: Precedence,
}

impl Default for SerDesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SerDesBuilder {
    pub fn new() -> Self {
        Self {
            codecs: Vec::new(),
            builtins: Vec::new(),
            key_transformer: None,
            tag_resolver: None,
            precedence: Precedence::default(),
        }
    }

    /// Creates a builder set up as the configuration describes.
    pub fn from_config(config: &SerDesConfig) -> Self {
        let mut builder = Self::new()
            .precedence(config.precedence)
            .boxed_tag_resolver(config.tag_resolver());

        if let Some(keys) = config.key_transformer() {
            builder = builder.key_transformer(keys);
        }

        builder
    }

    /// Adds a caller codec.
    pub fn codec(mut self, codec: Codec) -> Self {
        self.codecs.push(codec);
        self
    }

    /// Adds caller codecs.
    pub fn codecs(mut self, codecs: impl IntoIterator<Item = Codec>) -> Self {
        self.codecs.extend(codecs);
        self
    }

    /// Adds built-in codecs, which are tried after every caller codec.
    pub fn builtins(mut self, codecs: impl IntoIterator<Item = Codec>) -> Self {
        self.builtins.extend(codecs);
        self
    }

    pub fn key_transformer<K: KeyTransformer + 'static>(mut self, keys: K) -> Self {
        self.key_transformer = Some(Box::new(keys));
        self
    }

    /// Sets how wire type tags are found. Defaults to [`SigilTag`].
    pub fn tag_resolver<T: TagResolver + 'static>(self, tags: T) -> Self {
        self.boxed_tag_resolver(Box::new(tags))
    }

    fn boxed_tag_resolver(mut self, tags: Box<dyn TagResolver>) -> Self {
        self.tag_resolver = Some(tags);
        self
    }

    pub fn precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// Builds the codec table and the [`SerDes`].
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] if a codec declaration is invalid.
    pub fn build(self) -> Result<SerDes, RegistrationError> {
        let codecs = self.codecs.into_iter().chain(self.builtins);
        let table = CodecTable::with_precedence(codecs, self.precedence)?;

        Ok(SerDes {
            table,
            key_transformer: self.key_transformer,
            tag_resolver: self.tag_resolver.unwrap_or_else(|| Box::new(SigilTag)),
        })
    }
}
