//! Codec declarations.
//!
//! A [`Codec`] is a conversion rule for a field name, a path, or a wire type
//! tag, optionally guarded for serialization by an application class or a
//! custom predicate. It is assembled builder-style and only checked once it is
//! registered to a [`CodecTable`](crate::table::CodecTable), which turns it
//! into a [`CodecDecl`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::ctx::SerDesCtx;
use crate::error::RegistrationError;
use crate::path::PathSegment;
use crate::signal::Signal;
use crate::value::{Class, Value};

/// A serialize or deserialize action.
///
/// Receives the current key, its value, and the walk context.
pub type CodecFn =
    Arc<dyn Fn(&PathSegment, &Value, &mut SerDesCtx<'_>) -> anyhow::Result<Signal> + Send + Sync>;

/// A custom serialization guard.
pub type GuardFn = Arc<dyn Fn(&Value, &SerDesCtx<'_>) -> bool + Send + Sync>;

/// A codec declaration, as written by a user or library.
///
/// # Examples
///
/// ```
/// use doc_serdes::{Codec, Signal};
///
/// // store `secret` fields reversed on the wire
/// let codec = Codec::for_name("secret")
///     .serialize(|_, value, _| {
///         let s = value.as_str().unwrap_or_default();
///         Ok(Signal::done_with(s.chars().rev().collect::<String>()))
///     })
///     .deserialize(|_, value, _| {
///         let s = value.as_str().unwrap_or_default();
///         Ok(Signal::done_with(s.chars().rev().collect::<String>()))
///     });
/// # _ = codec;
/// ```
#[derive(Clone, Default)]
#[must_use]
pub struct Codec {
    name: Option<String>,
    path: Option<Vec<PathSegment>>,
    tag: Option<String>,
    class: Option<Class>,
    guard: Option<GuardFn>,
    serialize: Option<CodecFn>,
    deserialize: Option<CodecFn>,
}

impl Codec {
    /// Creates an empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a declaration applying to every field with this name.
    pub fn for_name(name: impl Into<String>) -> Self {
        Self::new().name(name)
    }

    /// Creates a declaration applying to the value at exactly this path.
    ///
    /// The empty path refers to the document itself.
    pub fn for_path<I>(path: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PathSegment>,
    {
        Self::new().path(path)
    }

    /// Creates a declaration applying to wire values with this type tag.
    pub fn for_type(tag: impl Into<String>) -> Self {
        Self::new().tag(tag)
    }

    /// Creates a declaration for wire values with this type tag which
    /// serializes application values of type `T`.
    pub fn for_class<T: Any>(tag: impl Into<String>) -> Self {
        Self::new().tag(tag).serialize_class::<T>()
    }

    /// Creates a declaration for wire values with this type tag which
    /// serializes values accepted by `guard`.
    pub fn for_guard<G>(tag: impl Into<String>, guard: G) -> Self
    where
        G: Fn(&Value, &SerDesCtx<'_>) -> bool + Send + Sync + 'static,
    {
        Self::new().tag(tag).serialize_guard(guard)
    }

    /// Sets the field name this applies to.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the path this applies to.
    pub fn path<I>(mut self, path: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PathSegment>,
    {
        self.path = Some(path.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the wire type tag this applies to.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Guards serialization to application values of type `T`.
    pub fn serialize_class<T: Any>(mut self) -> Self {
        self.class = Some(Class::of::<T>());
        self
    }

    /// Guards serialization with a custom predicate.
    pub fn serialize_guard<G>(mut self, guard: G) -> Self
    where
        G: Fn(&Value, &SerDesCtx<'_>) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Sets the serialize action.
    pub fn serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&PathSegment, &Value, &mut SerDesCtx<'_>) -> anyhow::Result<Signal>
            + Send
            + Sync
            + 'static,
    {
        self.serialize = Some(Arc::new(f));
        self
    }

    /// Sets the serialize action for application values of type `T`.
    ///
    /// Other values are declined with [`Signal::next`].
    pub fn serialize_as<T, F>(self, f: F) -> Self
    where
        T: Any,
        F: Fn(&T, &mut SerDesCtx<'_>) -> anyhow::Result<Signal> + Send + Sync + 'static,
    {
        self.serialize(move |_, value, ctx| match value.downcast_ref::<T>() {
            Some(value) => f(value, ctx),
            None => Ok(Signal::next()),
        })
    }

    /// Sets the deserialize action.
    pub fn deserialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&PathSegment, &Value, &mut SerDesCtx<'_>) -> anyhow::Result<Signal>
            + Send
            + Sync
            + 'static,
    {
        self.deserialize = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for Codec {
    // prints like the declaration would be written, f.e. `{ name: "when", serialize }`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut sep = |f: &mut fmt::Formatter<'_>| {
            let s = if first { " " } else { ", " };
            first = false;
            f.write_str(s)
        };

        f.write_str("{")?;
        if let Some(name) = &self.name {
            sep(f)?;
            write!(f, "name: {name:?}")?;
        }
        if let Some(path) = &self.path {
            sep(f)?;
            write!(f, "path: {path:?}")?;
        }
        if let Some(tag) = &self.tag {
            sep(f)?;
            write!(f, "type: {tag:?}")?;
        }
        if let Some(class) = &self.class {
            sep(f)?;
            write!(f, "serialize_class: {}", class.name())?;
        }
        if self.guard.is_some() {
            sep(f)?;
            f.write_str("serialize_guard")?;
        }
        if self.serialize.is_some() {
            sep(f)?;
            f.write_str("serialize")?;
        }
        if self.deserialize.is_some() {
            sep(f)?;
            f.write_str("deserialize")?;
        }
        f.write_str(if first { "}" } else { " }" })
    }
}

/// How a type codec guards serialization.
#[derive(Clone)]
pub enum SerializeGuard {
    Class(Class),
    Custom(GuardFn),
}

impl fmt::Debug for SerializeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => f.debug_tuple("Class").field(&class.name()).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A validated codec declaration.
#[derive(Clone)]
#[non_exhaustive]
pub enum CodecDecl {
    /// Applies to every field with this name.
    Name {
        name: String,
        serialize: Option<CodecFn>,
        deserialize: Option<CodecFn>,
    },
    /// Applies to the value at exactly this path.
    Path {
        path: Vec<PathSegment>,
        serialize: Option<CodecFn>,
        deserialize: Option<CodecFn>,
    },
    /// Deserializes wire values with this type tag.
    Type { tag: String, deserialize: CodecFn },
    /// Serializes guarded values and optionally deserializes wire values with
    /// this type tag.
    Guarded {
        tag: String,
        guard: SerializeGuard,
        serialize: CodecFn,
        deserialize: Option<CodecFn>,
    },
}

impl TryFrom<Codec> for CodecDecl {
    type Error = RegistrationError;

    fn try_from(codec: Codec) -> Result<Self, Self::Error> {
        let described = || format!("{codec:?}");

        let discriminant = match (&codec.name, &codec.path, &codec.tag) {
            (None, None, None) => {
                return Err(RegistrationError::MissingDiscriminant { codec: described() });
            },
            (Some(name), None, None) => Discriminant::Name(name.clone()),
            (None, Some(path), None) => Discriminant::Path(path.clone()),
            (None, None, Some(tag)) => Discriminant::Tag(tag.clone()),
            _ => {
                return Err(RegistrationError::AmbiguousDiscriminant { codec: described() });
            },
        };

        let guard = match (codec.class, &codec.guard) {
            (Some(_), Some(_)) => {
                return Err(RegistrationError::ConflictingGuards { codec: described() });
            },
            (Some(class), None) => Some(SerializeGuard::Class(class)),
            (None, Some(guard)) => Some(SerializeGuard::Custom(Arc::clone(guard))),
            (None, None) => None,
        };

        let serialize = codec.serialize.clone();
        let deserialize = codec.deserialize.clone();

        let tag = match discriminant {
            Discriminant::Tag(tag) => tag,
            _ if guard.is_some() => {
                return Err(RegistrationError::GuardWithoutType { codec: described() });
            },
            _ if serialize.is_none() && deserialize.is_none() => {
                return Err(RegistrationError::MissingAction { codec: described() });
            },
            Discriminant::Name(name) => {
                return Ok(Self::Name {
                    name,
                    serialize,
                    deserialize,
                });
            },
            Discriminant::Path(path) => {
                return Ok(Self::Path {
                    path,
                    serialize,
                    deserialize,
                });
            },
        };

        if tag.is_empty() {
            return Err(RegistrationError::EmptyTag { codec: described() });
        }

        match (guard, serialize, deserialize) {
            (Some(guard), Some(serialize), deserialize) => Ok(Self::Guarded {
                tag,
                guard,
                serialize,
                deserialize,
            }),
            (Some(_), None, _) => Err(RegistrationError::MissingSerialize { codec: described() }),
            (None, Some(_), _) => Err(RegistrationError::MissingGuard { codec: described() }),
            (None, None, Some(deserialize)) => Ok(Self::Type { tag, deserialize }),
            (None, None, None) => Err(RegistrationError::MissingAction { codec: described() }),
        }
    }
}

/// What a declaration applies to.
enum Discriminant {
    Name(String),
    Path(Vec<PathSegment>),
    Tag(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> impl Fn(&PathSegment, &Value, &mut SerDesCtx<'_>) -> anyhow::Result<Signal> {
        |_, _, _| Ok(Signal::next())
    }

    #[derive(Debug, PartialEq)]
    struct Thing;

    fn reject(codec: Codec) -> RegistrationError {
        match CodecDecl::try_from(codec) {
            Ok(_) => panic!("declaration must be rejected"),
            Err(err) => err,
        }
    }

    #[test]
    fn missing_discriminant() {
        let err = reject(Codec::new().serialize(noop()));
        assert!(
            matches!(err, RegistrationError::MissingDiscriminant { .. }),
            "{err:?}"
        );

        let msg = err.to_string();
        assert!(msg.contains("{ serialize }"), "names the declaration: {msg}");
        assert!(msg.contains("`name`"), "names the missing property: {msg}");
        assert!(msg.contains("expected one of"), "lists the shapes: {msg}");
    }

    #[test]
    fn ambiguous_discriminant() {
        let err = reject(Codec::for_name("a").path(["a"]).serialize(noop()));
        assert!(
            matches!(err, RegistrationError::AmbiguousDiscriminant { .. }),
            "{err:?}"
        );
    }

    #[test]
    fn guard_shapes() {
        let both = Codec::for_class::<Thing>("thing")
            .serialize_guard(|_, _| true)
            .serialize(noop());
        assert!(
            matches!(reject(both), RegistrationError::ConflictingGuards { .. }),
            "class and guard"
        );

        let neither = Codec::for_type("thing").serialize(noop());
        assert!(
            matches!(reject(neither), RegistrationError::MissingGuard { .. }),
            "serialize without guard"
        );

        let no_action = Codec::for_class::<Thing>("thing").deserialize(noop());
        assert!(
            matches!(reject(no_action), RegistrationError::MissingSerialize { .. }),
            "guard without serialize"
        );

        let on_name = Codec::for_name("a").serialize_class::<Thing>().serialize(noop());
        assert!(
            matches!(reject(on_name), RegistrationError::GuardWithoutType { .. }),
            "guard on a name codec"
        );
    }

    #[test]
    fn missing_actions_and_tags() {
        assert!(
            matches!(reject(Codec::for_name("a")), RegistrationError::MissingAction { .. }),
            "name without actions"
        );
        assert!(
            matches!(reject(Codec::for_type("t")), RegistrationError::MissingAction { .. }),
            "type without actions"
        );
        assert!(
            matches!(
                reject(Codec::for_type("").deserialize(noop())),
                RegistrationError::EmptyTag { .. }
            ),
            "empty tag"
        );
    }

    #[test]
    fn accepted_shapes() {
        let decls = [
            Codec::for_name("a").serialize(noop()),
            Codec::for_path(["a", "b"]).deserialize(noop()),
            Codec::for_path(Vec::<PathSegment>::new()).serialize(noop()),
            Codec::for_type("$t").deserialize(noop()),
            Codec::for_class::<Thing>("t").serialize(noop()),
            Codec::for_guard("t", |v, _| v.is_null())
                .serialize(noop())
                .deserialize(noop()),
        ];

        for codec in decls {
            let desc = format!("{codec:?}");
            if let Err(err) = CodecDecl::try_from(codec) {
                panic!("should accept {desc}: {err}");
            }
        }
    }

    #[test]
    fn debug_like_declaration() {
        let codec = Codec::for_name("when").serialize(noop()).deserialize(noop());
        assert_eq!(
            format!("{codec:?}"),
            r#"{ name: "when", serialize, deserialize }"#,
            "debug format"
        );
        assert_eq!(format!("{:?}", Codec::new()), "{}", "empty");
    }
}
