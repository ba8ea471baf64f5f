//! The compiled codec registry.
//!
//! Declarations are validated and normalized once, when the table is built.
//! Afterwards the table is immutable and shared by every call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec::{Codec, CodecDecl, CodecFn, SerializeGuard};
use crate::ctx::{Direction, SerDesCtx};
use crate::error::RegistrationError;
use crate::path::PathSegment;
use crate::signal::Signal;
use crate::value::Value;

/// A chain of handlers the walker looks up for every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    /// Handlers registered for the key's name.
    Name,
    /// Handlers registered for the key's full path.
    Path,
    /// Handlers registered for the value's wire type tag.
    Type,
    /// Handlers guarded by the value's application class.
    Class,
    /// Handlers guarded by a custom predicate.
    Guard,
}

impl ChainKind {
    const ALL: [Self; 5] = [Self::Name, Self::Path, Self::Type, Self::Class, Self::Guard];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Path => "path",
            Self::Type => "type",
            Self::Class => "class",
            Self::Guard => "guard",
        }
    }
}

/// The order in which the walker tries the chains for a key.
///
/// Chains are tried one after another until a handler returns something other
/// than [`Signal::Continue`]. The default is `name > path > type > class >
/// guard`.
///
/// Deserializes from a list of chain names, such as
/// `["path", "name", "type", "class", "guard"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ChainKind>", into = "Vec<ChainKind>")]
pub struct Precedence([ChainKind; 5]);

impl Default for Precedence {
    fn default() -> Self {
        Self(ChainKind::ALL)
    }
}

impl Precedence {
    /// Creates a precedence from an ordering of chains.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidPrecedence`] if the order does not
    /// list every [`ChainKind`] exactly once.
    pub fn new(order: impl IntoIterator<Item = ChainKind>) -> Result<Self, RegistrationError> {
        let order = order.into_iter().collect::<Vec<_>>();
        let invalid = || RegistrationError::InvalidPrecedence {
            precedence: format!("{order:?}"),
        };

        let array: [ChainKind; 5] = order.as_slice().try_into().map_err(|_| invalid())?;
        if ChainKind::ALL.iter().any(|k| !array.contains(k)) {
            return Err(invalid());
        }

        Ok(Self(array))
    }

    pub fn iter(&self) -> impl Iterator<Item = ChainKind> + '_ {
        self.0.iter().copied()
    }
}

impl TryFrom<Vec<ChainKind>> for Precedence {
    type Error = RegistrationError;

    fn try_from(value: Vec<ChainKind>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Precedence> for Vec<ChainKind> {
    fn from(value: Precedence) -> Self {
        value.0.to_vec()
    }
}

impl fmt::Display for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in self.iter().enumerate() {
            if i != 0 {
                f.write_str(" > ")?;
            }
            f.write_str(kind.as_str())?;
        }
        Ok(())
    }
}

/// Wraps a serialize action so that it only runs when the guard accepts the
/// value, and declines otherwise.
fn normalize(guard: SerializeGuard, action: CodecFn) -> CodecFn {
    match guard {
        SerializeGuard::Class(class) => Arc::new(
            move |key: &PathSegment, value: &Value, ctx: &mut SerDesCtx<'_>| {
                if value.is_instance_of(class) {
                    action(key, value, ctx)
                } else {
                    Ok(Signal::next())
                }
            },
        ),
        SerializeGuard::Custom(guard) => Arc::new(
            move |key: &PathSegment, value: &Value, ctx: &mut SerDesCtx<'_>| {
                if guard(value, ctx) {
                    action(key, value, ctx)
                } else {
                    Ok(Signal::next())
                }
            },
        ),
    }
}

/// The handlers of one direction.
#[derive(Default)]
pub(crate) struct Chains {
    by_name: HashMap<String, Vec<CodecFn>>,
    by_path: Vec<(Vec<PathSegment>, Vec<CodecFn>)>,
    by_type: HashMap<String, Vec<CodecFn>>,
    class_guards: Vec<CodecFn>,
    custom_guards: Vec<CodecFn>,
}

impl Chains {
    fn add_name(&mut self, name: &str, handler: Option<CodecFn>) {
        if let Some(handler) = handler {
            self.by_name.entry(name.to_owned()).or_default().push(handler);
        }
    }

    fn add_path(&mut self, path: &[PathSegment], handler: Option<CodecFn>) {
        let Some(handler) = handler else {
            return;
        };

        match self.by_path.iter_mut().find(|(p, _)| p == path) {
            Some((_, handlers)) => handlers.push(handler),
            None => self.by_path.push((path.to_vec(), vec![handler])),
        }
    }

    fn add_type(&mut self, tag: &str, handler: Option<CodecFn>) {
        if let Some(handler) = handler {
            self.by_type.entry(tag.to_owned()).or_default().push(handler);
        }
    }

    fn add_guarded(&mut self, guard: SerializeGuard, action: CodecFn) {
        let list = match guard {
            SerializeGuard::Class(_) => &mut self.class_guards,
            SerializeGuard::Custom(_) => &mut self.custom_guards,
        };
        list.push(normalize(guard, action));
    }

    /// Gets the handlers of a chain that apply to the current key.
    ///
    /// `key` is the current key, `path` the full path including it, and `tag`
    /// the wire type tag of the value, if it has one.
    pub(crate) fn chain<'t>(
        &'t self,
        kind: ChainKind,
        key: &PathSegment,
        path: &[PathSegment],
        tag: Option<&str>,
    ) -> impl Iterator<Item = &'t CodecFn> + use<'t> {
        let list: &[CodecFn] = match kind {
            ChainKind::Name => key
                .as_key()
                .and_then(|k| self.by_name.get(k))
                .map_or(&[][..], Vec::as_slice),
            ChainKind::Path => self
                .by_path
                .iter()
                .find(|(p, _)| p.as_slice() == path)
                .map_or(&[][..], |(_, h)| h.as_slice()),
            ChainKind::Type => tag
                .and_then(|t| self.by_type.get(t))
                .map_or(&[][..], Vec::as_slice),
            ChainKind::Class => &self.class_guards,
            ChainKind::Guard => &self.custom_guards,
        };

        list.iter()
    }

    fn summary(&self) -> String {
        format!(
            "{} names, {} paths, {} types, {} classes, {} guards",
            self.by_name.len(),
            self.by_path.len(),
            self.by_type.len(),
            self.class_guards.len(),
            self.custom_guards.len(),
        )
    }
}

/// The compiled registry of codec handlers, split by direction.
///
/// Built once from an ordered list of declarations. Declarations targeting the
/// same name, path, or type accumulate and are tried in registration order.
pub struct CodecTable {
    ser: Chains,
    de: Chains,
    precedence: Precedence,
}

impl CodecTable {
    /// Builds a table with the default precedence.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] for the first invalid declaration.
    pub fn new(codecs: impl IntoIterator<Item = Codec>) -> Result<Self, RegistrationError> {
        Self::with_precedence(codecs, Precedence::default())
    }

    /// Builds a table that tries chains in the given order.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] for the first invalid declaration.
    pub fn with_precedence(
        codecs: impl IntoIterator<Item = Codec>,
        precedence: Precedence,
    ) -> Result<Self, RegistrationError> {
        let mut ser = Chains::default();
        let mut de = Chains::default();

        for codec in codecs {
            match CodecDecl::try_from(codec)? {
                CodecDecl::Name {
                    name,
                    serialize,
                    deserialize,
                } => {
                    ser.add_name(&name, serialize);
                    de.add_name(&name, deserialize);
                },
                CodecDecl::Path {
                    path,
                    serialize,
                    deserialize,
                } => {
                    ser.add_path(&path, serialize);
                    de.add_path(&path, deserialize);
                },
                CodecDecl::Type { tag, deserialize } => {
                    de.add_type(&tag, Some(deserialize));
                },
                CodecDecl::Guarded {
                    tag,
                    guard,
                    serialize,
                    deserialize,
                } => {
                    ser.add_guarded(guard, serialize);
                    de.add_type(&tag, deserialize);
                },
            }
        }

        log::debug!(
            "Built codec table ({precedence}). Serialize: {}. Deserialize: {}.",
            ser.summary(),
            de.summary(),
        );

        Ok(Self {
            ser,
            de,
            precedence,
        })
    }

    /// Builds a table without any codecs.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ser: Chains::default(),
            de: Chains::default(),
            precedence: Precedence::default(),
        }
    }

    pub fn precedence(&self) -> Precedence {
        self.precedence
    }

    pub(crate) fn chains(&self, direction: Direction) -> &Chains {
        match direction {
            Direction::Serialize => &self.ser,
            Direction::Deserialize => &self.de,
        }
    }
}

impl fmt::Debug for CodecTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecTable")
            .field("ser", &format_args!("{}", self.ser.summary()))
            .field("de", &format_args!("{}", self.de.summary()))
            .field("precedence", &format_args!("{}", self.precedence))
            .finish()
    }
}
