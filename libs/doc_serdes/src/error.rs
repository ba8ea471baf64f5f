//! Error handling types.

use crate::path::KeyPath;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The declaration shapes a [`CodecTable`](crate::table::CodecTable) accepts.
pub const ACCEPTED_SHAPES: &str = "{ name, serialize?, deserialize? }, \
    { path, serialize?, deserialize? }, \
    { type, deserialize }, \
    { type, serialize_class, serialize, deserialize? }, \
    { type, serialize_guard, serialize, deserialize? }";

/// A codec declaration or table setting is structurally invalid.
///
/// Raised once when building a [`CodecTable`](crate::table::CodecTable).
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum RegistrationError {
    /// The declaration has none of `name`, `path`, or `type`.
    #[error("codec {codec} is missing one of `name`, `path`, or `type`; expected one of {shapes}", shapes = ACCEPTED_SHAPES)]
    MissingDiscriminant { codec: String },
    /// The declaration has more than one of `name`, `path`, or `type`.
    #[error("codec {codec} sets more than one of `name`, `path`, or `type`; expected one of {shapes}", shapes = ACCEPTED_SHAPES)]
    AmbiguousDiscriminant { codec: String },
    /// The declaration has both a `serialize_class` and a `serialize_guard`.
    #[error("codec {codec} sets both `serialize_class` and `serialize_guard`; expected one of {shapes}", shapes = ACCEPTED_SHAPES)]
    ConflictingGuards { codec: String },
    /// A `type` declaration has `serialize` but neither guard.
    #[error("codec {codec} has `serialize` but is missing `serialize_class` or `serialize_guard`; expected one of {shapes}", shapes = ACCEPTED_SHAPES)]
    MissingGuard { codec: String },
    /// The declaration has a guard but no `serialize` for it to gate.
    #[error("codec {codec} has a serialize guard but is missing `serialize`; expected one of {shapes}", shapes = ACCEPTED_SHAPES)]
    MissingSerialize { codec: String },
    /// A `name` or `path` declaration has a guard.
    #[error("codec {codec} has a serialize guard without `type`; expected one of {shapes}", shapes = ACCEPTED_SHAPES)]
    GuardWithoutType { codec: String },
    /// The declaration has neither `serialize` nor `deserialize`.
    #[error("codec {codec} is missing `serialize` or `deserialize`; expected one of {shapes}", shapes = ACCEPTED_SHAPES)]
    MissingAction { codec: String },
    /// The `type` tag is empty.
    #[error("codec {codec} has an empty `type`; expected one of {shapes}", shapes = ACCEPTED_SHAPES)]
    EmptyTag { codec: String },
    /// The chain precedence does not list every chain exactly once.
    #[error("invalid codec precedence {precedence}: every chain of name, path, type, class, and guard must appear exactly once")]
    InvalidPrecedence { precedence: String },
}

/// Errors returned by [`SerDes`](crate::SerDes) calls.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The codec table could not be built.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    /// A codec handler failed to convert a value.
    #[error("failed to convert `{path}`: {source}")]
    Conversion {
        path: KeyPath,
        #[source]
        source: anyhow::Error,
    },
    /// An application value reached the wire encoder without a codec having
    /// converted it.
    #[error("no codec converted the `{type_name}` at `{path}`")]
    Unconverted {
        path: KeyPath,
        type_name: &'static str,
    },
    /// A float was NaN or infinite, which JSON cannot represent.
    #[error("non-finite float at `{path}`")]
    NonFiniteFloat { path: KeyPath },
    /// Reading or writing JSON text failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Constructs a new [`Error::Conversion`] variant.
    #[cold]
    pub fn conversion(path: impl Into<KeyPath>, source: impl Into<anyhow::Error>) -> Self {
        Self::Conversion {
            path: path.into(),
            source: source.into(),
        }
    }

    /// The path of the value this error is about, if it is about one.
    pub fn path(&self) -> Option<&KeyPath> {
        match self {
            Self::Conversion { path, .. }
            | Self::Unconverted { path, .. }
            | Self::NonFiniteFloat { path } => Some(path),
            _ => None,
        }
    }
}
