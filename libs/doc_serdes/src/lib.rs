//! Codec-driven conversion between application documents and the wire
//! documents of a document or table database API.
//!
//! A [`SerDes`] walks a [`Value`] tree and, for every key, asks the registered
//! [`Codec`]s whether they want to convert its value. Codecs are found by:
//!
//! - the key's name,
//! - the key's full path,
//! - the wire type tag of the value (deserializing only),
//! - the application class of the value (serializing only),
//! - a custom predicate over the value (serializing only).
//!
//! Each handler answers with a [`Signal`]: finalize the value, accept it but
//! keep walking into it, or decline and let the next handler try. Values no
//! handler claims pass through unchanged.
//!
//! Keys may additionally be renamed by a [`KeyTransformer`], such as
//! [`Camel2SnakeCase`](key::Camel2SnakeCase).
//!
//! Containers nested deeper than [`MAX_DEPTH`] are left as they are.

// for benchmarks
#[cfg(test)]
use criterion as _;

pub mod codec;
pub mod config;
pub mod ctx;
pub mod error;
pub mod key;
pub mod path;
pub mod signal;
pub mod table;
pub mod tag;
pub mod value;
pub mod wire;

mod serdes;
mod walk;


pub use codec::Codec;
pub use ctx::{Direction, SerDesCtx};
pub use error::{Error, RegistrationError, Result};
pub use key::KeyTransformer;
pub use path::{KeyPath, PathSegment};
pub use serdes::{SerDes, SerDesBuilder};
pub use signal::Signal;
pub use table::{ChainKind, CodecTable, Precedence};
pub use value::{Array, Class, Document, Map, Typed, Value};
pub use walk::MAX_DEPTH;
