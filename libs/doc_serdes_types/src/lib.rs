//! Application value types and the built-in codec sets for [`doc_serdes`].
//!
//! Register [`collection_codecs`] for collection documents or
//! [`table_codecs`] for table rows as the built-ins of a
//! [`SerDesBuilder`](doc_serdes::SerDesBuilder):
//!
//! ```
//! use doc_serdes::SerDes;
//! use doc_serdes::tag::SchemaTag;
//!
//! let tables = SerDes::builder()
//!     .builtins(doc_serdes_types::table_codecs())
//!     .tag_resolver(SchemaTag)
//!     .build()?;
//! # _ = tables;
//! # Ok::<(), doc_serdes::RegistrationError>(())
//! ```

// for tests
#[cfg(test)]
use serde_json as _;

mod blob;
mod builtins;
mod duration;

pub use blob::Blob;
pub use builtins::{collection_codecs, table_codecs};
pub use duration::{Duration, DurationError};
