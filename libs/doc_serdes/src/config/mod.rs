//! Declarative configuration for a [`SerDes`](crate::SerDes).
//!
//! ```toml
//! keys = "snake_case"
//! transform_nested_keys = false
//! id_field = "_id"
//! precedence = ["name", "path", "type", "class", "guard"]
//! tagging = "projection_schema"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::key::Camel2SnakeCase;
use crate::table::Precedence;
use crate::tag::{SchemaTag, SigilTag, TagResolver};

pub mod setup;

/// Prefix of environment variables read by [`SerDesConfig::load`].
pub const ENV_PREFIX: &str = "DOC_SERDES";

/// How document keys are renamed on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCasing {
    /// Keys are sent as they are.
    #[default]
    Preserve,
    /// `camelCase` application keys are `snake_case` on the wire.
    SnakeCase,
}

/// How wire values announce their type when deserializing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tagging {
    /// Single-key objects like `{"$date": 0}`. Used by collections.
    #[default]
    Sigil,
    /// Column types from the response's projection schema. Used by tables.
    ProjectionSchema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerDesConfig {
    pub keys: KeyCasing,
    /// Whether keys of nested objects are renamed too.
    pub transform_nested_keys: bool,
    /// A key never renamed. Empty for none.
    pub id_field: String,
    pub precedence: Precedence,
    pub tagging: Tagging,
}

impl Default for SerDesConfig {
    fn default() -> Self {
        Self {
            keys: KeyCasing::Preserve,
            transform_nested_keys: false,
            id_field: "_id".to_owned(),
            precedence: Precedence::default(),
            tagging: Tagging::Sigil,
        }
    }
}

impl SerDesConfig {
    /// Loads the configuration from an optional TOML file, overridden by
    /// `DOC_SERDES__*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer cannot be read or the result is invalid.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = setup::Builder::new();
        if let Some(path) = path {
            builder = builder.add_layer(setup::File::new(path).required(false));
        }

        builder.add_layer(setup::Env::new(ENV_PREFIX)).build()
    }

    /// Parses the configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or not a valid
    /// configuration.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        setup::Builder::new()
            .add_layer(setup::TomlText::new(text))
            .build()
    }

    /// Creates the key transformer this configuration describes, if any.
    pub fn key_transformer(&self) -> Option<Camel2SnakeCase> {
        match self.keys {
            KeyCasing::Preserve => None,
            KeyCasing::SnakeCase => {
                let id_field = Some(self.id_field.clone()).filter(|s| !s.is_empty());
                Some(
                    Camel2SnakeCase::new()
                        .id_field(id_field)
                        .transform_nested(self.transform_nested_keys),
                )
            },
        }
    }

    /// Creates the tag resolver this configuration describes.
    pub fn tag_resolver(&self) -> Box<dyn TagResolver> {
        match self.tagging {
            Tagging::Sigil => Box::new(SigilTag),
            Tagging::ProjectionSchema => Box::new(SchemaTag),
        }
    }
}
