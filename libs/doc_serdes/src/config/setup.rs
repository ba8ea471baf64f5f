use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;
use smallvec::SmallVec;
use toml::map::Entry;
use toml::{Table, Value};

/// Provides a layered builder for deserializing configuration.
#[must_use]
pub struct Builder {
    table: Result<Table>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a new empty builder.
    pub fn new() -> Self {
        Self {
            table: Ok(Table::new()),
        }
    }

    /// Adds a layer of configuration.
    ///
    /// Layers added later take precedence over earlier ones.
    pub fn add_layer<L: Layer>(mut self, source: L) -> Self {
        self.table = self.table.and_then(|mut t| {
            source.extend_table(&mut t)?;
            Ok(t)
        });
        self
    }

    /// Deserializes the configuration from the provided layers.
    ///
    /// # Errors
    ///
    /// Returns the first error a layer raised, or the deserialization error
    /// if the merged layers don't match `T`.
    pub fn build<T>(self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let table = self.table?;
        T::deserialize(table).context("cannot deserialize config")
    }
}

/// A configuration layer.
pub trait Layer {
    /// Extends a TOML table by this layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer's source can't be read or parsed.
    fn extend_table(&self, table: &mut Table) -> Result<()>;
}

/// A TOML file configuration layer.
#[must_use]
pub struct File {
    path: PathBuf,
    required: bool,
}

impl File {
    /// Creates a new layer, loading TOML from the file at the given path.
    ///
    /// The file is required by default.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required: true,
        }
    }

    /// Sets whether the file is required.
    ///
    /// If it is not required and does not exist, this layer is treated as
    /// empty.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// A TOML text configuration layer.
#[must_use]
pub struct TomlText<'a> {
    text: &'a str,
}

impl<'a> TomlText<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }
}

/// An environment variable configuration layer.
///
/// Only variables whose name starts with the prefix followed by `__` are
/// loaded. The rest of the name is lowercased and split on `__` for nesting,
/// so with the prefix `DOC_SERDES`, `DOC_SERDES__KEYS` refers to `keys`.
///
/// Values spelling `true`, `false`, or an integer are loaded as such. All
/// other values are strings.
#[must_use]
pub struct Env {
    prefix: String,
}

impl Env {
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        prefix.push_str("__");
        Self { prefix }
    }

    fn extend_from<I>(&self, table: &mut Table, vars: I)
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        for (key, value) in vars {
            // non-utf8 names can't name any config key
            let Ok(key) = key.into_string() else {
                continue;
            };

            let Some(key) = key.strip_prefix(&self.prefix) else {
                continue;
            };

            let key = key.to_ascii_lowercase();
            let value = value
                .into_string()
                .unwrap_or_else(|o| o.to_string_lossy().into_owned());

            let segments = key
                .split("__")
                .filter(|s| !s.is_empty())
                .collect::<SmallVec<[&str; 8]>>();

            insert_at(table, &segments, literal(value));
        }
    }
}

impl Layer for File {
    fn extend_table(&self, table: &mut Table) -> Result<()> {
        let file = match fs::read_to_string(&self.path) {
            Ok(content) => deserialize_str_to_table(&content)
                .with_context(|| format!("failed to load config {:?}", self.path))?,
            Err(why) => {
                if !self.required && why.kind() == io::ErrorKind::NotFound {
                    return Ok(());
                }

                return Err(why).context(format!("cannot read required config {:?}", self.path));
            },
        };

        merge_tables(table, file);
        Ok(())
    }
}

impl Layer for TomlText<'_> {
    fn extend_table(&self, table: &mut Table) -> Result<()> {
        let toml = deserialize_str_to_table(self.text).context("toml str literal invalid")?;
        merge_tables(table, toml);
        Ok(())
    }
}

impl Layer for Env {
    fn extend_table(&self, table: &mut Table) -> Result<()> {
        self.extend_from(table, env::vars_os());
        Ok(())
    }
}

fn literal(value: String) -> Value {
    if let Ok(b) = value.parse::<bool>() {
        return Value::Boolean(b);
    }

    if let Ok(i) = value.parse::<i64>() {
        return Value::Integer(i);
    }

    Value::String(value)
}

fn deserialize_str_to_table(text: &str) -> Result<Table> {
    toml::from_str(text).context("config toml is invalid")
}

fn merge_tables(target: &mut Table, consume: Table) {
    for (key, value) in consume {
        match target.entry(key) {
            Entry::Vacant(entry) => _ = entry.insert(value),
            Entry::Occupied(mut entry) => match (entry.get_mut(), value) {
                (Value::Table(a), Value::Table(b)) => merge_tables(a, b),
                (a, b) => *a = b,
            },
        }
    }
}

fn insert_at(table: &mut Table, path: &[&str], value: Value) {
    let [first, path @ ..] = path else {
        return;
    };

    match table.entry((*first).to_owned()) {
        Entry::Vacant(entry) => _ = entry.insert(nested_value(path, value)),
        Entry::Occupied(mut entry) => match entry.get_mut() {
            Value::Table(table) if !path.is_empty() => insert_at(table, path, value),
            entry => *entry = nested_value(path, value),
        },
    }
}

fn nested_value(path: &[&str], value: Value) -> Value {
    match path {
        [] => value,
        [first, rest @ ..] => {
            let mut table = Table::new();
            table.insert((*first).to_owned(), nested_value(rest, value));
            Value::Table(table)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(list: &[(&str, &str)]) -> Vec<(OsString, OsString)> {
        list.iter()
            .map(|(k, v)| (OsString::from(k), OsString::from(v)))
            .collect()
    }

    #[test]
    fn env_prefix_and_literals() {
        let mut table = Table::new();
        Env::new("DOC_SERDES").extend_from(
            &mut table,
            vars(&[
                ("DOC_SERDES__KEYS", "snake_case"),
                ("DOC_SERDES__TRANSFORM_NESTED_KEYS", "true"),
                ("DOC_SERDES__LIMITS__DEPTH", "12"),
                ("OTHER__KEYS", "preserve"),
                ("DOC_SERDESX__KEYS", "preserve"),
            ]),
        );

        assert_eq!(table.get("keys").and_then(Value::as_str), Some("snake_case"), "string");
        assert_eq!(
            table.get("transform_nested_keys").and_then(Value::as_bool),
            Some(true),
            "bool"
        );
        assert_eq!(
            table
                .get("limits")
                .and_then(|t| t.get("depth"))
                .and_then(Value::as_integer),
            Some(12),
            "nested int"
        );
        assert_eq!(table.len(), 3, "unprefixed vars are skipped");
    }

    #[test]
    fn later_layers_win() {
        let table = Builder::new()
            .add_layer(TomlText::new("a = 1\n[t]\nx = 'x'\ny = 'y'"))
            .add_layer(TomlText::new("a = 2\n[t]\ny = 'z'"))
            .build::<Table>()
            .expect("valid layers");

        assert_eq!(table.get("a").and_then(Value::as_integer), Some(2), "overwritten");
        let t = table.get("t").and_then(Value::as_table).expect("t is a table");
        assert_eq!(t.get("x").and_then(Value::as_str), Some("x"), "kept");
        assert_eq!(t.get("y").and_then(Value::as_str), Some("z"), "merged");
    }

    #[test]
    fn optional_file_may_be_missing() {
        let path = "this/file/does/not/exist.toml";

        let table = Builder::new()
            .add_layer(File::new(path).required(false))
            .build::<Table>()
            .expect("optional file may be missing");
        assert!(table.is_empty(), "nothing loaded");

        Builder::new()
            .add_layer(File::new(path))
            .build::<Table>()
            .expect_err("required file must exist");
    }
}
