use std::fmt;

/// One step into a document: a field key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    /// Gets the key, if this is a field key.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Index(_) => None,
        }
    }

    /// Gets the index, if this is an array index.
    pub const fn as_index(&self) -> Option<usize> {
        match self {
            Self::Key(_) => None,
            Self::Index(index) => Some(*index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        Self::Key(value.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        Self::Key(value)
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// An owned location within a document, used for error reporting.
///
/// Displays as `a.b[0].c`, or `<root>` for the document itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath(Vec<PathSegment>);

impl KeyPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl From<&[PathSegment]> for KeyPath {
    fn from(value: &[PathSegment]) -> Self {
        Self(value.to_vec())
    }
}

impl From<Vec<PathSegment>> for KeyPath {
    fn from(value: Vec<PathSegment>) -> Self {
        Self(value)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }

        for (i, segment) in self.0.iter().enumerate() {
            if i != 0 && matches!(segment, PathSegment::Key(_)) {
                f.write_str(".")?;
            }

            fmt::Display::fmt(segment, f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_key_path() {
        let path = KeyPath::from(vec!["a".into(), "b".into(), 0.into(), "c".into()]);
        assert_eq!(path.to_string(), "a.b[0].c", "dotted with indices");
        assert_eq!(KeyPath::default().to_string(), "<root>", "empty path");
    }
}
