use std::fmt;

use base64::prelude::*;

/// Binary data, sent on the wire as standard padded base64.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    /// Encodes the bytes as base64.
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.0)
    }

    /// Decodes base64 text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text isn't valid padded base64.
    pub fn from_base64(text: &str) -> Result<Self, base64::DecodeError> {
        BASE64_STANDARD.decode(text).map(Self)
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for Blob {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for Blob {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_padded() {
        let blob = Blob::from(&b"hey"[..]);
        assert_eq!(blob.to_base64(), "aGV5", "no padding needed");
        assert_eq!(Blob::from(&b"hi"[..]).to_base64(), "aGk=", "padded");
        assert_eq!(Blob::from_base64("aGV5").ok(), Some(blob), "decoded");
        assert_eq!(Blob::from_base64("a!").ok(), None, "invalid");
    }
}
