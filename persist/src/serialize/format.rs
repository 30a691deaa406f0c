//! Format-specific encoding and decoding (feature-gated).
//!
//! Provides [`encode`] and [`decode`] functions that convert between
//! serde-serializable types and byte buffers in RON or bincode format.
//! Both variants always exist so configuration files stay portable; a format
//! whose feature is disabled fails with a `FormatError` at use.

use serde::{Deserialize, Serialize};

use super::error::{DeserializeError, SerializeError};

/// Supported document formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// RON (Rusty Object Notation), human-readable text.
    #[default]
    Ron,
    /// Bincode, compact binary.
    Bincode,
}

impl Format {
    /// Returns `true` if support for this format was compiled in.
    pub fn is_enabled(self) -> bool {
        match self {
            Format::Ron => cfg!(feature = "ron"),
            Format::Bincode => cfg!(feature = "bincode"),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Ron => f.write_str("ron"),
            Format::Bincode => f.write_str("bincode"),
        }
    }
}

#[allow(dead_code)]
fn disabled(format: Format) -> String {
    format!("{format} support is not enabled in this build")
}

/// Encode a serde-serializable value to bytes in the given format.
#[allow(unused_variables)]
pub fn encode<T: Serialize>(value: &T, format: Format) -> Result<Vec<u8>, SerializeError> {
    match format {
        #[cfg(feature = "ron")]
        Format::Ron => ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
            .map(|s| s.into_bytes())
            .map_err(|e| SerializeError::FormatError(e.to_string())),
        #[cfg(feature = "bincode")]
        Format::Bincode => {
            bincode::serialize(value).map_err(|e| SerializeError::FormatError(e.to_string()))
        }
        #[allow(unreachable_patterns)]
        other => Err(SerializeError::FormatError(disabled(other))),
    }
}

/// Decode bytes in the given format to a serde-deserializable type.
#[allow(unused_variables)]
pub fn decode<T: serde::de::DeserializeOwned>(
    bytes: &[u8],
    format: Format,
) -> Result<T, DeserializeError> {
    match format {
        #[cfg(feature = "ron")]
        Format::Ron => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| DeserializeError::FormatError(e.to_string()))?;
            ron::from_str(s).map_err(|e| DeserializeError::FormatError(e.to_string()))
        }
        #[cfg(feature = "bincode")]
        Format::Bincode => {
            bincode::deserialize(bytes).map_err(|e| DeserializeError::FormatError(e.to_string()))
        }
        #[allow(unreachable_patterns)]
        other => Err(DeserializeError::FormatError(disabled(other))),
    }
}
