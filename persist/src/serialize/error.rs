//! Error types for the save and load walks.

use std::fmt;

use super::resolver::ResolveError;
use crate::schema::SchemaVersion;

/// Errors that abort a save walk.
#[derive(Debug)]
pub enum SerializeError {
    /// A field could not be converted to a [`Value`](super::Value).
    FieldError { field: String, message: String },
    /// Format encoding error (RON/bincode).
    FormatError(String),
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldError { field, message } => {
                write!(f, "failed to serialize field '{field}': {message}")
            }
            Self::FormatError(msg) => write!(f, "format error: {msg}"),
        }
    }
}

impl std::error::Error for SerializeError {}

/// Errors that abort a whole load.
#[derive(Debug)]
pub enum DeserializeError {
    /// Format decoding error.
    FormatError(String),
    /// The document was written by a newer build.
    UnsupportedVersion {
        found: SchemaVersion,
        current: SchemaVersion,
    },
    /// The document root is not an object node.
    MalformedDocument { found: &'static str },
}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FormatError(msg) => write!(f, "format error: {msg}"),
            Self::UnsupportedVersion { found, current } => write!(
                f,
                "document schema {found} is newer than the supported schema {current}"
            ),
            Self::MalformedDocument { found } => {
                write!(f, "document root must be an object, found {found}")
            }
        }
    }
}

impl std::error::Error for DeserializeError {}

/// Field-local decode failures.
///
/// These never abort a load: the walk logs them and moves on, leaving the
/// destination at its previous value (or null for references).
#[derive(Debug)]
pub enum FieldError {
    /// The stored node does not fit the destination's shape.
    TypeMismatch {
        expected: String,
        found: &'static str,
    },
    /// No catalog asset is registered under the stored id.
    UnknownCatalogId(u32),
    /// A stored instance id is not of the form `catalog.top.child.own`.
    MalformedInstanceId(String),
    /// A live-instance reference could not be spawned or linked.
    Reference(ResolveError),
}

impl FieldError {
    pub(crate) fn mismatch(expected: impl Into<String>, found: &super::Value) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.kind(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {expected}, found {found}")
            }
            Self::UnknownCatalogId(id) => write!(f, "no catalog asset registered with id {id}"),
            Self::MalformedInstanceId(id) => write!(f, "malformed instance id '{id}'"),
            Self::Reference(err) => write!(f, "unresolved reference: {err}"),
        }
    }
}

impl std::error::Error for FieldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Reference(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResolveError> for FieldError {
    fn from(err: ResolveError) -> Self {
        Self::Reference(err)
    }
}
