//! Save and load walks over the document tree.
//!
//! This module provides:
//!
//! - [`SerializeContext`] / [`DeserializeContext`]: per-walk state with the
//!   per-field `write` / `read` API hosts call
//! - [`DocumentCursor`] / [`NodeCursor`]: the current node, swapped around nested calls
//! - [`Value`]: format-agnostic document tree
//! - [`Document`]: the root stored per save file
//! - [`spawn_or_link`]: live-instance reference resolution
//! - [`Format`] / [`encode`] / [`decode`]: format-specific I/O (feature-gated)

mod context;
mod cursor;
mod document;
mod error;
mod format;
pub mod resolver;
pub mod value;

pub use context::{DeserializeContext, SerializeContext};
pub use cursor::{DocumentCursor, NodeCursor};
pub use document::Document;
pub use error::{DeserializeError, FieldError, SerializeError};
pub use format::Format;
pub use resolver::{spawn_or_link, ResolveError};
pub use value::{from_value, to_value, Value, ValueError};

// Re-export format functions
pub use format::{decode, encode};
