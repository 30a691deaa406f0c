//! The one root object stored per save file.

use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::schema::SchemaVersion;

/// A complete save document: schema marker plus the walked field data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Schema version the document was written with.
    pub schema_version: SchemaVersion,
    /// Root object node produced by the save walk.
    pub data: Value,
}

impl Document {
    pub fn new(schema_version: SchemaVersion, data: Value) -> Self {
        Self {
            schema_version,
            data,
        }
    }
}
