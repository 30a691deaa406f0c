//! # RedLilium Persist
//!
//! Versioned object persistence with schema migration, shared-asset
//! references and two-phase live-instance resolution.
//!
//! ## Core Types
//!
//! - [`Persist`] - Trait (and derive) exposing an object's fields to the walk
//! - [`Field`] - Conversion between one in-memory value and one document node
//! - [`Serializer`] - Save/load façade over a [`Storage`](storage::Storage) backend
//! - [`PersistConfig`] - Path, format, schema version and phase count
//!
//! ## Schema
//!
//! - [`SchemaVersion`] - Build-wide ordinal stamped on every document
//! - [`FieldTag`] / [`FieldInfo`] - Static per-field version metadata
//! - [`FieldSelector`] - Cached selection of persisted fields per version
//!
//! ## References
//!
//! - [`Catalog`] / [`CatalogRef`] - Shared assets referenced by catalog id
//! - [`InstanceRef`] / [`InstanceId`] - Live scene instances referenced by id
//! - [`InstanceRegistry`] - Ids resolved to live instances during a load
//! - [`Scene`](scene::Scene) - The host's scene, spawning templates on demand
//!
//! ## Documents
//!
//! - [`Value`](serialize::Value) - Format-neutral document tree
//! - [`Document`](serialize::Document) - Root node plus its schema version
//! - [`Format`](serialize::Format) - RON (default) or bincode encoding

// Lets generated code name `::redlilium_persist` from inside this crate.
extern crate self as redlilium_persist;

mod catalog;
pub mod config;
mod entity;
mod field;
mod instance;
mod object;
pub mod scene;
pub mod schema;
mod selector;
pub mod serialize;
mod serializer;
pub mod storage;

pub use catalog::{Catalog, CatalogEntry, CatalogError, CatalogRef};
pub use config::{ConfigError, PersistConfig};
pub use entity::Entity;
pub use field::{Field, Instantiate, Serde};
pub use instance::{InstanceId, InstanceRef, InstanceRegistry};
pub use object::Persist;
pub use persist_macro::Persist;
pub use scene::{Environment, Scene, SpawnLocation, SpawnLocationProvider};
pub use schema::{FieldInfo, FieldTag, SchemaVersion};
pub use selector::{select_fields, FieldSelector, SelectedField};
pub use serialize::{
    DeserializeContext, DeserializeError, FieldError, SerializeContext, SerializeError,
};
pub use serializer::{PersistError, PersistFailure, Serializer};

/// Paths used by `#[derive(Persist)]` output.
#[doc(hidden)]
pub mod __private {
    pub use serde::de::DeserializeOwned;
    pub use serde::Serialize;
}
