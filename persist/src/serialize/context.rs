//! Save and load walk contexts.
//!
//! [`SerializeContext`] carries the write walk: the document cursor, the
//! build's schema version and read-only access to the catalog and scene.
//! [`DeserializeContext`] carries one load phase: the cursor over the parsed
//! document, the document's schema version, the phase number, and mutable
//! access to the registry and scene for spawn-or-link resolution.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::cursor::{DocumentCursor, NodeCursor};
use super::error::{FieldError, SerializeError};
use super::resolver::{self, ResolveError};
use super::value::{self, Value};
use crate::catalog::Catalog;
use crate::entity::Entity;
use crate::field::Field;
use crate::instance::{InstanceId, InstanceRegistry};
use crate::object::Persist;
use crate::scene::{Environment, Scene, SpawnLocationProvider};
use crate::schema::SchemaVersion;
use crate::selector::FieldSelector;

// ---------------------------------------------------------------------------
// SerializeContext
// ---------------------------------------------------------------------------

/// Context for the write walk.
pub struct SerializeContext<'a> {
    cursor: DocumentCursor,
    version: SchemaVersion,
    catalog: &'a Catalog,
    scene: &'a dyn Scene,
    auto_reference: bool,
    selector: FieldSelector,
}

impl<'a> SerializeContext<'a> {
    /// Create a context positioned on an empty root object.
    pub fn new(version: SchemaVersion, catalog: &'a Catalog, scene: &'a dyn Scene) -> Self {
        Self {
            cursor: DocumentCursor::new(),
            version,
            catalog,
            scene,
            auto_reference: true,
            selector: FieldSelector::new(),
        }
    }

    /// Schema version names are resolved against (always the build's).
    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn scene(&self) -> &'a dyn Scene {
        self.scene
    }

    /// Whether reference fields currently encode by id.
    pub fn auto_reference(&self) -> bool {
        self.auto_reference
    }

    /// Write a field, encoding references by id.
    pub fn write<T: Field + ?Sized>(&mut self, name: &str, value: &T) -> Result<(), SerializeError> {
        self.write_with(name, value, true)
    }

    /// Write a field with an explicit auto-reference mode.
    ///
    /// Values that encode to nothing (empty options, unresolvable references)
    /// are omitted from the document.
    pub fn write_with<T: Field + ?Sized>(
        &mut self,
        name: &str,
        value: &T,
        auto_reference: bool,
    ) -> Result<(), SerializeError> {
        let previous = std::mem::replace(&mut self.auto_reference, auto_reference);
        let encoded = value.encode(self);
        self.auto_reference = previous;
        if let Some(node) = encoded? {
            self.cursor.insert(name, node);
        }
        Ok(())
    }

    /// Write any serde-serializable value as a plain node.
    pub fn write_serde<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        val: &T,
    ) -> Result<(), SerializeError> {
        let node = value::to_value(val).map_err(|e| SerializeError::FieldError {
            field: name.to_owned(),
            message: e.to_string(),
        })?;
        self.write_value(name, node);
        Ok(())
    }

    /// Write a pre-built node.
    pub fn write_value(&mut self, name: &str, node: Value) {
        self.cursor.insert(name, node);
    }

    /// Encode `host` into a fresh object node via its [`Persist::save`].
    pub fn encode_object<T: Persist>(&mut self, host: &T) -> Result<Value, SerializeError> {
        let parent = self.cursor.enter(Value::empty_map());
        let result = host.save(self);
        let node = self.cursor.leave(parent);
        result.map(|()| node)
    }

    /// Write every eligible field of `host` under its resolved wire name.
    pub fn write_members<T: Persist>(&mut self, host: &T) -> Result<(), SerializeError> {
        let fields = self.selector.select::<T>(self.version);
        for field in fields.iter() {
            host.write_member(field.ident, field.wire_name, self)?;
        }
        Ok(())
    }

    /// Consume the context and return the root node.
    pub fn finish(self) -> Value {
        self.cursor.into_node()
    }
}

// ---------------------------------------------------------------------------
// DeserializeContext
// ---------------------------------------------------------------------------

/// Context for one load phase.
///
/// `'a` also bounds the parsed document: every node handed to
/// [`Field::decode`] borrows it, so nested reads never copy subtrees.
pub struct DeserializeContext<'a> {
    cursor: NodeCursor<'a>,
    version: SchemaVersion,
    phase: u32,
    registry: &'a mut InstanceRegistry,
    catalog: &'a Catalog,
    scene: &'a mut dyn Scene,
    spawn: &'a mut dyn SpawnLocationProvider,
    auto_reference: bool,
    selector: FieldSelector,
}

impl<'a> DeserializeContext<'a> {
    /// Create a context for documents written at `version`, starting at
    /// phase 0.
    pub fn new(
        version: SchemaVersion,
        registry: &'a mut InstanceRegistry,
        env: &'a mut Environment<'_>,
    ) -> Self {
        Self {
            cursor: NodeCursor::default(),
            version,
            phase: 0,
            registry,
            catalog: env.catalog,
            scene: &mut *env.scene,
            spawn: &mut *env.spawn,
            auto_reference: false,
            selector: FieldSelector::new(),
        }
    }

    /// Schema version of the document being read.
    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Current load phase. Phase 0 spawns, later phases link.
    pub fn phase(&self) -> u32 {
        self.phase
    }

    /// Start a new phase. The field selection cache survives across phases.
    pub fn begin_phase(&mut self, phase: u32) {
        self.phase = phase;
    }

    /// Whether the current read asked for by-id references.
    pub fn auto_reference(&self) -> bool {
        self.auto_reference
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &*self.registry
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn scene(&self) -> &dyn Scene {
        &*self.scene
    }

    pub fn scene_mut(&mut self) -> &mut (dyn Scene + 'a) {
        &mut *self.scene
    }

    /// Read a named field into `value`.
    ///
    /// Returns `false` without touching `value` if the field is absent.
    /// Returns `false` and logs if the stored node does not decode.
    pub fn read<T: Field + ?Sized>(&mut self, name: &str, value: &mut T) -> bool {
        self.read_with(name, value, false)
    }

    /// Read a named field with an explicit auto-reference mode.
    pub fn read_with<T: Field + ?Sized>(
        &mut self,
        name: &str,
        value: &mut T,
        auto_reference: bool,
    ) -> bool {
        let Some(node) = self.cursor.get(name) else {
            return false;
        };
        let previous = std::mem::replace(&mut self.auto_reference, auto_reference);
        let result = value.decode(node, self);
        self.auto_reference = previous;
        match result {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Field '{name}' not loaded: {err}");
                false
            }
        }
    }

    /// Read a named field through serde.
    ///
    /// Returns `None` if the field is absent or does not convert.
    pub fn read_serde<T: DeserializeOwned>(&mut self, name: &str) -> Option<T> {
        let node = self.cursor.get(name)?;
        match value::from_value(node.clone()) {
            Ok(val) => Some(val),
            Err(err) => {
                log::warn!("Field '{name}' not loaded: {err}");
                None
            }
        }
    }

    /// Raw access to a named node of the current object.
    pub fn read_value(&self, name: &str) -> Option<&'a Value> {
        self.cursor.get(name)
    }

    /// Decode an object node into `host` via its [`Persist::load`].
    pub fn decode_object<T: Persist>(
        &mut self,
        node: &'a Value,
        host: &mut T,
    ) -> Result<(), FieldError> {
        if !matches!(node, Value::Map(_)) {
            return Err(FieldError::mismatch(T::NAME, node));
        }
        let parent = self.cursor.enter(node);
        let result = host.load(self);
        self.cursor.leave(parent);
        result
    }

    /// Read every eligible field of `host` by its resolved wire name.
    pub fn read_members<T: Persist>(&mut self, host: &mut T) {
        let fields = self.selector.select::<T>(self.version);
        for field in fields.iter() {
            host.read_member(field.ident, field.wire_name, self);
        }
    }

    /// Spawn or link the live instance `id` names.
    pub fn spawn_or_link(&mut self, id: &InstanceId) -> Result<Entity, ResolveError> {
        resolver::spawn_or_link(
            id,
            self.registry,
            self.catalog,
            &mut *self.scene,
            &mut *self.spawn,
        )
    }

    /// Register an instance that already exists in the scene so references
    /// to it resolve during later phases.
    ///
    /// Returns `false` if the instance has no id.
    pub fn register_instance(&mut self, entity: Entity) -> bool {
        let Some(id) = self.scene.instance_id(entity) else {
            return false;
        };
        if id.is_root() {
            self.registry.register_top(id.top.clone(), entity);
        }
        self.registry.register(id.own, entity);
        true
    }
}
