//! Live-instance identity: hierarchical ids, reference fields and the
//! per-load instance registry.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::entity::Entity;
use crate::field::Field;
use crate::serialize::{DeserializeContext, FieldError, SerializeContext, SerializeError, Value};

/// Hierarchical id of a live instance: `catalog.top.child.own`.
///
/// - **catalog**: catalog id of the template the hierarchy was spawned from
/// - **top**: id of the top-level instance of that hierarchy
/// - **child**: index into the template's static child table (0 is the root)
/// - **own**: the instance's own id, the key used by reference lookups
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId {
    pub catalog: u32,
    pub top: String,
    pub child: u32,
    pub own: String,
}

impl InstanceId {
    pub fn new(catalog: u32, top: impl Into<String>, child: u32, own: impl Into<String>) -> Self {
        Self {
            catalog,
            top: top.into(),
            child,
            own: own.into(),
        }
    }

    /// Id of the root of a freshly spawned hierarchy.
    pub fn root(catalog: u32, top: &str) -> Self {
        Self::new(catalog, top, 0, top)
    }

    /// Returns `true` if this id names the root of its hierarchy.
    pub fn is_root(&self) -> bool {
        self.child == 0 && self.own == self.top
    }

    /// Last dot-separated segment of a stored id string.
    pub fn final_segment(id: &str) -> &str {
        id.rsplit('.').next().unwrap_or(id)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.catalog, self.top, self.child, self.own)
    }
}

impl FromStr for InstanceId {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, FieldError> {
        let malformed = || FieldError::MalformedInstanceId(s.to_owned());
        let segments: Vec<&str> = s.split('.').collect();
        let [catalog, top, child, own] = segments.as_slice() else {
            return Err(malformed());
        };
        if top.is_empty() || own.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            catalog: catalog.parse().map_err(|_| malformed())?,
            top: (*top).to_owned(),
            child: child.parse().map_err(|_| malformed())?,
            own: (*own).to_owned(),
        })
    }
}

/// A field holding a live-instance reference.
///
/// Always stored by id. Read as a plain field it links during phase 1 and
/// later; read as a sequence or map element it spawns or links immediately.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InstanceRef(pub Option<Entity>);

impl InstanceRef {
    pub fn new(entity: Entity) -> Self {
        Self(Some(entity))
    }

    pub fn get(&self) -> Option<Entity> {
        self.0
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }
}

impl From<Entity> for InstanceRef {
    fn from(entity: Entity) -> Self {
        Self(Some(entity))
    }
}

impl Field for InstanceRef {
    fn encode(&self, ctx: &mut SerializeContext<'_>) -> Result<Option<Value>, SerializeError> {
        let Some(entity) = self.0 else {
            return Ok(None);
        };
        match ctx.scene().instance_id(entity) {
            Some(id) => Ok(Some(Value::Instance(id.to_string()))),
            None => {
                log::warn!("{entity} has no instance id, reference omitted");
                Ok(None)
            }
        }
    }

    fn decode<'d>(
        &mut self,
        node: &'d Value,
        ctx: &mut DeserializeContext<'d>,
    ) -> Result<(), FieldError> {
        if ctx.phase() == 0 {
            return Ok(());
        }
        match node {
            Value::Null => self.0 = None,
            Value::Instance(id) | Value::String(id) => {
                self.0 = ctx.registry().get(InstanceId::final_segment(id));
                if self.0.is_none() {
                    log::debug!("Instance '{id}' is not registered, reference left empty");
                }
            }
            other => return Err(FieldError::mismatch("instance reference", other)),
        }
        Ok(())
    }

    fn decode_element<'d>(
        &mut self,
        node: &'d Value,
        ctx: &mut DeserializeContext<'d>,
    ) -> Result<(), FieldError> {
        match node {
            Value::Null => {
                self.0 = None;
                Ok(())
            }
            Value::Instance(id) | Value::String(id) => {
                let id: InstanceId = id.parse()?;
                match ctx.spawn_or_link(&id) {
                    Ok(entity) => {
                        self.0 = Some(entity);
                        Ok(())
                    }
                    Err(err) => {
                        self.0 = None;
                        Err(err.into())
                    }
                }
            }
            other => Err(FieldError::mismatch("instance reference", other)),
        }
    }
}

/// Weak lookup from instance ids to live instances, scoped to one load.
///
/// Two namespaces: top-level hierarchy ids and per-instance own ids. A
/// hierarchy's top id and one of its children's own ids may coincide.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    top_level: HashMap<String, Entity>,
    instances: HashMap<String, Entity>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.top_level.clear();
        self.instances.clear();
    }

    /// Registers the top-level instance of a hierarchy.
    pub fn register_top(&mut self, top: impl Into<String>, entity: Entity) {
        self.top_level.insert(top.into(), entity);
    }

    /// Registers an instance under its own id.
    pub fn register(&mut self, own: impl Into<String>, entity: Entity) {
        self.instances.insert(own.into(), entity);
    }

    /// Registers an instance under its own id unless that id is taken.
    ///
    /// Returns `false` and keeps the existing entry otherwise.
    pub fn register_if_absent(&mut self, own: impl Into<String>, entity: Entity) -> bool {
        match self.instances.entry(own.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(entity);
                true
            }
        }
    }

    pub fn top(&self, top: &str) -> Option<Entity> {
        self.top_level.get(top).copied()
    }

    pub fn get(&self, own: &str) -> Option<Entity> {
        self.instances.get(own).copied()
    }

    /// Number of instances reachable by own id.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Number of registered top-level hierarchies.
    pub fn top_level_len(&self) -> usize {
        self.top_level.len()
    }
}
