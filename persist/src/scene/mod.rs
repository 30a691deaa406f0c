//! Host collaborators for live instances.
//!
//! The engine never owns live instances. A [`Scene`] owns them, exposes
//! their ids and static child tables, and instantiates templates on request.
//! A [`SpawnLocationProvider`] decides where freshly spawned hierarchies go.
//! Both travel with the [`Catalog`] in an [`Environment`] threaded through
//! every save and load.

mod memory;

pub use memory::{MemoryScene, MemoryTemplate};

use crate::catalog::{Catalog, CatalogEntry};
use crate::entity::Entity;
use crate::instance::InstanceId;

/// Placement of a freshly spawned top-level instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnLocation {
    pub position: [f32; 3],
    /// Rotation quaternion `[x, y, z, w]`.
    pub rotation: [f32; 4],
}

impl Default for SpawnLocation {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// The world that owns live instances.
pub trait Scene {
    /// Returns the hierarchical id assigned to `entity`, if any.
    fn instance_id(&self, entity: Entity) -> Option<InstanceId>;

    /// Assigns a hierarchical id to `entity`.
    fn assign_instance_id(&mut self, entity: Entity, id: InstanceId);

    /// Looks up `entity`'s static child at `index`. Index 0 is `entity` itself.
    fn child(&self, entity: Entity, index: u32) -> Option<Entity>;

    /// Instantiates a catalog template as a new top-level hierarchy and
    /// returns its root, or `None` if the template cannot be spawned here.
    fn spawn(&mut self, template: &CatalogEntry, location: SpawnLocation) -> Option<Entity>;
}

/// Placement callback invoked only when a fresh top-level instance is spawned.
pub trait SpawnLocationProvider {
    fn spawn_location(&mut self, template: u32, top_id: &str) -> SpawnLocation;
}

/// Spawns everything at the origin with identity rotation.
#[derive(Clone, Copy, Debug, Default)]
pub struct OriginSpawn;

impl SpawnLocationProvider for OriginSpawn {
    fn spawn_location(&mut self, _template: u32, _top_id: &str) -> SpawnLocation {
        SpawnLocation::default()
    }
}

impl<F> SpawnLocationProvider for F
where
    F: FnMut(u32, &str) -> SpawnLocation,
{
    fn spawn_location(&mut self, template: u32, top_id: &str) -> SpawnLocation {
        self(template, top_id)
    }
}

/// Everything a save or load needs from the embedding application.
pub struct Environment<'a> {
    pub catalog: &'a Catalog,
    pub scene: &'a mut dyn Scene,
    pub spawn: &'a mut dyn SpawnLocationProvider,
}

impl<'a> Environment<'a> {
    pub fn new(
        catalog: &'a Catalog,
        scene: &'a mut dyn Scene,
        spawn: &'a mut dyn SpawnLocationProvider,
    ) -> Self {
        Self {
            catalog,
            scene,
            spawn,
        }
    }
}
