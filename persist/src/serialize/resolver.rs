//! Spawn-or-link resolution of live-instance references.
//!
//! Spawned hierarchies are recreated wholesale: a reference to a child is
//! satisfied by spawning (or finding) its top-level instance and then picking
//! the child out of that instance's static child table.

use std::fmt;

use crate::catalog::Catalog;
use crate::entity::Entity;
use crate::instance::{InstanceId, InstanceRegistry};
use crate::scene::{Scene, SpawnLocationProvider};

/// Why a live-instance reference could not be satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The catalog id does not name a spawnable template.
    UnknownTemplate { catalog: u32 },
    /// The scene declined to instantiate the template.
    SpawnFailed { catalog: u32 },
    /// The top-level instance has no static child at the stored index.
    MissingChild { top: String, child: u32 },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTemplate { catalog } => {
                write!(f, "catalog id {catalog} is not a spawnable template")
            }
            Self::SpawnFailed { catalog } => {
                write!(f, "scene failed to spawn template {catalog}")
            }
            Self::MissingChild { top, child } => {
                write!(f, "instance '{top}' has no static child at index {child}")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// Returns the live instance `id` names, spawning its hierarchy if needed.
///
/// 1. An instance already registered under `id.own` is reused.
/// 2. Otherwise the top-level instance `id.top` is looked up, or spawned from
///    template `id.catalog` and registered both as a hierarchy and under
///    `id.top` as its own id, unless a child already holds that own id.
/// 3. The child at `id.child` is taken from the top-level instance's static
///    child table, assigned `id` and registered under `id.own`.
pub fn spawn_or_link(
    id: &InstanceId,
    registry: &mut InstanceRegistry,
    catalog: &Catalog,
    scene: &mut dyn Scene,
    spawn: &mut dyn SpawnLocationProvider,
) -> Result<Entity, ResolveError> {
    if let Some(existing) = registry.get(&id.own) {
        return Ok(existing);
    }

    let top = match registry.top(&id.top) {
        Some(top) => top,
        None => {
            let template = catalog.template(id.catalog).ok_or(ResolveError::UnknownTemplate {
                catalog: id.catalog,
            })?;
            let location = spawn.spawn_location(id.catalog, &id.top);
            let top = scene
                .spawn(template, location)
                .ok_or(ResolveError::SpawnFailed {
                    catalog: id.catalog,
                })?;
            scene.assign_instance_id(top, InstanceId::root(id.catalog, &id.top));
            registry.register_top(id.top.clone(), top);
            registry.register_if_absent(id.top.clone(), top);
            log::debug!("Spawned template {} as top-level '{}'", id.catalog, id.top);
            top
        }
    };

    let child = scene
        .child(top, id.child)
        .ok_or_else(|| ResolveError::MissingChild {
            top: id.top.clone(),
            child: id.child,
        })?;
    scene.assign_instance_id(child, id.clone());
    registry.register(id.own.clone(), child);
    Ok(child)
}
