use std::collections::HashMap;

use super::{Scene, SpawnLocation};
use crate::catalog::CatalogEntry;
use crate::entity::Entity;
use crate::instance::InstanceId;

/// Template asset understood by [`MemoryScene`]: a root with a fixed number
/// of static children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryTemplate {
    pub children: u32,
}

/// Per-slot node data.
#[derive(Debug, Default)]
struct Node {
    id: Option<InstanceId>,
    /// Static child table: `[root, child 1, child 2, ...]`.
    children: Vec<Entity>,
    location: Option<SpawnLocation>,
}

/// A minimal in-memory [`Scene`] for tools and tests.
///
/// Slots are recycled through a free list; each recycle bumps the slot's
/// generation so handles to a destroyed instance never resolve to its
/// successor.
#[derive(Debug, Default)]
pub struct MemoryScene {
    generations: Vec<u32>,
    alive: Vec<bool>,
    nodes: Vec<Node>,
    free_list: Vec<u32>,
    count: u32,
    spawned: u32,
    /// Own-id index for reverse lookups.
    by_id: HashMap<String, Entity>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a standalone instance with no children.
    pub fn create(&mut self) -> Entity {
        let entity = self.allocate();
        self.node_mut(entity).children.push(entity);
        entity
    }

    /// Creates an instance with `children` static children, without going
    /// through a catalog template.
    pub fn instantiate(&mut self, children: u32) -> Entity {
        let root = self.create();
        for _ in 0..children {
            let child = self.allocate();
            self.node_mut(child).children.push(child);
            self.node_mut(root).children.push(child);
        }
        root
    }

    /// Destroys `entity` and, if it is a hierarchy root, its static children.
    /// Returns `false` for stale handles.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let children = std::mem::take(&mut self.node_mut(entity).children);
        for child in children.into_iter().skip(1) {
            if child != entity {
                self.despawn(child);
            }
        }
        self.deallocate(entity);
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        let idx = entity.index() as usize;
        idx < self.alive.len() && self.alive[idx] && self.generations[idx] == entity.generation()
    }

    /// Number of live instances.
    pub fn len(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of hierarchies spawned through [`Scene::spawn`].
    pub fn spawn_count(&self) -> u32 {
        self.spawned
    }

    /// Placement a hierarchy root was spawned with.
    pub fn location(&self, entity: Entity) -> Option<SpawnLocation> {
        self.node(entity)?.location
    }

    /// Finds a live instance by its own id.
    pub fn find(&self, own: &str) -> Option<Entity> {
        self.by_id
            .get(own)
            .copied()
            .filter(|entity| self.is_alive(*entity))
    }

    fn allocate(&mut self) -> Entity {
        self.count += 1;
        if let Some(index) = self.free_list.pop() {
            let idx = index as usize;
            self.alive[idx] = true;
            self.nodes[idx] = Node::default();
            Entity::new(index, self.generations[idx])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            self.nodes.push(Node::default());
            Entity::new(index, 0)
        }
    }

    fn deallocate(&mut self, entity: Entity) {
        let idx = entity.index() as usize;
        if let Some(id) = self.nodes[idx].id.take() {
            if self.by_id.get(&id.own) == Some(&entity) {
                self.by_id.remove(&id.own);
            }
        }
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free_list.push(entity.index());
        self.count -= 1;
    }

    fn node(&self, entity: Entity) -> Option<&Node> {
        if self.is_alive(entity) {
            self.nodes.get(entity.index() as usize)
        } else {
            None
        }
    }

    // Callers only pass handles they just allocated or checked.
    fn node_mut(&mut self, entity: Entity) -> &mut Node {
        &mut self.nodes[entity.index() as usize]
    }
}

impl Scene for MemoryScene {
    fn instance_id(&self, entity: Entity) -> Option<InstanceId> {
        self.node(entity)?.id.clone()
    }

    fn assign_instance_id(&mut self, entity: Entity, id: InstanceId) {
        if !self.is_alive(entity) {
            log::warn!("Cannot assign id {id} to dead {entity}");
            return;
        }
        self.by_id.insert(id.own.clone(), entity);
        self.node_mut(entity).id = Some(id);
    }

    fn child(&self, entity: Entity, index: u32) -> Option<Entity> {
        self.node(entity)?.children.get(index as usize).copied()
    }

    fn spawn(&mut self, template: &CatalogEntry, location: SpawnLocation) -> Option<Entity> {
        let shape = template.downcast::<MemoryTemplate>()?;
        let root = self.instantiate(shape.children);
        self.node_mut(root).location = Some(location);
        self.spawned += 1;
        log::debug!(
            "Spawned '{}' as {root} with {} children",
            template.name,
            shape.children
        );
        Some(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn child_table_starts_with_root() {
        let mut scene = MemoryScene::new();
        let root = scene.instantiate(2);
        assert_eq!(scene.child(root, 0), Some(root));
        assert!(scene.child(root, 1).is_some());
        assert!(scene.child(root, 2).is_some());
        assert_eq!(scene.child(root, 3), None);
        assert_eq!(scene.len(), 3);
    }

    #[test]
    fn despawn_invalidates_handles() {
        let mut scene = MemoryScene::new();
        let root = scene.instantiate(1);
        let child = scene.child(root, 1).unwrap();
        assert!(scene.despawn(root));
        assert!(!scene.is_alive(root));
        assert!(!scene.is_alive(child));
        assert!(!scene.despawn(root));

        let reused = scene.create();
        assert_eq!(scene.child(root, 0), None);
        assert_ne!(reused, root);
        assert_ne!(reused, child);
    }

    #[test]
    fn ids_follow_instances() {
        let mut scene = MemoryScene::new();
        let e = scene.create();
        scene.assign_instance_id(e, InstanceId::root(1, "a"));
        assert_eq!(scene.find("a"), Some(e));
        assert_eq!(scene.instance_id(e).unwrap().to_string(), "1.a.0.a");

        scene.despawn(e);
        assert_eq!(scene.find("a"), None);
    }

    #[test]
    fn spawn_requires_memory_template() {
        let mut catalog = Catalog::new();
        catalog
            .register_template(5, "pair", MemoryTemplate { children: 2 })
            .unwrap();
        catalog.register_template(6, "opaque", 42u32).unwrap();

        let mut scene = MemoryScene::new();
        let location = SpawnLocation {
            position: [1.0, 2.0, 3.0],
            ..Default::default()
        };
        let root = scene.spawn(catalog.entry(5).unwrap(), location).unwrap();
        assert_eq!(scene.location(root), Some(location));
        assert_eq!(scene.spawn_count(), 1);

        assert!(scene.spawn(catalog.entry(6).unwrap(), location).is_none());
        assert_eq!(scene.spawn_count(), 1);
    }
}
