use std::hash::{Hash, Hasher};

/// A copyable handle to a live instance owned by the host [`Scene`](crate::scene::Scene).
///
/// Layout: `u32 index` + `u32 generation`.
///
/// - **index**: slot index in the scene's instance storage
/// - **generation**: bumped every time a slot is recycled, so stale handles
///   to a destroyed instance never alias the instance that reuses the slot
///
/// The persistence engine never owns what an `Entity` points at. Handles are
/// held by the instance registry and by [`InstanceRef`](crate::InstanceRef)
/// fields purely as lookup keys into the scene.
#[derive(Clone, Copy)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// Creates a handle from a slot index and generation.
    ///
    /// Scenes mint handles; everything else receives them.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index of this entity.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns the generation of this entity's slot at the time it was created.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}
