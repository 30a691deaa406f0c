//! # RedLilium Persist Demos
//!
//! A small campaign model used by the demo programs.
//!
//! ## Available Demos
//!
//! - `persist_demo` - Saves a campaign with spawned camps, reloads it into an
//!   empty scene and prints what was restored

use std::collections::BTreeMap;
use std::fmt;

use redlilium_persist::scene::{MemoryScene, MemoryTemplate};
use redlilium_persist::{
    Catalog, CatalogError, CatalogRef, Entity, InstanceId, InstanceRef, Persist, Scene,
};

/// Demos library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Catalog id of the camp template (a tent root with two guards).
pub const CAMP_TEMPLATE: u32 = 5;
/// Catalog id of the watchtower template (no children).
pub const TOWER_TEMPLATE: u32 = 7;
/// Catalog id of the starting banner.
pub const BANNER_ASSET: u32 = 20;

/// Static banner asset, always referenced through the catalog.
#[derive(Debug, Default, Clone, PartialEq, Persist)]
pub struct Banner {
    pub motto: String,
    pub colors: [u8; 3],
}

#[derive(Debug, Default, Clone, PartialEq, Persist)]
pub struct Hero {
    pub name: String,
    pub level: u32,
    #[persist(version = 1, name = "xp")]
    #[persist(version = 2, name = "experience", formerly = "xp")]
    pub experience: u64,
    #[persist(version = 1)]
    #[persist(version = 2, removed)]
    pub mana: u32,
}

/// The whole persisted game state.
#[derive(Debug, Default, Persist)]
pub struct Campaign {
    pub day: u32,
    pub heroes: Vec<Hero>,
    pub banner: CatalogRef<Banner>,
    pub outposts: Vec<InstanceRef>,
    pub home: InstanceRef,
    pub flags: BTreeMap<String, bool>,
}

impl Campaign {
    pub fn hero_count(&self) -> usize {
        self.heroes.len()
    }
}

impl fmt::Display for Campaign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "day {}", self.day)?;
        for hero in &self.heroes {
            writeln!(
                f,
                "  hero {} (level {}, {} xp, {} mana)",
                hero.name, hero.level, hero.experience, hero.mana
            )?;
        }
        if let Some(banner) = self.banner.get() {
            writeln!(f, "  banner \"{}\" {:?}", banner.motto, banner.colors)?;
        }
        for (key, value) in &self.flags {
            writeln!(f, "  flag {key} = {value}")?;
        }
        write!(f, "  {} outposts", self.outposts.len())
    }
}

/// Builds the catalog every demo run shares.
pub fn build_catalog() -> Result<Catalog, CatalogError> {
    let mut catalog = Catalog::new();
    catalog.register_template(CAMP_TEMPLATE, "camp", MemoryTemplate { children: 2 })?;
    catalog.register_template(TOWER_TEMPLATE, "tower", MemoryTemplate { children: 0 })?;
    catalog.register(
        BANNER_ASSET,
        "banner",
        Banner {
            motto: "Hold the line".into(),
            colors: [200, 30, 30],
        },
    )?;
    Ok(catalog)
}

/// Places one camp hierarchy in `scene` with ids the way a spawn would
/// assign them, and returns its first guard.
pub fn place_camp(scene: &mut MemoryScene, top: &str, guard_id: &str) -> Option<Entity> {
    let root = scene.instantiate(2);
    scene.assign_instance_id(root, InstanceId::root(CAMP_TEMPLATE, top));
    let guard = scene.child(root, 1)?;
    scene.assign_instance_id(guard, InstanceId::new(CAMP_TEMPLATE, top, 1, guard_id));
    Some(guard)
}

/// Places a watchtower in `scene`.
pub fn place_tower(scene: &mut MemoryScene, top: &str) -> Entity {
    let root = scene.instantiate(0);
    scene.assign_instance_id(root, InstanceId::root(TOWER_TEMPLATE, top));
    root
}

/// Describes where `reference` points in `scene`.
pub fn describe(scene: &MemoryScene, reference: &InstanceRef) -> String {
    match reference.get() {
        Some(entity) => match scene.instance_id(entity) {
            Some(id) => format!("{entity} ({id})"),
            None => format!("{entity} (no id)"),
        },
        None => "none".to_owned(),
    }
}
