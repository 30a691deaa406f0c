use std::collections::BTreeMap;
use std::sync::Arc;

use redlilium_persist::scene::{MemoryScene, MemoryTemplate, OriginSpawn};
use redlilium_persist::serialize::{Document, Value};
use redlilium_persist::storage::{FileSystemStorage, MemoryStorage};
use redlilium_persist::{
    Catalog, CatalogRef, DeserializeContext, Environment, FieldError, InstanceRef, Persist,
    PersistConfig, Scene, SchemaVersion, SerializeContext, SerializeError, Serializer,
};

// ---------------------------------------------------------------------------
// Host types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq, Persist)]
struct Stats {
    pub strength: u32,
    pub agility: f32,
}

#[derive(Debug, Default, PartialEq, Persist)]
struct Profile {
    pub name: String,
    pub level: u8,
    pub stats: Stats,
    pub history: Vec<i64>,
    pub party: Vec<Stats>,
    pub tags: BTreeMap<String, u32>,
    pub nickname: Option<String>,
    pub grid: [u16; 3],
    #[persist(include)]
    secret: u64,
    cache: u32,
    #[persist(skip)]
    pub scratch: bool,
    #[persist(serde)]
    pub color: (u8, u8, u8),
}

#[derive(Debug, Default, PartialEq, Persist)]
struct Pair(pub u32, pub String);

#[derive(Debug, Default, PartialEq, Persist)]
struct Slot<T> {
    pub item: T,
    pub count: u32,
}

#[derive(Debug, Default, PartialEq, Persist)]
struct ScoreSheet {
    #[persist(serde)]
    pub by_level: BTreeMap<u32, u64>,
}

#[derive(Debug, Default, PartialEq, Persist)]
struct Weapon {
    pub damage: u32,
}

#[derive(Debug, Default, Persist)]
struct Loadout {
    pub weapon: CatalogRef<Weapon>,
    pub backup: CatalogRef<Weapon>,
    pub gold: u32,
}

#[derive(Debug, Default, Persist)]
struct Squad {
    pub members: Vec<InstanceRef>,
    pub leader: InstanceRef,
}

/// Stores its weapon by value rather than by catalog id.
#[derive(Debug, Default, Persist)]
#[persist(custom)]
struct Forge {
    weapon: CatalogRef<Weapon>,
    heat: u32,
}

impl Persist for Forge {
    const NAME: &'static str = "Forge";

    fn save(&self, ctx: &mut SerializeContext<'_>) -> Result<(), SerializeError> {
        ctx.write_with("weapon", &self.weapon, false)?;
        ctx.write("heat", &self.heat)
    }

    fn load(&mut self, ctx: &mut DeserializeContext<'_>) -> Result<(), FieldError> {
        ctx.read("weapon", &mut self.weapon);
        ctx.read("heat", &mut self.heat);
        Ok(())
    }
}

fn sample_profile() -> Profile {
    Profile {
        name: "Ayla".into(),
        level: 12,
        stats: Stats {
            strength: 7,
            agility: 1.5,
        },
        history: vec![-3, 0, 40],
        party: vec![
            Stats {
                strength: 1,
                agility: 0.25,
            },
            Stats {
                strength: 2,
                agility: 0.5,
            },
        ],
        tags: BTreeMap::from([("quests".to_owned(), 3), ("deaths".to_owned(), 1)]),
        nickname: Some("Ay".into()),
        grid: [4, 5, 6],
        secret: 99,
        cache: 17,
        scratch: true,
        color: (255, 128, 0),
    }
}

fn templates() -> Catalog {
    let mut catalog = Catalog::new();
    catalog
        .register_template(5, "squad", MemoryTemplate { children: 2 })
        .unwrap();
    catalog
        .register_template(7, "lone", MemoryTemplate { children: 0 })
        .unwrap();
    catalog
}

fn squad_document(members: &[&str], leader: &str) -> Document {
    Document::new(
        SchemaVersion::new(1),
        Value::Map(vec![
            (
                "members".into(),
                Value::List(
                    members
                        .iter()
                        .map(|id| Value::Instance((*id).to_owned()))
                        .collect(),
                ),
            ),
            ("leader".into(), Value::Instance(leader.to_owned())),
        ]),
    )
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn round_trip_reproduces_eligible_fields() {
    let storage = MemoryStorage::new();
    let mut serializer = Serializer::new(PersistConfig::new("profile.ron"), storage.clone());
    let catalog = Catalog::new();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut env = Environment::new(&catalog, &mut scene, &mut spawn);

    serializer.save(&sample_profile(), &env).unwrap();
    let text = String::from_utf8(storage.get("profile.ron").unwrap()).unwrap();
    assert!(text.contains("Ayla"));

    let mut loaded = Profile::default();
    serializer.load(&mut loaded, &mut env).unwrap();

    let expected = Profile {
        cache: 0,
        scratch: false,
        ..sample_profile()
    };
    assert_eq!(loaded, expected);
}

#[test]
fn private_and_skipped_fields_are_not_written() {
    let serializer = Serializer::new(PersistConfig::default(), MemoryStorage::new());
    let catalog = Catalog::new();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let env = Environment::new(&catalog, &mut scene, &mut spawn);

    let document = serializer.save_to_document(&sample_profile(), &env).unwrap();
    let data = &document.data;
    assert!(data.get("secret").is_some());
    assert!(data.get("cache").is_none());
    assert!(data.get("scratch").is_none());
    assert_eq!(
        data.get("color"),
        Some(&Value::List(vec![
            Value::U64(255),
            Value::U64(128),
            Value::U64(0)
        ]))
    );
}

#[test]
fn tuple_structs_use_positional_names() {
    let mut serializer = Serializer::new(PersistConfig::default(), MemoryStorage::new());
    let catalog = Catalog::new();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut env = Environment::new(&catalog, &mut scene, &mut spawn);

    serializer.save(&Pair(3, "three".into()), &env).unwrap();
    let data = &serializer.document().unwrap().data;
    assert_eq!(data.get("0"), Some(&Value::U64(3)));
    assert_eq!(data.get("1"), Some(&Value::String("three".into())));

    let mut loaded = Pair::default();
    serializer.load(&mut loaded, &mut env).unwrap();
    assert_eq!(loaded, Pair(3, "three".into()));
}

#[test]
fn generic_hosts_round_trip() {
    let mut serializer = Serializer::new(PersistConfig::default(), MemoryStorage::new());
    let catalog = Catalog::new();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut env = Environment::new(&catalog, &mut scene, &mut spawn);

    let slot = Slot {
        item: Slot {
            item: "arrow".to_owned(),
            count: 2,
        },
        count: 30,
    };
    serializer.save(&slot, &env).unwrap();

    let mut loaded: Slot<Slot<String>> = Slot::default();
    serializer.load(&mut loaded, &mut env).unwrap();
    assert_eq!(loaded, slot);
}

#[test]
fn serde_field_with_integer_keys_round_trips() {
    let mut serializer = Serializer::new(PersistConfig::default(), MemoryStorage::new());
    let catalog = Catalog::new();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut env = Environment::new(&catalog, &mut scene, &mut spawn);

    let sheet = ScoreSheet {
        by_level: BTreeMap::from([(1, 10), (2, 20)]),
    };
    serializer.save(&sheet, &env).unwrap();

    let mut loaded = ScoreSheet::default();
    serializer.load(&mut loaded, &mut env).unwrap();
    assert_eq!(loaded, sheet);
}

#[test]
fn filesystem_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = PersistConfig::new("slots/one.ron");
    let mut serializer = Serializer::new(config, FileSystemStorage::new(dir.path()));
    let catalog = Catalog::new();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut env = Environment::new(&catalog, &mut scene, &mut spawn);

    serializer.save(&sample_profile(), &env).unwrap();
    assert!(dir.path().join("slots/one.ron").exists());

    let mut loaded = Profile::default();
    serializer.load(&mut loaded, &mut env).unwrap();
    assert_eq!(loaded.name, "Ayla");
    assert_eq!(loaded.party.len(), 2);

    serializer.delete_save().unwrap();
    assert!(!serializer.has_save());
}

#[cfg(feature = "bincode")]
#[test]
fn bincode_round_trip() {
    use redlilium_persist::serialize::Format;

    let config = PersistConfig::new("profile.bin").with_format(Format::Bincode);
    let mut serializer = Serializer::new(config, MemoryStorage::new());
    let catalog = Catalog::new();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut env = Environment::new(&catalog, &mut scene, &mut spawn);

    serializer.save(&sample_profile(), &env).unwrap();
    let mut loaded = Profile::default();
    serializer.load(&mut loaded, &mut env).unwrap();
    assert_eq!(loaded.tags, sample_profile().tags);
    assert_eq!(loaded.grid, [4, 5, 6]);
}

// ---------------------------------------------------------------------------
// Schema migration
// ---------------------------------------------------------------------------

mod v1 {
    use redlilium_persist::Persist;

    #[derive(Debug, Default, Persist)]
    pub struct Player {
        #[persist(version = 1, name = "score")]
        pub points: u32,
    }
}

mod v2 {
    use redlilium_persist::Persist;

    #[derive(Debug, Default, Persist)]
    pub struct Player {
        #[persist(version = 1, name = "score")]
        #[persist(version = 2, name = "points", formerly = "score")]
        pub points: u32,
    }
}

#[test]
fn renamed_field_loads_from_older_document() {
    let storage = MemoryStorage::new();
    let catalog = Catalog::new();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut env = Environment::new(&catalog, &mut scene, &mut spawn);

    let mut old_build = Serializer::new(
        PersistConfig::new("player.ron").with_schema_version(1),
        storage.clone(),
    );
    old_build.save(&v1::Player { points: 250 }, &env).unwrap();
    assert_eq!(
        old_build.document().unwrap().data.get("score"),
        Some(&Value::U64(250))
    );

    let mut new_build = Serializer::new(
        PersistConfig::new("player.ron").with_schema_version(2),
        storage,
    );
    let mut player = v2::Player::default();
    new_build.load(&mut player, &mut env).unwrap();
    assert_eq!(player.points, 250);

    new_build.save(&player, &env).unwrap();
    let data = &new_build.document().unwrap().data;
    assert_eq!(data.get("points"), Some(&Value::U64(250)));
    assert!(data.get("score").is_none());
    assert_eq!(new_build.document().unwrap().schema_version, SchemaVersion::new(2));
}

#[derive(Debug, Default, Persist)]
struct Armory {
    pub swords: u32,
    #[persist(version = 1)]
    #[persist(version = 3, removed)]
    pub ammo: u32,
}

#[test]
fn removed_field_is_neither_written_nor_read() {
    let mut serializer = Serializer::new(
        PersistConfig::default().with_schema_version(3),
        MemoryStorage::new(),
    );
    let catalog = Catalog::new();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut env = Environment::new(&catalog, &mut scene, &mut spawn);

    let document = serializer
        .save_to_document(&Armory { swords: 2, ammo: 30 }, &env)
        .unwrap();
    assert!(document.data.get("ammo").is_none());
    assert_eq!(document.data.get("swords"), Some(&Value::U64(2)));

    let stale = Document::new(
        SchemaVersion::new(2),
        Value::Map(vec![
            ("swords".into(), Value::U64(3)),
            ("ammo".into(), Value::U64(50)),
        ]),
    );
    let mut armory = Armory { swords: 0, ammo: 7 };
    serializer.load_document(stale, &mut armory, &mut env).unwrap();
    assert_eq!(armory.swords, 3);
    assert_eq!(armory.ammo, 7);
}

#[test]
fn missing_fields_keep_their_values() {
    let mut serializer = Serializer::new(PersistConfig::default(), MemoryStorage::new());
    let catalog = Catalog::new();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut env = Environment::new(&catalog, &mut scene, &mut spawn);

    let partial = Document::new(
        SchemaVersion::new(1),
        Value::Map(vec![
            ("level".into(), Value::U64(4)),
            ("name".into(), Value::Bool(true)),
        ]),
    );
    let mut profile = sample_profile();
    serializer.load_document(partial, &mut profile, &mut env).unwrap();
    assert_eq!(profile.level, 4);
    assert_eq!(profile.name, "Ayla");
    assert_eq!(profile.history, vec![-3, 0, 40]);
}

// ---------------------------------------------------------------------------
// Catalog references
// ---------------------------------------------------------------------------

#[test]
fn catalog_references_round_trip_by_id() {
    let mut catalog = Catalog::new();
    let sword = catalog.register(3, "sword", Weapon { damage: 9 }).unwrap();
    let mut serializer = Serializer::new(PersistConfig::default(), MemoryStorage::new());
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut env = Environment::new(&catalog, &mut scene, &mut spawn);

    let loadout = Loadout {
        weapon: CatalogRef::new(sword.clone()),
        backup: CatalogRef::default(),
        gold: 5,
    };
    serializer.save(&loadout, &env).unwrap();
    let data = &serializer.document().unwrap().data;
    assert_eq!(data.get("weapon"), Some(&Value::Catalog(3)));
    assert!(data.get("backup").is_none());

    let mut loaded = Loadout::default();
    serializer.load(&mut loaded, &mut env).unwrap();
    assert!(Arc::ptr_eq(loaded.weapon.get().unwrap(), &sword));
    assert!(loaded.backup.is_none());
    assert_eq!(loaded.gold, 5);
}

#[test]
fn missing_catalog_asset_nulls_the_field_only() {
    let mut catalog = Catalog::new();
    let sword = catalog.register(3, "sword", Weapon { damage: 9 }).unwrap();
    let mut serializer = Serializer::new(PersistConfig::default(), MemoryStorage::new());
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut env = Environment::new(&catalog, &mut scene, &mut spawn);

    let document = Document::new(
        SchemaVersion::new(1),
        Value::Map(vec![
            ("weapon".into(), Value::Catalog(3)),
            ("backup".into(), Value::Catalog(42)),
            ("gold".into(), Value::U64(11)),
        ]),
    );
    let mut loadout = Loadout {
        backup: CatalogRef::new(sword.clone()),
        ..Loadout::default()
    };
    serializer.load_document(document, &mut loadout, &mut env).unwrap();
    assert!(loadout.backup.is_none());
    assert_eq!(loadout.weapon, CatalogRef::new(sword));
    assert_eq!(loadout.gold, 11);
}

#[test]
fn custom_host_embeds_asset_by_value() {
    let mut catalog = Catalog::new();
    let axe = catalog.register(8, "axe", Weapon { damage: 21 }).unwrap();
    let mut serializer = Serializer::new(PersistConfig::default(), MemoryStorage::new());
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut env = Environment::new(&catalog, &mut scene, &mut spawn);

    let forge = Forge {
        weapon: CatalogRef::new(axe.clone()),
        heat: 900,
    };
    serializer.save(&forge, &env).unwrap();
    let stored = serializer.document().unwrap().data.get("weapon").cloned();
    assert_eq!(
        stored,
        Some(Value::Map(vec![("damage".into(), Value::U64(21))]))
    );

    let mut loaded = Forge::default();
    serializer.load(&mut loaded, &mut env).unwrap();
    let weapon = loaded.weapon.get().unwrap();
    assert_eq!(**weapon, Weapon { damage: 21 });
    assert!(!Arc::ptr_eq(weapon, &axe));
    assert_eq!(loaded.heat, 900);
}

// ---------------------------------------------------------------------------
// Live-instance references
// ---------------------------------------------------------------------------

#[test]
fn phase_zero_spawns_and_later_phases_link() {
    let catalog = templates();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut serializer = Serializer::new(PersistConfig::default(), MemoryStorage::new());

    let mut squad = Squad::default();
    {
        let mut env = Environment::new(&catalog, &mut scene, &mut spawn);
        serializer
            .load_document(squad_document(&["5.12.1.12"], "5.12.1.12"), &mut squad, &mut env)
            .unwrap();
    }

    assert_eq!(scene.spawn_count(), 1);
    let registry = serializer.registry();
    let top = registry.top("12").unwrap();
    let child = registry.get("12").unwrap();
    assert_eq!(scene.child(top, 1), Some(child));
    assert_eq!(squad.members, vec![InstanceRef::new(child)]);
    assert_eq!(squad.leader.get(), Some(child));
    assert_eq!(scene.instance_id(child).unwrap().to_string(), "5.12.1.12");
    assert_eq!(scene.instance_id(top).unwrap().to_string(), "5.12.0.12");
}

#[test]
fn extra_phases_never_spawn_twice() {
    let catalog = templates();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut serializer = Serializer::new(
        PersistConfig::default().with_load_phases(4),
        MemoryStorage::new(),
    );

    let mut squad = Squad::default();
    {
        let mut env = Environment::new(&catalog, &mut scene, &mut spawn);
        let document = squad_document(&["5.30.1.31", "5.30.2.32", "7.40.0.40"], "5.30.2.32");
        serializer.load_document(document, &mut squad, &mut env).unwrap();
    }

    assert_eq!(scene.spawn_count(), 2);
    assert_eq!(squad.members.len(), 3);
    assert_eq!(squad.leader, squad.members[1]);
    assert_ne!(squad.members[0], squad.members[1]);
    assert_eq!(serializer.registry().len(), 4);
    assert_eq!(serializer.registry().top_level_len(), 2);
}

#[test]
fn plain_reference_links_to_spawned_root() {
    let catalog = templates();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut serializer = Serializer::new(PersistConfig::default(), MemoryStorage::new());

    let mut squad = Squad::default();
    {
        let mut env = Environment::new(&catalog, &mut scene, &mut spawn);
        serializer
            .load_document(squad_document(&["5.40.1.41"], "5.40.0.40"), &mut squad, &mut env)
            .unwrap();
    }

    assert_eq!(scene.spawn_count(), 1);
    let root = serializer.registry().top("40").unwrap();
    assert_eq!(squad.leader.get(), Some(root));
    assert_eq!(scene.child(root, 1), squad.members[0].get());
}

#[test]
fn unresolvable_references_become_null() {
    let catalog = templates();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut serializer = Serializer::new(PersistConfig::default(), MemoryStorage::new());

    let mut squad = Squad::default();
    {
        let mut env = Environment::new(&catalog, &mut scene, &mut spawn);
        let document = squad_document(&["99.1.0.1", "7.2.5.3", "bad-id", "5.4.1.4"], "5.77.0.77");
        serializer.load_document(document, &mut squad, &mut env).unwrap();
    }

    assert_eq!(squad.members.len(), 4);
    assert!(squad.members[0].is_none());
    assert!(squad.members[1].is_none());
    assert!(squad.members[2].is_none());
    assert!(!squad.members[3].is_none());
    assert!(squad.leader.is_none());
}

#[test]
fn spawn_location_provider_places_new_hierarchies() {
    let catalog = templates();
    let mut scene = MemoryScene::new();
    let mut spawn = |_template: u32, _top: &str| redlilium_persist::SpawnLocation {
        position: [1.0, 2.0, 3.0],
        ..Default::default()
    };
    let mut serializer = Serializer::new(PersistConfig::default(), MemoryStorage::new());

    let mut squad = Squad::default();
    {
        let mut env = Environment::new(&catalog, &mut scene, &mut spawn);
        serializer
            .load_document(squad_document(&["7.8.0.8"], "7.8.0.8"), &mut squad, &mut env)
            .unwrap();
    }
    let root = squad.leader.get().unwrap();
    assert_eq!(scene.location(root).unwrap().position, [1.0, 2.0, 3.0]);
}

#[test]
fn saved_scene_reloads_into_fresh_scene() {
    let catalog = templates();
    let mut spawn = OriginSpawn;
    let storage = MemoryStorage::new();

    let mut source = MemoryScene::new();
    let root = source.instantiate(2);
    let guard = source.child(root, 2).unwrap();
    source.assign_instance_id(root, redlilium_persist::InstanceId::root(5, "60"));
    source.assign_instance_id(guard, "5.60.2.61".parse().unwrap());
    let squad = Squad {
        members: vec![InstanceRef::new(guard)],
        leader: InstanceRef::new(guard),
    };
    {
        let env = Environment::new(&catalog, &mut source, &mut spawn);
        let mut serializer = Serializer::new(PersistConfig::default(), storage.clone());
        serializer.save(&squad, &env).unwrap();
        assert_eq!(
            serializer.document().unwrap().data.get("leader"),
            Some(&Value::Instance("5.60.2.61".into()))
        );
    }

    let mut target = MemoryScene::new();
    let mut loaded = Squad::default();
    {
        let mut env = Environment::new(&catalog, &mut target, &mut spawn);
        let mut serializer = Serializer::new(PersistConfig::default(), storage);
        serializer.load(&mut loaded, &mut env).unwrap();
    }
    let leader = loaded.leader.get().unwrap();
    assert_eq!(target.instance_id(leader).unwrap().to_string(), "5.60.2.61");
    assert_eq!(target.find("61"), Some(leader));
}

#[test]
fn loading_twice_gives_equal_graphs() {
    let catalog = templates();
    let mut scene = MemoryScene::new();
    let mut spawn = OriginSpawn;
    let mut serializer = Serializer::new(PersistConfig::default(), MemoryStorage::new());
    let document = squad_document(&["5.12.1.12", "5.12.2.13"], "5.12.2.13");

    let mut ids = Vec::new();
    for _ in 0..2 {
        let mut squad = Squad::default();
        {
            let mut env = Environment::new(&catalog, &mut scene, &mut spawn);
            serializer
                .load_document(document.clone(), &mut squad, &mut env)
                .unwrap();
        }
        let members: Vec<String> = squad
            .members
            .iter()
            .map(|m| scene.instance_id(m.get().unwrap()).unwrap().to_string())
            .collect();
        let leader = scene
            .instance_id(squad.leader.get().unwrap())
            .unwrap()
            .to_string();
        ids.push((members, leader));
    }

    assert_eq!(ids[0], ids[1]);
    assert_eq!(ids[0].1, "5.12.2.13");
}
