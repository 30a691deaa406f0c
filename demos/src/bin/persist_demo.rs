//! Persistence demo.
//!
//! Builds a campaign whose outposts live in a scene, saves it, then loads
//! the save into an empty scene so the outposts are spawned back from their
//! catalog templates.
//!
//! ```text
//! persist_demo --dir saves --schema 2
//! persist_demo --config persist.toml --format bincode
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use redlilium_persist::scene::{MemoryScene, OriginSpawn, SpawnLocation};
use redlilium_persist::serialize::Format;
use redlilium_persist::storage::FileSystemStorage;
use redlilium_persist::{CatalogRef, Environment, InstanceRef, PersistConfig, Serializer};
use redlilium_persist_demos::{
    BANNER_ASSET, Banner, Campaign, Hero, build_catalog, describe, place_camp, place_tower,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliFormat {
    /// Human-readable RON text
    Ron,
    /// Compact binary
    Bincode,
}

impl From<CliFormat> for Format {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Ron => Format::Ron,
            CliFormat::Bincode => Format::Bincode,
        }
    }
}

/// RedLilium Persist demo arguments.
#[derive(Parser, Debug)]
#[command(
    name = "persist_demo",
    about = "Save a campaign, then reload it into an empty scene",
    version
)]
struct Args {
    /// TOML config with path, format, schema_version and load_phases.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory saves are written under.
    #[arg(long, default_value = "saves")]
    dir: PathBuf,

    /// Override the document format.
    #[arg(long, value_enum)]
    format: Option<CliFormat>,

    /// Override the build's schema version.
    #[arg(long)]
    schema: Option<u32>,

    /// Keep the save file after the demo finishes.
    #[arg(long)]
    keep: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => PersistConfig::load(path)?,
        None => PersistConfig::new("campaign.ron"),
    };
    if let Some(format) = args.format {
        config = config.with_format(format.into());
    }
    if let Some(schema) = args.schema {
        config = config.with_schema_version(schema);
    }
    if !config.format.is_enabled() {
        return Err(format!("format '{}' is not enabled in this build", config.format).into());
    }
    log::info!(
        "Persist demo v{} writing {} under {}",
        redlilium_persist_demos::VERSION,
        config.path,
        args.dir.display()
    );

    let catalog = build_catalog()?;
    let mut serializer = Serializer::new(config, FileSystemStorage::new(&args.dir));

    // Save from a populated scene.
    let mut scene = MemoryScene::new();
    let guard = place_camp(&mut scene, "12", "13").ok_or("camp template has no guard")?;
    let tower = place_tower(&mut scene, "40");
    let campaign = Campaign {
        day: 17,
        heroes: vec![
            Hero {
                name: "Ayla".into(),
                level: 9,
                experience: 4_200,
                mana: 30,
            },
            Hero {
                name: "Bren".into(),
                level: 6,
                experience: 1_750,
                mana: 12,
            },
        ],
        banner: CatalogRef(catalog.get::<Banner>(BANNER_ASSET)),
        outposts: vec![InstanceRef::new(guard), InstanceRef::new(tower)],
        home: InstanceRef::new(guard),
        flags: BTreeMap::from([("bridge_repaired".to_owned(), true)]),
    };
    {
        let mut spawn = OriginSpawn;
        let env = Environment::new(&catalog, &mut scene, &mut spawn);
        serializer.save(&campaign, &env)?;
    }
    println!("Saved:\n{campaign}");

    // Load into an empty scene; outposts are spawned from their templates.
    let mut restored_scene = MemoryScene::new();
    let mut restored = Campaign::default();
    {
        let mut offset = 0.0;
        let mut spawn = |template: u32, top: &str| {
            offset += 10.0;
            log::info!("Placing template {template} ('{top}') at x = {offset}");
            SpawnLocation {
                position: [offset, 0.0, 0.0],
                ..Default::default()
            }
        };
        let mut env = Environment::new(&catalog, &mut restored_scene, &mut spawn);
        serializer.load(&mut restored, &mut env)?;
    }

    println!("Loaded:\n{restored}");
    println!("  home -> {}", describe(&restored_scene, &restored.home));
    for outpost in &restored.outposts {
        println!("  outpost -> {}", describe(&restored_scene, outpost));
    }
    println!(
        "  {} heroes, {} hierarchies spawned, {} instances linked",
        restored.hero_count(),
        restored_scene.spawn_count(),
        serializer.registry().len()
    );

    if !args.keep {
        serializer.delete_save()?;
    }
    Ok(())
}
