//! Headless station runner
//!
//! Builds a small scene (a smelting station fed from a chest, and an axe
//! station under a tree whose output rides a trail into a chest), ticks it
//! and reports what came out.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use glam::IVec3;
use tracing_subscriber::EnvFilter;

use formicary::core::{BlockPos, Facing, StationConfig};
use formicary::item::{ItemKind, ItemStack};
use formicary::port::ItemHandler;
use formicary::recipes::RecipeCatalog;
use formicary::station::{RangeId, SharedRecipes, Station};
use formicary::world::{Block, GridWorld, World};

#[derive(Parser, Debug)]
#[command(name = "station_sim")]
#[command(about = "Tick a small formicary scene and report the results")]
struct Args {
    /// World ticks to run
    #[arg(long, default_value_t = 2000)]
    ticks: u64,

    /// Seed for the stations' random sources
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Station configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Recipe catalog (TOML); built-in recipes otherwise
    #[arg(long)]
    recipes: Option<PathBuf>,

    /// Print the final station snapshots as JSON
    #[arg(long)]
    json: bool,
}

fn stack(id: &str, count: u32) -> ItemStack {
    ItemStack::new(ItemKind::named(id.to_string()), count)
}

fn build_station(
    pos: BlockPos,
    command: &str,
    ants: u32,
    config: &Arc<StationConfig>,
    recipes: &SharedRecipes,
    seed: u64,
) -> formicary::core::Result<Station> {
    let mut station = Station::new(pos, Facing::East, Arc::clone(config), Arc::clone(recipes))?.with_seed(seed);
    station.set_slot(RangeId::Command, 0, stack(command, 1));
    station.set_slot(RangeId::Pen, 0, stack(&config.population_item, ants));
    Ok(station)
}

fn run(args: Args) -> formicary::core::Result<()> {
    let config = match &args.config {
        Some(path) => StationConfig::load_from_toml(path)?,
        None => StationConfig::default(),
    };
    let config = Arc::new(config);
    let catalog = match &args.recipes {
        Some(path) => RecipeCatalog::load_from_toml(path)?,
        None => RecipeCatalog::with_defaults(),
    };
    let recipes: SharedRecipes = Arc::new(catalog);

    let mut world = GridWorld::new().with_floor(IVec3::ZERO, 8);

    // Smelter: chest behind, chest in front
    let smelter = IVec3::new(0, 1, 0);
    let ore_chest = IVec3::new(-1, 1, 0);
    let ingot_chest = IVec3::new(1, 1, 0);
    world.add_chest(ore_chest, 27);
    world.add_chest(ingot_chest, 27);
    if let Some(chest) = world.chest_mut(ore_chest) {
        chest.insert(stack("minecraft:iron_ore", 32), false);
        chest.insert(stack("minecraft:coal", 8), false);
        chest.insert(stack("minecraft:sugar", 16), false);
    }
    world.add_station(build_station(smelter, "minecraft:furnace", 32, &config, &recipes, args.seed)?);

    // Lumber: tree above, trail in front leading into a chest
    let lumber = IVec3::new(0, 1, 4);
    world.add_station(build_station(
        lumber,
        "minecraft:iron_axe",
        48,
        &config,
        &recipes,
        args.seed.wrapping_add(1),
    )?);
    for y in 2..6 {
        world.set_block(IVec3::new(0, y, 4), Block::log("minecraft:oak_log"));
    }
    for (dx, dz) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
        world.set_block(IVec3::new(dx, 5, 4 + dz), Block::leaves("minecraft:oak_leaves"));
    }
    for x in 1..4 {
        world.place_trail(IVec3::new(x, 1, 4), Facing::East, false);
    }
    let log_chest = IVec3::new(4, 1, 4);
    world.add_chest(log_chest, 27);

    tracing::info!("Running {} ticks (seed {})", args.ticks, args.seed);
    for _ in 0..args.ticks {
        world.tick();
    }

    let report = |world: &GridWorld, pos: BlockPos, id: &str| world.chest(pos).map(|c| c.count_of(id)).unwrap_or(0);
    tracing::info!(
        "Smelter: {} ingots delivered, {} ore left",
        report(&world, ingot_chest, "minecraft:iron_ingot"),
        report(&world, ore_chest, "minecraft:iron_ore")
    );
    tracing::info!(
        "Lumber: {} logs delivered, {} loose items",
        report(&world, log_chest, "minecraft:oak_log"),
        world.items().len()
    );
    for pos in [smelter, lumber] {
        if let Some(station) = world.station(pos) {
            tracing::info!(
                "Station at {:?}: {} ants, progress {}/{}, comparator {}",
                pos,
                station.colony().ant_count,
                station.state().progress,
                station.state().max_progress,
                station.signals().comparator()
            );
            if args.json {
                println!("{}", station.save().to_json()?);
            }
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run(Args::parse()) {
        tracing::error!("station_sim failed: {}", e);
        std::process::exit(1);
    }
}
