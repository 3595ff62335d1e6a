//! Items riding trails through a whole world

use std::sync::Arc;

use formicary::core::{Facing, StationConfig};
use formicary::item::{ItemKind, ItemStack};
use formicary::recipes::RecipeCatalog;
use formicary::station::{RangeId, Station};
use formicary::trail::TRAIL_HEIGHT;
use formicary::world::{Block, GridWorld, World};
use glam::{IVec3, Vec3};

fn stack(id: &str, count: u32) -> ItemStack {
    ItemStack::new(ItemKind::named(id.to_string()), count)
}

fn on_trail(x: i32, z: i32) -> Vec3 {
    Vec3::new(x as f32 + 0.5, 1.0 + TRAIL_HEIGHT, z as f32 + 0.5)
}

fn run(world: &mut GridWorld, ticks: usize) {
    for _ in 0..ticks {
        world.tick();
    }
}

#[test]
fn test_line_delivers_into_chest() {
    let mut world = GridWorld::new().with_floor(IVec3::ZERO, 6);
    for x in 0..4 {
        world.place_trail(IVec3::new(x, 1, 0), Facing::East, false);
    }
    let chest = IVec3::new(4, 1, 0);
    world.add_chest(chest, 9);
    world.spawn_item(on_trail(0, 0), stack("minecraft:cobblestone", 12));

    run(&mut world, 200);
    assert_eq!(world.chest(chest).map(|c| c.count_of("minecraft:cobblestone")), Some(12));
    assert!(world.items().is_empty());
}

#[test]
fn test_item_waits_at_dead_end() {
    let mut world = GridWorld::new().with_floor(IVec3::ZERO, 6);
    for x in 0..3 {
        world.place_trail(IVec3::new(x, 1, 0), Facing::East, false);
    }
    let id = world.spawn_item(on_trail(0, 0), stack("minecraft:sand", 1));

    run(&mut world, 200);
    let entity = world.item_entity(id).expect("item stays in the world");
    assert!(entity.position.x > 2.0);
    assert!(entity.position.x < 5.0);
}

#[test]
fn test_items_climb_onto_raised_trail() {
    let mut world = GridWorld::new().with_floor(IVec3::ZERO, 6);
    world.set_block(IVec3::new(1, 1, 0), Block::solid("minecraft:stone"));
    world.place_trail(IVec3::new(0, 1, 0), Facing::East, false);
    world.place_trail(IVec3::new(1, 2, 0), Facing::East, false);
    let chest = IVec3::new(2, 2, 0);
    world.add_chest(chest, 9);
    world.spawn_item(on_trail(0, 0), stack("minecraft:sand", 2));

    run(&mut world, 400);
    assert_eq!(world.chest(chest).map(|c| c.count_of("minecraft:sand")), Some(2));
    assert!(world.items().is_empty());
}

#[test]
fn test_frame_filter_sorts_onto_branch() {
    let mut world = GridWorld::new().with_floor(IVec3::ZERO, 6);
    let junction = IVec3::new(1, 1, 0);
    world.place_trail(IVec3::new(0, 1, 0), Facing::East, false);
    world.place_trail(junction, Facing::East, false);
    // Facing east, the left branch runs north
    world.place_trail(IVec3::new(1, 1, -1), Facing::North, false);
    world.place_trail(IVec3::new(1, 1, -2), Facing::North, false);
    let main_chest = IVec3::new(2, 1, 0);
    let branch_chest = IVec3::new(1, 1, -3);
    world.add_chest(main_chest, 9);
    world.add_chest(branch_chest, 9);
    world.set_frame(junction, Facing::North, stack("minecraft:sand", 1));

    world.spawn_item(on_trail(0, 0), stack("minecraft:sand", 3));
    world.spawn_item(on_trail(0, 0), stack("minecraft:gravel", 2));

    run(&mut world, 300);
    let count = |pos: IVec3, id: &str| world.chest(pos).map(|c| c.count_of(id)).unwrap_or(0);
    assert_eq!(count(branch_chest, "minecraft:sand"), 3);
    assert_eq!(count(main_chest, "minecraft:gravel"), 2);
    assert_eq!(count(main_chest, "minecraft:sand"), 0);
}

#[test]
fn test_station_output_rides_trail_to_chest() {
    let mut world = GridWorld::new().with_floor(IVec3::ZERO, 6);
    let config = Arc::new(StationConfig::default());
    let mut station = Station::new(IVec3::new(0, 1, 0), Facing::East, config, Arc::new(RecipeCatalog::with_defaults()))
        .expect("default bindings are valid");
    assert!(station.set_slot(RangeId::Output, 0, stack("minecraft:cobblestone", 5)));
    assert!(station.set_slot(RangeId::Output, 1, stack("minecraft:dirt", 3)));
    world.add_station(station);
    for x in 1..4 {
        world.place_trail(IVec3::new(x, 1, 0), Facing::East, false);
    }
    let chest = IVec3::new(4, 1, 0);
    world.add_chest(chest, 9);

    run(&mut world, 400);
    let delivered = world.chest(chest).map(|c| c.count_of("minecraft:cobblestone") + c.count_of("minecraft:dirt"));
    assert_eq!(delivered, Some(8));
    let station = world.station(IVec3::new(0, 1, 0)).expect("station still placed");
    assert!(station.layout().output.is_empty(station.store()));
}
