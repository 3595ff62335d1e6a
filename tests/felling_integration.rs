//! Tree felling against the in-memory world

use formicary::core::BlockPos;
use formicary::felling::{fell_tree, felling_cost, FellingOptions, FellingReport};
use formicary::item::ItemStack;
use formicary::world::{Block, GridWorld, World};
use glam::IVec3;

fn fell(world: &mut GridWorld, origin: BlockPos) -> (FellingReport, Vec<(BlockPos, ItemStack)>) {
    let mut drops = Vec::new();
    let report = fell_tree(world, origin, FellingOptions::default(), |_, pos, stack| drops.push((pos, stack)));
    (report, drops)
}

#[test]
fn test_log_boxed_in_by_leaves_is_taken() {
    let mut world = GridWorld::new();
    for y in 1..4 {
        world.set_block(IVec3::new(0, y, 0), Block::log("minecraft:oak_log"));
    }
    for dx in -1..=1 {
        for dz in -1..=1 {
            if dx != 0 || dz != 0 {
                world.set_block(IVec3::new(dx, 3, dz), Block::leaves("minecraft:oak_leaves"));
            }
        }
    }
    // A detached log wrapped in leaves on every side but below
    let hidden = IVec3::new(2, 3, 0);
    world.set_block(hidden, Block::log("minecraft:oak_log"));
    for pos in [
        IVec3::new(2, 3, -1),
        IVec3::new(2, 3, 1),
        IVec3::new(3, 3, 0),
        IVec3::new(1, 4, 0),
        IVec3::new(2, 4, 0),
    ] {
        world.set_block(pos, Block::leaves("minecraft:oak_leaves"));
    }

    let (report, drops) = fell(&mut world, IVec3::new(0, 1, 0));
    assert_eq!(report.trunk, 4);
    assert_eq!(report.canopy, 13);
    assert_eq!(report.cost, felling_cost(4, 13));
    assert_eq!(report.removed, 17);
    assert!(world.block(hidden).is_air());
    assert_eq!(drops.iter().filter(|(_, s)| s.is("minecraft:oak_log")).count(), 4);
}

#[test]
fn test_radius_bounds_a_long_branch() {
    let mut world = GridWorld::new();
    for x in 0..12 {
        world.set_block(IVec3::new(x, 1, 0), Block::log("minecraft:oak_log"));
    }
    let (report, _) = fell(&mut world, IVec3::new(0, 1, 0));
    assert_eq!(report.trunk, 9);
    assert!(world.block(IVec3::new(8, 1, 0)).is_air());
    assert!(!world.block(IVec3::new(9, 1, 0)).is_air());
}

#[test]
fn test_touching_tree_of_other_wood_survives() {
    let mut world = GridWorld::new();
    for y in 1..4 {
        world.set_block(IVec3::new(0, y, 0), Block::log("minecraft:oak_log"));
        world.set_block(IVec3::new(1, y, 0), Block::log("minecraft:birch_log"));
    }
    let (report, drops) = fell(&mut world, IVec3::new(0, 1, 0));
    assert_eq!(report.trunk, 3);
    assert_eq!(drops.len(), 3);
    for y in 1..4 {
        assert!(world.block(IVec3::new(0, y, 0)).is_air());
        assert!(!world.block(IVec3::new(1, y, 0)).is_air());
    }
}

#[test]
fn test_search_never_goes_below_origin() {
    let mut world = GridWorld::new();
    for y in 0..4 {
        world.set_block(IVec3::new(0, y, 0), Block::log("minecraft:oak_log"));
    }
    let (report, _) = fell(&mut world, IVec3::new(0, 2, 0));
    assert_eq!(report.trunk, 2);
    assert!(!world.block(IVec3::new(0, 1, 0)).is_air());
}
