//! Tree felling - bounded flood fill over a trunk and its canopy
//!
//! The search runs in three passes:
//! 1. Trunk: breadth first from the struck cell through the lateral ring,
//!    straight up and diagonally up, while the cell has the struck trunk id.
//!    Canopy cells touching the trunk are recorded but not entered.
//! 2. Canopy: flood outwards from the recorded canopy, one ring per cell.
//! 3. Enclosed trunk: trunk cells the first pass could not reach but that
//!    are boxed in by found canopy and trunk.
//!
//! Trunk cells are destroyed before canopy cells. Every drop goes through the
//! caller's hook.

use std::collections::VecDeque;

use ahash::AHashSet;

use crate::core::types::{BlockPos, Facing, LATERAL_RING};
use crate::item::ItemStack;
use crate::world::{Material, World};

/// Largest cost a felling job can report
pub const MAX_COST: u32 = 65535;

/// Search bounds of a felling job
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FellingOptions {
    /// Trunk cells visited before the trunk pass gives up
    pub max_steps: usize,
    /// Canopy cells visited before the canopy pass gives up
    pub canopy_budget: usize,
    /// Horizontal (chessboard) distance from the origin
    pub max_radius: i32,
    /// Cells above the origin
    pub max_height: i32,
    /// Leave the struck cell standing
    pub exclude_origin: bool,
}

impl Default for FellingOptions {
    fn default() -> Self {
        Self {
            max_steps: 1024,
            canopy_budget: 1024,
            max_radius: 8,
            max_height: 32,
            exclude_origin: false,
        }
    }
}

/// Outcome of a felling job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FellingReport {
    /// Work cost in ticks, in [1, MAX_COST]
    pub cost: u32,
    /// Trunk cells found, origin included
    pub trunk: usize,
    pub canopy: usize,
    /// Cells actually destroyed
    pub removed: usize,
}

/// Cost of felling a structure of the given size
pub fn felling_cost(trunk: usize, canopy: usize) -> u32 {
    let raw = trunk as i64 * 6 / 5 + canopy as i64 / 10 - 1;
    raw.clamp(1, MAX_COST as i64) as u32
}

fn is_canopy(material: Material) -> bool {
    matches!(material, Material::Leaves | Material::Vine)
}

fn within(origin: BlockPos, pos: BlockPos, options: &FellingOptions) -> bool {
    let d = pos - origin;
    d.x.abs().max(d.z.abs()) <= options.max_radius && d.y >= 0 && d.y <= options.max_height
}

/// Trunk search neighbourhood: lateral ring, straight up, diagonal up
fn trunk_neighbours(pos: BlockPos) -> impl Iterator<Item = BlockPos> {
    let up = Facing::Up.offset();
    LATERAL_RING
        .into_iter()
        .map(move |d| pos + d)
        .chain(std::iter::once(pos + up))
        .chain(LATERAL_RING.into_iter().map(move |d| pos + d + up))
}

/// One ring around a canopy cell: lateral ring plus the cells above and below
fn canopy_ring(pos: BlockPos) -> impl Iterator<Item = BlockPos> {
    LATERAL_RING
        .into_iter()
        .map(move |d| pos + d)
        .chain([pos + Facing::Up.offset(), pos + Facing::Down.offset()])
}

/// Fell the tree whose trunk contains `origin`
///
/// `on_drop` receives every stack produced, along with the cell it came
/// from. A non-trunk origin fells nothing and still costs 1.
pub fn fell_tree<W, F>(world: &mut W, origin: BlockPos, options: FellingOptions, mut on_drop: F) -> FellingReport
where
    W: World + ?Sized,
    F: FnMut(&mut W, BlockPos, ItemStack),
{
    let root = world.block(origin);
    if root.material != Material::Log {
        return FellingReport {
            cost: 1,
            ..FellingReport::default()
        };
    }
    let trunk_id = root.id;

    // Pass 1: trunk
    let mut trunk: Vec<BlockPos> = vec![origin];
    let mut trunk_set: AHashSet<BlockPos> = AHashSet::from_iter([origin]);
    let mut canopy_seeds: Vec<BlockPos> = Vec::new();
    let mut canopy_set: AHashSet<BlockPos> = AHashSet::new();
    let mut queue: VecDeque<BlockPos> = VecDeque::from([origin]);
    let mut steps = 0;

    while let Some(pos) = queue.pop_front() {
        steps += 1;
        if steps > options.max_steps {
            break;
        }
        for next in trunk_neighbours(pos) {
            if !within(origin, next, &options) || trunk_set.contains(&next) || canopy_set.contains(&next) {
                continue;
            }
            let block = world.block(next);
            if block.material == Material::Log && block.id == trunk_id {
                trunk_set.insert(next);
                trunk.push(next);
                queue.push_back(next);
            } else if is_canopy(block.material) {
                canopy_set.insert(next);
                canopy_seeds.push(next);
            }
        }
    }

    // Pass 2: canopy
    let mut canopy = canopy_seeds.clone();
    let mut queue: VecDeque<BlockPos> = canopy_seeds.into_iter().collect();
    let mut visited = 0;
    while let Some(pos) = queue.pop_front() {
        visited += 1;
        if visited > options.canopy_budget {
            break;
        }
        for next in canopy_ring(pos) {
            if !within(origin, next, &options) || canopy_set.contains(&next) || trunk_set.contains(&next) {
                continue;
            }
            if is_canopy(world.block(next).material) {
                canopy_set.insert(next);
                canopy.push(next);
                queue.push_back(next);
            }
        }
    }

    // Pass 3: trunk cells boxed in by the canopy
    let sides = [Facing::North, Facing::South, Facing::East, Facing::West, Facing::Up];
    let mut enclosed: Vec<BlockPos> = Vec::new();
    for &leaf in &canopy {
        for next in canopy_ring(leaf) {
            if trunk_set.contains(&next) || enclosed.contains(&next) || !within(origin, next, &options) {
                continue;
            }
            let block = world.block(next);
            if block.material != Material::Log || block.id != trunk_id {
                continue;
            }
            let boxed = sides.iter().all(|f| {
                let side = f.step(next);
                canopy_set.contains(&side) || trunk_set.contains(&side)
            });
            if boxed {
                enclosed.push(next);
            }
        }
    }
    for pos in enclosed {
        trunk_set.insert(pos);
        trunk.push(pos);
    }

    let mut removed = 0;
    for &pos in trunk.iter().chain(canopy.iter()) {
        if options.exclude_origin && pos == origin {
            continue;
        }
        for drop in world.destroy_block(pos) {
            on_drop(world, pos, drop);
        }
        removed += 1;
    }

    let report = FellingReport {
        cost: felling_cost(trunk.len(), canopy.len()),
        trunk: trunk.len(),
        canopy: canopy.len(),
        removed,
    };
    tracing::debug!(
        "Felled tree at {:?}: {} trunk, {} canopy, cost {}",
        origin,
        report.trunk,
        report.canopy,
        report.cost
    );
    report
}

/// Whether `pos` holds a fellable trunk
pub fn is_trunk<W: World + ?Sized>(world: &W, pos: BlockPos) -> bool {
    world.block(pos).material == Material::Log
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Block, GridWorld};
    use glam::IVec3;

    fn collect(world: &mut GridWorld, origin: BlockPos, options: FellingOptions) -> (FellingReport, Vec<ItemStack>) {
        let mut drops = Vec::new();
        let report = fell_tree(world, origin, options, |_, _, stack| drops.push(stack));
        (report, drops)
    }

    #[test]
    fn test_cost_formula() {
        assert_eq!(felling_cost(1, 0), 1);
        assert_eq!(felling_cost(5, 20), 7);
        assert_eq!(felling_cost(100_000, 0), MAX_COST);
    }

    #[test]
    fn test_isolated_trunk() {
        let mut world = GridWorld::new();
        let origin = IVec3::new(0, 1, 0);
        world.set_block(origin, Block::log("minecraft:oak_log"));
        let (report, drops) = collect(&mut world, origin, FellingOptions::default());
        assert_eq!(report.cost, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(drops.len(), 1);
        assert!(world.block(origin).is_air());
    }

    #[test]
    fn test_isolated_trunk_origin_excluded() {
        let mut world = GridWorld::new();
        let origin = IVec3::new(0, 1, 0);
        world.set_block(origin, Block::log("minecraft:oak_log"));
        let options = FellingOptions {
            exclude_origin: true,
            ..FellingOptions::default()
        };
        let (report, drops) = collect(&mut world, origin, options);
        assert_eq!(report.cost, 1);
        assert_eq!(report.removed, 0);
        assert!(drops.is_empty());
        assert!(!world.block(origin).is_air());
    }

    #[test]
    fn test_trunk_and_canopy() {
        let mut world = GridWorld::new();
        let base = IVec3::new(0, 1, 0);
        for y in 0..4 {
            world.set_block(base + IVec3::new(0, y, 0), Block::log("minecraft:oak_log"));
        }
        // Canopy ring around the top two trunk cells plus a cap
        for y in 2..4 {
            for d in LATERAL_RING {
                world.set_block(base + IVec3::new(0, y, 0) + d, Block::leaves("minecraft:oak_leaves"));
            }
        }
        world.set_block(base + IVec3::new(0, 4, 0), Block::leaves("minecraft:oak_leaves"));
        // A different tree's log is left alone
        world.set_block(IVec3::new(5, 1, 0), Block::log("minecraft:birch_log"));

        let (report, drops) = collect(&mut world, base, FellingOptions::default());
        assert_eq!(report.trunk, 4);
        assert_eq!(report.canopy, 17);
        assert_eq!(report.cost, felling_cost(4, 17));
        // Leaves drop nothing, every log drops itself
        assert_eq!(drops.len(), 4);
        assert!(world.block(base + IVec3::new(1, 3, 1)).is_air());
        assert!(!world.block(IVec3::new(5, 1, 0)).is_air());
    }

    #[test]
    fn test_step_budget_bounds_search() {
        let mut world = GridWorld::new();
        let base = IVec3::new(0, 1, 0);
        for y in 0..20 {
            world.set_block(base + IVec3::new(0, y, 0), Block::log("minecraft:oak_log"));
        }
        let options = FellingOptions {
            max_steps: 5,
            ..FellingOptions::default()
        };
        let (report, _) = collect(&mut world, base, options);
        assert_eq!(report.trunk, 6);
        assert!(!world.block(base + IVec3::new(0, 10, 0)).is_air());
    }

    #[test]
    fn test_non_trunk_origin_fells_nothing() {
        let mut world = GridWorld::new();
        let origin = IVec3::new(0, 1, 0);
        world.set_block(origin, Block::solid("minecraft:stone"));
        let (report, drops) = collect(&mut world, origin, FellingOptions::default());
        assert_eq!(report, FellingReport { cost: 1, ..FellingReport::default() });
        assert!(drops.is_empty());
    }
}
