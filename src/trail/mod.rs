//! Ant trails - floor cells that carry loose items along a facing
//!
//! Each cell stores its facing and whether it is waterlogged; the links to
//! its neighbours are derived from the surroundings and recomputed whenever
//! something nearby changes. Resting item entities are pushed along the
//! links every tick (see [`motion`]) and fed into the port at the end of the
//! line.

pub mod motion;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{BlockPos, Facing};
use crate::world::{Block, Material, World};

/// Height of a trail cell; items rest on top of it
pub const TRAIL_HEIGHT: f32 = 1.0 / 16.0;

/// Derived connectivity of a trail cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrailLinks {
    /// Climbs the full face in front
    pub up: bool,
    /// Carries items straight ahead
    pub front: bool,
    /// A trail on the left-hand side leads away from this cell
    pub left: bool,
    pub right: bool,
    /// Redstone power switches the flow onto a side branch
    pub diverted: bool,
}

/// One trail cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailCell {
    pub facing: Facing,
    #[serde(default)]
    pub waterlogged: bool,
    #[serde(skip)]
    pub links: TrailLinks,
}

impl TrailCell {
    pub fn new(facing: Facing, waterlogged: bool) -> Self {
        Self {
            facing,
            waterlogged,
            links: TrailLinks::default(),
        }
    }
}

/// Facing of the trail at `pos`, if there is one
pub fn trail_facing<W: World + ?Sized>(world: &W, pos: BlockPos) -> Option<Facing> {
    match world.block(pos).material {
        Material::Trail { facing } => Some(facing),
        _ => None,
    }
}

/// Work out the links of a cell from its surroundings
pub fn compute_links<W: World + ?Sized>(world: &W, pos: BlockPos, facing: Facing) -> TrailLinks {
    let front_pos = facing.step(pos);
    let below = Facing::Down.step(pos);
    let above = Facing::Up.step(pos);
    let diagonal_up = Facing::Up.step(front_pos);

    let floor_solid = world.is_solid(below);
    let up = world.has_full_face(front_pos, facing.opposite())
        && (!floor_solid || world.is_trail(above) || world.is_trail(diagonal_up));

    let branch = |side: Facing| trail_facing(world, side.step(pos)) == Some(side);
    let left = branch(facing.left());
    let right = branch(facing.right());
    let diverted = world.redstone_power(pos) > 0 && (left || right);

    TrailLinks {
        up,
        front: floor_solid && !diverted,
        left,
        right,
        diverted,
    }
}

/// Persisted form of one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailRecord {
    pub pos: BlockPos,
    pub facing: Facing,
    #[serde(default)]
    pub waterlogged: bool,
}

/// Persisted form of a whole network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrailSnapshot {
    pub cells: Vec<TrailRecord>,
}

impl TrailSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// All trail cells of a world
#[derive(Debug, Clone, Default)]
pub struct TrailNetwork {
    cells: AHashMap<BlockPos, TrailCell>,
}

impl TrailNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.cells.contains_key(&pos)
    }

    pub fn get(&self, pos: BlockPos) -> Option<&TrailCell> {
        self.cells.get(&pos)
    }

    /// Lay a cell. Trails only run horizontally; a vertical facing is refused.
    pub fn place<W: World + ?Sized>(&mut self, world: &mut W, pos: BlockPos, facing: Facing, waterlogged: bool) -> bool {
        if !facing.is_horizontal() {
            return false;
        }
        world.set_block(pos, Block::new("formicary:trail", Material::Trail { facing }, 0.1));
        self.cells.insert(pos, TrailCell::new(facing, waterlogged));
        self.neighbor_changed(world, pos);
        true
    }

    /// Remove a cell and the block it occupies
    pub fn remove<W: World + ?Sized>(&mut self, world: &mut W, pos: BlockPos) -> bool {
        if self.cells.remove(&pos).is_none() {
            return false;
        }
        world.set_block(pos, Block::air());
        self.neighbor_changed(world, pos);
        true
    }

    /// Drop a cell whose block was destroyed elsewhere
    pub fn forget(&mut self, pos: BlockPos) {
        self.cells.remove(&pos);
    }

    /// Recompute the links of `pos` and every cell whose links can depend on it
    pub fn neighbor_changed<W: World + ?Sized>(&mut self, world: &W, pos: BlockPos) {
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    self.update_links(world, pos + BlockPos::new(dx, dy, dz));
                }
            }
        }
    }

    pub fn update_links<W: World + ?Sized>(&mut self, world: &W, pos: BlockPos) {
        if let Some(cell) = self.cells.get_mut(&pos) {
            cell.links = compute_links(world, pos, cell.facing);
        }
    }

    fn sorted_positions(&self) -> Vec<BlockPos> {
        let mut positions: Vec<BlockPos> = self.cells.keys().copied().collect();
        positions.sort_by_key(|p| (p.y, p.x, p.z));
        positions
    }

    /// Move items on every cell once
    pub fn tick<W: World + ?Sized>(&mut self, world: &mut W) {
        for pos in self.sorted_positions() {
            let Some(cell) = self.cells.get(&pos).copied() else {
                continue;
            };
            let climb_owned = cell.links.up && !self.contains(Facing::Up.step(pos));
            motion::tick_cell(world, pos, &cell, climb_owned);
        }
    }

    pub fn snapshot(&self) -> TrailSnapshot {
        TrailSnapshot {
            cells: self
                .sorted_positions()
                .into_iter()
                .filter_map(|pos| {
                    self.cells.get(&pos).map(|cell| TrailRecord {
                        pos,
                        facing: cell.facing,
                        waterlogged: cell.waterlogged,
                    })
                })
                .collect(),
        }
    }

    /// Rebuild a network from a snapshot, re-deriving every link
    pub fn restore<W: World + ?Sized>(world: &mut W, snapshot: &TrailSnapshot) -> Self {
        let mut network = Self::new();
        for record in &snapshot.cells {
            network.place(world, record.pos, record.facing, record.waterlogged);
        }
        for pos in network.sorted_positions() {
            network.update_links(world, pos);
        }
        network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::GridWorld;
    use glam::IVec3;

    fn floor() -> GridWorld {
        GridWorld::new().with_floor(IVec3::ZERO, 4)
    }

    #[test]
    fn test_flat_cell_links_front() {
        let mut world = floor();
        let mut trails = TrailNetwork::new();
        let pos = IVec3::new(0, 1, 0);
        assert!(trails.place(&mut world, pos, Facing::East, false));
        let links = trails.get(pos).map(|c| c.links).unwrap_or_default();
        assert!(links.front);
        assert!(!links.up && !links.left && !links.right);
    }

    #[test]
    fn test_vertical_facing_refused() {
        let mut world = floor();
        let mut trails = TrailNetwork::new();
        assert!(!trails.place(&mut world, IVec3::new(0, 1, 0), Facing::Up, false));
        assert!(trails.is_empty());
    }

    #[test]
    fn test_climb_link_needs_continuation() {
        let mut world = floor();
        let mut trails = TrailNetwork::new();
        let pos = IVec3::new(0, 1, 0);
        world.set_block(IVec3::new(1, 1, 0), Block::solid("minecraft:stone"));
        trails.place(&mut world, pos, Facing::East, false);
        assert!(!trails.get(pos).map(|c| c.links.up).unwrap_or(true));

        // A trail on top of the wall continues the line
        trails.place(&mut world, IVec3::new(1, 2, 0), Facing::East, false);
        assert!(trails.get(pos).map(|c| c.links.up).unwrap_or(false));
    }

    #[test]
    fn test_redstone_diverts_onto_branch() {
        let mut world = floor();
        let mut trails = TrailNetwork::new();
        let pos = IVec3::new(0, 1, 0);
        trails.place(&mut world, pos, Facing::East, false);
        // Facing East, left is North
        trails.place(&mut world, IVec3::new(0, 1, -1), Facing::North, false);
        let links = trails.get(pos).map(|c| c.links).unwrap_or_default();
        assert!(links.left && links.front && !links.diverted);

        world.set_redstone(pos, 15);
        trails.update_links(&world, pos);
        let links = trails.get(pos).map(|c| c.links).unwrap_or_default();
        assert!(links.diverted);
        assert!(!links.front);
    }

    #[test]
    fn test_snapshot_keeps_facing_and_water() {
        let mut world = floor();
        let mut trails = TrailNetwork::new();
        trails.place(&mut world, IVec3::new(0, 1, 0), Facing::South, true);
        trails.place(&mut world, IVec3::new(0, 1, 1), Facing::South, false);

        let json = trails.snapshot().to_json().unwrap();
        let snapshot = TrailSnapshot::from_json(&json).unwrap();
        let mut fresh = floor();
        let restored = TrailNetwork::restore(&mut fresh, &snapshot);
        assert_eq!(restored.len(), 2);
        let cell = restored.get(IVec3::new(0, 1, 0)).copied();
        assert_eq!(cell.map(|c| (c.facing, c.waterlogged)), Some((Facing::South, true)));
        assert!(cell.is_some_and(|c| c.links.front));
    }
}
