//! World collaborator interface and an in-memory implementation
//!
//! Stations, trails and felling only ever see the world through the
//! [`World`] trait. [`GridWorld`] is a sparse, self-contained implementation
//! used by the tests and the headless runner.

pub mod block;
pub mod grid;
pub mod objects;

pub use block::{Block, Creature, ItemEntity, Material};
pub use grid::{Chest, GridWorld};
pub use objects::ItemEntities;

use glam::Vec3;

use crate::core::types::{BlockPos, EntityId, Facing, Tick};
use crate::item::ItemStack;
use crate::port::PortProvider;

/// Everything the engine needs from its surroundings
///
/// Queries never fail: an unknown position reads as air, a refused action
/// returns `false`/`None`.
pub trait World: PortProvider {
    /// Current world time in ticks
    fn time(&self) -> Tick;

    fn block(&self, pos: BlockPos) -> Block;

    fn set_block(&mut self, pos: BlockPos, block: Block);

    /// Remove the cell, returning what it drops
    fn destroy_block(&mut self, pos: BlockPos) -> Vec<ItemStack>;

    /// Ticks needed to break the cell with `tool`; `None` when unbreakable
    fn break_time(&self, pos: BlockPos, tool: &ItemStack) -> Option<u32>;

    /// Place the block form of `stack` into an empty cell
    fn place_item(&mut self, pos: BlockPos, stack: &ItemStack) -> bool;

    fn is_fertilizable(&self, pos: BlockPos) -> bool;

    /// Apply one unit of fertilizer
    fn fertilize(&mut self, pos: BlockPos) -> bool;

    /// Harvest a mature crop, optionally replanting it. `None` when there is
    /// nothing to harvest.
    fn harvest(&mut self, pos: BlockPos, replant: bool) -> Option<Vec<ItemStack>>;

    /// Plant, hive or creature in the cell that shears can take from
    fn can_shear(&self, pos: BlockPos) -> bool;

    fn shear(&mut self, pos: BlockPos) -> Option<Vec<ItemStack>>;

    /// The filled container a bucket would turn into at `pos`
    fn fluid_source(&self, pos: BlockPos) -> Option<ItemStack>;

    fn drain_fluid(&mut self, pos: BlockPos) -> bool;

    fn is_open_water(&self, pos: BlockPos) -> bool {
        matches!(self.block(pos).material, Material::Water { source: true })
    }

    /// One fishing table draw; `roll` is uniform in [0, 1)
    fn fishing_loot(&self, roll: f32) -> ItemStack;

    fn creatures_near(&self, center: Vec3, radius: f32) -> Vec<Creature>;

    /// Make two adults produce offspring
    fn breed(&mut self, a: EntityId, b: EntityId) -> bool;

    /// Redstone power level (0-15) received at `pos`
    fn redstone_power(&self, pos: BlockPos) -> u8;

    fn is_solid(&self, pos: BlockPos) -> bool {
        self.block(pos).material.is_solid()
    }

    /// Whether the cell presents a full face towards `face`
    fn has_full_face(&self, pos: BlockPos, _face: Facing) -> bool {
        self.block(pos).material.is_full_cube()
    }

    fn is_trail(&self, pos: BlockPos) -> bool {
        matches!(self.block(pos).material, Material::Trail { .. })
    }

    /// Item shown in a display frame attached to `pos` on `face`
    fn frame_filter(&self, pos: BlockPos, face: Facing) -> Option<ItemStack>;

    fn spawn_item(&mut self, position: Vec3, stack: ItemStack) -> EntityId;

    /// Item entities located inside cell `pos`
    fn items_in(&self, pos: BlockPos) -> Vec<EntityId>;

    fn item_entity(&self, id: EntityId) -> Option<&ItemEntity>;

    fn item_entity_mut(&mut self, id: EntityId) -> Option<&mut ItemEntity>;

    fn remove_item_entity(&mut self, id: EntityId) -> Option<ItemEntity>;

    /// Tell the cells around `pos` that its observable state changed
    fn notify_neighbors(&mut self, pos: BlockPos);
}
